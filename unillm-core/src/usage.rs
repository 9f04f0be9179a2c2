//! Token usage tracking.
//!
//! [`Usage`] is additive: an agent run's cumulative usage is the sum of the
//! usage of each of its steps. [`UsageLimits`] lets a caller stop a run once
//! a budget is spent.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token usage for one request, or a sum of several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
    /// Total tokens as reported by the backend.
    pub total_tokens: u64,
    /// Tokens spent on reasoning.
    pub reasoning_tokens: u64,
    /// Tokens read from the prompt cache.
    pub cache_read_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_tokens: u64,
}

impl Usage {
    /// Create usage with input and output tokens; total is their sum.
    #[must_use]
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            ..Self::default()
        }
    }

    /// Override the total.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total_tokens = total;
        self
    }

    /// Set reasoning tokens.
    #[must_use]
    pub fn with_reasoning(mut self, tokens: u64) -> Self {
        self.reasoning_tokens = tokens;
        self
    }

    /// Set cache read and creation tokens.
    #[must_use]
    pub fn with_cache(mut self, read: u64, creation: u64) -> Self {
        self.cache_read_tokens = read;
        self.cache_creation_tokens = creation;
        self
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::Add for Usage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.total_tokens += rhs.total_tokens;
        self.reasoning_tokens += rhs.reasoning_tokens;
        self.cache_read_tokens += rhs.cache_read_tokens;
        self.cache_creation_tokens += rhs.cache_creation_tokens;
    }
}

impl std::iter::Sum for Usage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, u| acc + u)
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in={} out={} total={}",
            self.input_tokens, self.output_tokens, self.total_tokens
        )
    }
}

/// Limits on usage for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimits {
    /// Maximum input tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<u64>,
    /// Maximum output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    /// Maximum total tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_tokens: Option<u64>,
}

impl UsageLimits {
    /// Create new (unlimited) limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max input tokens.
    #[must_use]
    pub fn max_input_tokens(mut self, limit: u64) -> Self {
        self.max_input_tokens = Some(limit);
        self
    }

    /// Set max output tokens.
    #[must_use]
    pub fn max_output_tokens(mut self, limit: u64) -> Self {
        self.max_output_tokens = Some(limit);
        self
    }

    /// Set max total tokens.
    #[must_use]
    pub fn max_total_tokens(mut self, limit: u64) -> Self {
        self.max_total_tokens = Some(limit);
        self
    }

    /// Check whether the given usage stays within the limits.
    pub fn check(&self, usage: &Usage) -> Result<(), UsageLimitExceeded> {
        let checks = [
            (UsageLimitType::InputTokens, self.max_input_tokens, usage.input_tokens),
            (UsageLimitType::OutputTokens, self.max_output_tokens, usage.output_tokens),
            (UsageLimitType::TotalTokens, self.max_total_tokens, usage.total_tokens),
        ];
        for (limit_type, max, current) in checks {
            if let Some(max) = max {
                if current > max {
                    return Err(UsageLimitExceeded {
                        limit_type,
                        current,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Check if any limit is configured.
    #[must_use]
    pub fn has_limits(&self) -> bool {
        self.max_input_tokens.is_some()
            || self.max_output_tokens.is_some()
            || self.max_total_tokens.is_some()
    }
}

/// Which usage limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLimitType {
    /// Input tokens.
    InputTokens,
    /// Output tokens.
    OutputTokens,
    /// Total tokens.
    TotalTokens,
}

impl fmt::Display for UsageLimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputTokens => write!(f, "input tokens"),
            Self::OutputTokens => write!(f, "output tokens"),
            Self::TotalTokens => write!(f, "total tokens"),
        }
    }
}

/// A usage limit was exceeded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimitExceeded {
    /// The limit that was hit.
    pub limit_type: UsageLimitType,
    /// Current value.
    pub current: u64,
    /// Configured maximum.
    pub max: u64,
}

impl fmt::Display for UsageLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Usage limit exceeded: {} {} > {}",
            self.limit_type, self.current, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_computes_total() {
        let u = Usage::new(3, 10);
        assert_eq!(u.total_tokens, 13);
    }

    #[test]
    fn test_add_is_fieldwise() {
        let a = Usage::new(10, 5).with_reasoning(2).with_cache(1, 0);
        let b = Usage::new(1, 2).with_cache(0, 4);
        let sum = a + b;
        assert_eq!(
            sum,
            Usage {
                input_tokens: 11,
                output_tokens: 7,
                total_tokens: 18,
                reasoning_tokens: 2,
                cache_read_tokens: 1,
                cache_creation_tokens: 4,
            }
        );
    }

    #[test]
    fn test_sum_iterator() {
        let total: Usage = vec![Usage::new(1, 1), Usage::new(2, 2), Usage::new(3, 3)]
            .into_iter()
            .sum();
        assert_eq!(total.total_tokens, 12);
    }

    #[test]
    fn test_limits() {
        let limits = UsageLimits::new().max_total_tokens(100);
        assert!(limits.check(&Usage::new(40, 40)).is_ok());
        let err = limits.check(&Usage::new(60, 60)).unwrap_err();
        assert_eq!(err.limit_type, UsageLimitType::TotalTokens);
        assert_eq!(err.current, 120);
        assert!(!UsageLimits::new().has_limits());
    }

    #[test]
    fn test_deserialize_partial() {
        let u: Usage = serde_json::from_str(r#"{"input_tokens": 4}"#).unwrap();
        assert_eq!(u.input_tokens, 4);
        assert_eq!(u.output_tokens, 0);
    }
}
