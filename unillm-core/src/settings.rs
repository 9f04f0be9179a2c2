//! Sampling settings shared by every call.
//!
//! This module provides [`CallSettings`], the backend-independent knobs of a
//! generation request. A backend that cannot honor one of them reports a
//! [`CallWarning`](crate::messages::CallWarning) instead of failing.

use serde::{Deserialize, Serialize};

use crate::errors::InvalidArgumentError;

/// Settings for model generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallSettings {
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Top-p (nucleus) sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Top-k sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,

    /// Frequency penalty (-2.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    /// Presence penalty (-2.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,

    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl CallSettings {
    /// Create new empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max output tokens.
    #[must_use]
    pub fn max_output_tokens(mut self, tokens: u64) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set top-p.
    #[must_use]
    pub fn top_p(mut self, p: f64) -> Self {
        self.top_p = Some(p);
        self
    }

    /// Set top-k.
    #[must_use]
    pub fn top_k(mut self, k: u64) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set frequency penalty.
    #[must_use]
    pub fn frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    /// Set presence penalty.
    #[must_use]
    pub fn presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    /// Add a stop sequence.
    #[must_use]
    pub fn add_stop(mut self, sequence: impl Into<String>) -> Self {
        self.stop_sequences.push(sequence.into());
        self
    }

    /// Set seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Merge with another settings object (other takes precedence).
    #[must_use]
    pub fn merge(&self, other: &CallSettings) -> CallSettings {
        CallSettings {
            max_output_tokens: other.max_output_tokens.or(self.max_output_tokens),
            temperature: other.temperature.or(self.temperature),
            top_p: other.top_p.or(self.top_p),
            top_k: other.top_k.or(self.top_k),
            frequency_penalty: other.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: other.presence_penalty.or(self.presence_penalty),
            stop_sequences: if other.stop_sequences.is_empty() {
                self.stop_sequences.clone()
            } else {
                other.stop_sequences.clone()
            },
            seed: other.seed.or(self.seed),
        }
    }

    /// Reject values no backend can produce a reasonable result with.
    pub fn validate(&self) -> Result<(), InvalidArgumentError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(InvalidArgumentError::new(
                    "temperature",
                    format!("must be between 0 and 2, got {t}"),
                ));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(InvalidArgumentError::new(
                    "top_p",
                    format!("must be between 0 and 1, got {p}"),
                ));
            }
        }
        if self.max_output_tokens == Some(0) {
            return Err(InvalidArgumentError::new(
                "max_output_tokens",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder() {
        let settings = CallSettings::new()
            .max_output_tokens(1000)
            .temperature(0.7)
            .top_p(0.9)
            .add_stop("END")
            .seed(42);

        assert_eq!(settings.max_output_tokens, Some(1000));
        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.stop_sequences, vec!["END".to_string()]);
        assert_eq!(settings.seed, Some(42));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = CallSettings::new().max_output_tokens(1000).temperature(0.5);
        let over = CallSettings::new().temperature(0.9);
        let merged = base.merge(&over);
        assert_eq!(merged.max_output_tokens, Some(1000));
        assert_eq!(merged.temperature, Some(0.9));
    }

    #[test]
    fn test_validate() {
        assert!(CallSettings::new().temperature(1.0).validate().is_ok());
        let err = CallSettings::new().temperature(3.0).validate().unwrap_err();
        assert_eq!(err.argument, "temperature");
        assert!(CallSettings::new().max_output_tokens(0).validate().is_err());
    }

    #[test]
    fn test_serde_skips_unset() {
        let json = serde_json::to_string(&CallSettings::new().seed(7)).unwrap();
        assert_eq!(json, r#"{"seed":7}"#);
    }
}
