//! Model capabilities.
//!
//! A [`ModelProfile`] tells callers which optional features a backend model
//! handles natively; the structured-object pipeline uses it to pick a mode.

use serde::{Deserialize, Serialize};

/// Model capabilities and behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Model supports tool/function calling.
    pub supports_tools: bool,
    /// Model supports schema-constrained JSON output.
    pub supports_native_structured_output: bool,
    /// Model streams natively rather than replaying a full response.
    pub supports_streaming: bool,
    /// Model emits reasoning content.
    pub supports_reasoning: bool,
    /// Model accepts file parts (images, documents).
    pub supports_files: bool,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            supports_tools: true,
            supports_native_structured_output: false,
            supports_streaming: true,
            supports_reasoning: false,
            supports_files: false,
        }
    }
}

impl ModelProfile {
    /// Create a default profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set native structured output support.
    #[must_use]
    pub fn with_native_structured_output(mut self, supported: bool) -> Self {
        self.supports_native_structured_output = supported;
        self
    }

    /// Set tool support.
    #[must_use]
    pub fn with_tools(mut self, supported: bool) -> Self {
        self.supports_tools = supported;
        self
    }

    /// Set reasoning support.
    #[must_use]
    pub fn with_reasoning(mut self, supported: bool) -> Self {
        self.supports_reasoning = supported;
        self
    }
}

/// Model capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelCapability {
    /// Tool/function calling.
    Tools,
    /// Native structured output.
    NativeStructuredOutput,
    /// Streaming responses.
    Streaming,
    /// Reasoning/thinking.
    Reasoning,
    /// File input.
    Files,
}

impl ModelProfile {
    /// Check a single capability.
    #[must_use]
    pub fn supports(&self, capability: ModelCapability) -> bool {
        match capability {
            ModelCapability::Tools => self.supports_tools,
            ModelCapability::NativeStructuredOutput => self.supports_native_structured_output,
            ModelCapability::Streaming => self.supports_streaming,
            ModelCapability::Reasoning => self.supports_reasoning,
            ModelCapability::Files => self.supports_files,
        }
    }
}
