//! Error types for LLM backend operations.

use std::fmt;

/// Errors from LLM backend operations.
///
/// These never cross the gateway boundary: `ModelGateway` degrades every
/// failure into usable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Request could not be sent or the provider answered with an error.
    RequestFailed { reason: String },
    /// Response body did not match the expected shape.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for a response.
    Timeout,
    /// Invalid backend configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
