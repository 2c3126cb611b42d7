//! Error types for the travel panel service

use thiserror::Error;

/// Main error type for the travel panel
#[derive(Error, Debug)]
pub enum PanelError {
    /// Input validation errors (bad or missing query parameters)
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Transport-level failures talking to an upstream provider
    #[error("Network error: {message}")]
    Network { message: String },

    /// Upstream provider returned a non-success status or an unexpected payload
    #[error("API error: {message}")]
    Api { message: String },

    /// Generative reply could not be parsed into the expected shape
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Combined failure of one or more providers during aggregation
    #[error("{message}")]
    Aggregation { message: String },
}

impl PanelError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Fold individual provider failure messages into one aggregation error.
    /// Message order is preserved; messages are joined with `"; "`.
    pub fn aggregation_of(messages: Vec<String>) -> Self {
        Self::Aggregation {
            message: messages.join("; "),
        }
    }
}
