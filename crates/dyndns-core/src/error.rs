//! Error types for the dyndns system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure or unexpected HTTP status from a collaborator
    #[error("Transport error: {message}{}", status_suffix(.status))]
    Transport {
        /// HTTP status, when a response was received at all
        status: Option<u16>,
        /// What went wrong
        message: String,
    },

    /// Target record absent from the provider's record list
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Malformed payload from the provider
    #[error("Decode error: {0}")]
    Decode(String),

    /// Public IP lookup returned something that is not an address
    #[error("Invalid IP address: {0:?}")]
    InvalidIp(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider reported a logical failure
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a transport error for a request that never produced a response
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a transport error for an unexpected HTTP status
    pub fn bad_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by a transport error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
