//! Core error types for Tally

use thiserror::Error;
use crate::types::SourceId;

/// Result type alias using `TallyError`
pub type Result<T> = std::result::Result<T, TallyError>;

/// Core error type for Tally
#[derive(Error, Debug)]
pub enum TallyError {
    /// The session provider failed to enumerate or subscribe
    #[error("Provider error: {0}")]
    Provider(String),

    /// The preference store could not be read or written
    #[error("Preference store error: {0}")]
    Preferences(String),

    /// A live subscription already exists for this source
    #[error("Source already registered: {0}")]
    AlreadyRegistered(SourceId),

    /// The host has not granted access to media sessions
    #[error("Access to media sessions denied")]
    AccessDenied,

    /// The listener was stopped and accepts no more work
    #[error("Session listener has been stopped")]
    Stopped,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl TallyError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a preference store error
    pub fn preferences(msg: impl Into<String>) -> Self {
        Self::Preferences(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this is the benign duplicate-registration error
    pub fn is_already_registered(&self) -> bool {
        matches!(self, Self::AlreadyRegistered(_))
    }
}
