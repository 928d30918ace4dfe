//! Centralized error types for getappt.
//!
//! Calendar-protocol failures live in `getappt-ews`; this module covers
//! configuration and delivery. Every variant carries a `user_message()`
//! that the binary prints as a hint next to the full error chain.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Configuration file already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("List of users is empty")]
    EmptyUsers,

    #[error("Failed to write configuration: {0}")]
    Write(#[from] std::io::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Run `getappt init` first.",
            ConfigError::AlreadyExists(_) => "A configuration file is already in place.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
            ConfigError::EmptyUsers => "No users configured. Set exchange.users.",
            ConfigError::Write(_) => "Unable to write the configuration file.",
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingSetting(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

/// Errors raised while handing the JSON document to its destination.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid destination URI: {0}")]
    InvalidUri(String),

    #[error("PUT request timed out")]
    Timeout,

    #[error("PUT request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl DeliveryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DeliveryError::InvalidUri(_) => "The delivery URI is invalid. Check delivery.put_uri.",
            DeliveryError::Timeout => "The delivery endpoint did not answer in time.",
            DeliveryError::RequestFailed(_) => "Unable to reach the delivery endpoint.",
            DeliveryError::Output(_) => "Unable to write the result.",
        }
    }
}
