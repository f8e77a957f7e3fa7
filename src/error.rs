//! Error types and handling for the `WindRadar` application

use thiserror::Error;

/// Main error type for the `WindRadar` library
#[derive(Error, Debug)]
pub enum WindRadarError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Weather or geocoding API errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Local storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A referenced record does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WindRadarError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WindRadarError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            WindRadarError::Api { .. } => {
                "Unable to reach the weather service. Please check your internet connection."
                    .to_string()
            }
            WindRadarError::Validation { message } => format!("Invalid input: {message}"),
            WindRadarError::Storage { .. } => {
                "Local storage failed. You may need to clear the data directory.".to_string()
            }
            WindRadarError::NotFound { message } => format!("Not found: {message}"),
            WindRadarError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
