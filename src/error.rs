//! Error handling for soundlab
//!
//! Every error carries enough context for a one-line message at the prompt.

use thiserror::Error;

/// Result type alias for soundlab operations
pub type Result<T> = std::result::Result<T, SoundLabError>;

/// Main error type for soundlab operations
#[derive(Error, Debug)]
pub enum SoundLabError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Invalid audio data: {reason}")]
    InvalidAudio { reason: String },

    // Parameter Errors
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SoundLabError {
    /// Shorthand for an `InvalidParameter` error
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        SoundLabError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SoundLabError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SoundLabError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SoundLabError::EmptyAudio => "EMPTY_AUDIO",
            SoundLabError::InvalidAudio { .. } => "INVALID_AUDIO",
            SoundLabError::InvalidParameter { .. } => "INVALID_PARAMETER",
            SoundLabError::Config { .. } => "CONFIG_ERROR",
            SoundLabError::Io(_) => "IO_ERROR",
            SoundLabError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors come from bad user input and lead to a re-prompt.
    /// Everything else ends the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SoundLabError::FileNotFound { .. }
                | SoundLabError::UnsupportedFormat { .. }
                | SoundLabError::EmptyAudio
                | SoundLabError::InvalidAudio { .. }
                | SoundLabError::InvalidParameter { .. }
        )
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            SoundLabError::FileNotFound { path, .. } => {
                format!("The file '{}' does not exist. Please try again.", path)
            }
            SoundLabError::UnsupportedFormat { format } => {
                format!(
                    "Wrong file format ({}). Only uncompressed PCM WAV files are accepted.",
                    format
                )
            }
            SoundLabError::EmptyAudio => {
                "The WAV file contains no audio. Please choose another file.".to_string()
            }
            SoundLabError::InvalidAudio { reason } => {
                format!("The WAV file is damaged ({}). Please choose another file.", reason)
            }
            SoundLabError::InvalidParameter { name, reason } => {
                format!("Incorrect value for {}: {}.", name, reason)
            }
            _ => self.to_string(),
        }
    }
}
