//! Error types for Voice Soundboard Core
//!
//! Only static configuration can fail here: envelopes, synthesizer settings,
//! and the audio-event manifest. Runtime paths (synthesis failures, sample
//! rate mismatches, unknown event types) degrade instead of erroring.

use thiserror::Error;

/// Result type alias for Voice Soundboard Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in Voice Soundboard Core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (invalid envelope, synthesizer config, config file)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Manifest missing or malformed
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Manifest assets failed validation (all-or-nothing)
    #[error("Manifest validation failed: {} issue(s)\n{}", issues.len(), issues.join("\n"))]
    ManifestValidation {
        /// Every issue found, one entry per variant problem
        issues: Vec<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// WAV decode error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl Error {
    /// Issues carried by a manifest validation failure, empty otherwise
    pub fn issues(&self) -> &[String] {
        match self {
            Error::ManifestValidation { issues } => issues,
            _ => &[],
        }
    }
}
