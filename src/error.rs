use thiserror::Error;

/// Main error type for the composition player
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a frames extractor through its `error` event.
///
/// Cloneable so one event can be handed to every subscribed listener.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    #[error("Extractor preparation failed: {reason}")]
    PreparationFailed { reason: String },

    #[error("Frame decoding failed at {time_ms}ms: {reason}")]
    DecodeFailed { time_ms: f64, reason: String },

    #[error("Composition rejected by extractor: {reason}")]
    InvalidComposition { reason: String },

    #[error("Extractor was used after being disposed")]
    Disposed,
}

/// Composition description errors
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Failed to parse composition file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Composition item has an empty id")]
    EmptyItemId,

    #[error("Duplicate composition item id: {id}")]
    DuplicateItemId { id: String },

    #[error("Invalid timing for item {id}: {details}")]
    InvalidTiming { id: String, details: String },

    #[error("Invalid composition duration: {duration}")]
    InvalidDuration { duration: f64 },
}

/// Picture rasterization errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid output size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Failed to write picture to {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using PlayerError
pub type Result<T> = std::result::Result<T, PlayerError>;

impl PlayerError {
    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            // A fresh extractor may prepare or decode fine on the next attempt
            Self::Extractor(ExtractorError::PreparationFailed { .. }) => true,
            Self::Extractor(ExtractorError::DecodeFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Extractor(ExtractorError::PreparationFailed { reason }) => {
                format!("The composition could not be prepared for playback ({}). Try again.", reason)
            }
            Self::Composition(CompositionError::ParseFailed { path, .. }) => {
                format!("Could not read composition '{}'. Please check the file is valid TOML.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
