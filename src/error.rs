// Engine error types
// Only configuration, persistence values and thread setup can fail.
// Playback paths clamp or ignore bad input instead of returning errors.

/// Errors surfaced by engine setup and the persistence boundary
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] ron::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
