use thiserror::Error;

#[derive(Error, Debug)]
pub enum StopGuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Invalid iteration ceiling: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StopGuardError>;
