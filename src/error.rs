use thiserror::Error;

/// Lifecycle and configuration errors.
///
/// The streaming paths (`condition`, `process_*`, `filter`, `update`) never return
/// these; abnormal sensor or detector input is absorbed as "nothing this cycle".
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Config(err.to_string())
    }
}

/// Result type for lifecycle and configuration operations
pub type MonitorResult<T> = Result<T, MonitorError>;
