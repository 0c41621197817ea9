use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("invalid log filter {directive:?}: {reason}")]
    InvalidLevel { directive: String, reason: String },
    #[error("journald logging unavailable: {0}")]
    JournaldUnavailable(String),
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("failed to install logger: {0}")]
    Install(String),
}

impl LoggerError {
    pub(crate) fn from_init(e: tracing_subscriber::util::TryInitError) -> Self {
        let msg = e.to_string();
        if msg.contains("already been set") || msg.contains("already initialized") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::Install(msg)
        }
    }
}
