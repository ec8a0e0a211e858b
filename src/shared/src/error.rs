use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability '{name}' failed: {message}")]
    CapabilityExecution { name: String, message: String },

    #[error("Reasoning engine error: {0}")]
    ReasoningEngine(String),

    #[error("Invalid wizard sequence: {0}")]
    InvalidWizardSequence(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Command execution error: {0}")]
    CommandExecution(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),
}

impl Error {
    /// Short, user-safe rendering used when an error has to be shown in chat.
    pub fn user_message(&self) -> String {
        match self {
            Error::Timeout(_) => "timeout".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CommandExecution(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::CommandExecution(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {}", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}
