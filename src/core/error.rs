use thiserror::Error;

#[derive(Error, Debug)]
pub enum Otlp2ddError {
    #[error("OTLP protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Channel send error")]
    ChannelSend,
}

/// Result type alias for otlp2dd operations
pub type Result<T> = std::result::Result<T, Otlp2ddError>;

impl Otlp2ddError {
    /// Creates a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a new sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Self::Sink(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Sink(_) | Self::ChannelSend)
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Sink(_) => "sink",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Join(_) => "async",
            Self::ChannelSend => "channel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Otlp2ddError::protocol("test message");
        assert_eq!(err.to_string(), "OTLP protocol error: test message");
        assert_eq!(err.category(), "protocol");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Otlp2ddError::network("connection failed").is_recoverable());
        assert!(Otlp2ddError::sink("stdout closed").is_recoverable());
        assert!(!Otlp2ddError::config("invalid config").is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Otlp2ddError = io.into();
        assert_eq!(err.category(), "io");
        assert_eq!(err.to_string(), "IO error: missing");
    }
}
