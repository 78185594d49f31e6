use thiserror::Error;

/// Top-level error type for the feeder.
#[derive(Error, Debug)]
pub enum FeederError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::buffer::QueueError),

    #[error("Collector error: {0}")]
    Collector(#[from] crate::sender::ClientError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::app::InitializationError),
}
