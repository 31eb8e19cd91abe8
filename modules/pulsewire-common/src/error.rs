use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseWireError {
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("Seed post {0} not found")]
    SeedNotFound(i64),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Generation queue is closed: the worker has been stopped")]
    QueueClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
