use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    /// Bad credentials or endpoint. Fatal only at construction; afterwards
    /// it degrades the distributor like any operational failure.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stale or foreign receipt handle on delete. The distributor treats the
    /// delivery as already completed.
    #[error("Invalid receipt handle: {0}")]
    InvalidHandle(String),

    /// Network, auth, throttling, timeout. Flips the distributor to the mock
    /// broker for the rest of the instance's life.
    #[error("Broker operation failed: {0}")]
    Operational(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
