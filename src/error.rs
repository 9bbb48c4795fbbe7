use thiserror::Error;

/// Failure categories surfaced at the record-service boundary. Reads recover
/// with default data; failed writes are reported to the caller and never
/// retried automatically.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The persistence layer rejected a read or write.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The storage worker is gone; the request was never processed.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),
}
