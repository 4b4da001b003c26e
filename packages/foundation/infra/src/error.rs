use thiserror::Error;

/// Infra-layer failures. Per spec.md §4.1, a cache miss is never an error —
/// only the queue's `enqueue` and the rate limiter's bookkeeping can fail.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("queue '{0}' is full")]
    QueueFull(String),
    #[error("backpressure on queue '{0}': {1}")]
    Backpressure(String, String),
    #[error("key '{0}' exceeds the 512-byte limit")]
    KeyTooLong(String),
}
