//! Error taxonomy shared by the generator, batch and search layers.

/// Errors surfaced by key generation, batch generation and vanity search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeygenError {
    /// A caller-supplied argument is out of range (e.g. a batch count < 1).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `start` was called while a search is still in flight.
    #[error("A search is already running")]
    AlreadyRunning,

    /// The secure random source failed. Fatal for the current operation.
    #[error("Entropy source exhausted: {0}")]
    EntropyExhausted(String),

    /// Prefix or suffix contains characters that can never appear in an address.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The operating system refused to start a search thread.
    #[error("Failed to spawn search thread: {0}")]
    ThreadSpawn(String),

    /// A private key read from outside the generator is malformed or out of range.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

impl From<rand::Error> for KeygenError {
    fn from(err: rand::Error) -> Self {
        KeygenError::EntropyExhausted(err.to_string())
    }
}
