//! Error taxonomy for the blob store.

/// Errors surfaced by every public operation in this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A supplied identifier's length or character set is invalid for the
    /// store's configured digest length.
    #[error("bad identifier: {0}")]
    BadIdentifier(String),

    /// A construction parameter was out of range (e.g. `max_per_dir < 1`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested digest algorithm is not one this crate implements.
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The store has been closed; no operation but a second `close` is valid.
    #[error("store is closed")]
    StoreClosed,

    /// An underlying filesystem operation failed in a way the store cannot
    /// recover from locally.
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),
}
