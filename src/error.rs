//! Unified error type.

/// The error type returned by relay's fallible operations.
///
/// Handler-level problems are expressed as HTTP [`Response`](crate::Response)
/// values, and handler panics are turned into `500` by the dispatcher, so
/// neither shows up here. This type covers start-up failures: a bad routing
/// table, an unreadable config file, a logger that cannot be installed, or
/// the listener failing to bind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("logging: {0}")]
    Logging(String),

    #[error("a group was registered with an empty prefix")]
    EmptyPrefix,

    /// The resolved chain for `prefix` (core handler included) does not fit
    /// under [`MAX_CHAIN_LEN`](crate::MAX_CHAIN_LEN).
    #[error("group `{prefix}` resolves to {len} handlers, at most {max} are allowed")]
    ChainTooLong { prefix: String, len: usize, max: usize },
}
