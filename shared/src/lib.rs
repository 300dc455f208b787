// shared/src/lib.rs

/// Failures surfaced by a cache backend.
///
/// The HTTP layer only ever looks at the `Display` text; the variants exist so
/// backends and tests can tell the cases apart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("memcache: cache miss")]
    CacheMiss,
    #[error("memcache: item not stored")]
    NotStored,
    #[error("memcache: compare-and-swap conflict")]
    CasConflict,
    #[error("memcache: cannot increment or decrement non-numeric value")]
    NonNumeric,
    #[error("malformed: key is too long or contains invalid characters")]
    MalformedKey,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("backend: {0}")]
    Backend(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
