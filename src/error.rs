//! Error taxonomy shared by the engine boundary, persistence and the managers.
//!
//! None of these are fatal: the session controller logs and swallows engine
//! failures, and the managers leave their state untouched when they return one.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Command channel unreachable or the engine is not responding
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Durable store read/write failed
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// A playlist id, track path or queue index that is no longer present
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request understood but refused (bad input, wrong file type)
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::PersistenceUnavailable(err.to_string())
    }
}
