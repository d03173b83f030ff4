//! Crate-wide error type.
//!
//! Mirrors the taxonomy of recoverable-vs-surfaced failures: most parsing and
//! collaborator errors are absorbed by the call site and only logged, so this
//! enum mostly exists for the handful of cases that must reach the caller
//! (bad configuration, an unsupported file kind, or a truly unexpected bug).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported file kind: {0}")]
    UnsupportedKind(String),

    #[error("parse failed for {filename}: {message}")]
    ParseFailure { filename: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("external call failed: {0}")]
    ExternalCall(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Error::UnsupportedKind(kind.into())
    }

    pub fn parse_failure(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ParseFailure {
            filename: filename.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    pub fn external_call(message: impl Into<String>) -> Self {
        Error::ExternalCall(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// True for errors that a FirstSuccess chain should treat as "try the next parser"
    /// rather than abort on.
    pub fn is_recoverable_parse_error(&self) -> bool {
        matches!(self, Error::ParseFailure { .. } | Error::Io(_))
    }
}
