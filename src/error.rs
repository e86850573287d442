//! Error kinds surfaced by the library. The binary wraps them in `anyhow`
//! and turns the first one into a non-zero exit.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Required identities, products or inputs are missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed user-supplied value (alias, path, product line, encoding).
    #[error("validation error: {0}")]
    Validation(String),

    /// The salted password digest did not match. Carries no detail on purpose.
    #[error("invalid password")]
    InvalidPassword,

    #[error("storage error at {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    /// Unknown business, product SKU or employee.
    #[error("not found: {0}")]
    NotFound(String),

    /// RNG, KDF, cipher or key-derivation failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Binary payload or image encoding failure.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Storage { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_password_display_has_no_detail() {
        assert_eq!(Error::InvalidPassword.to_string(), "invalid password");
    }

    #[test]
    fn storage_display_names_path() {
        let err = Error::storage("/nowhere/data", "directory does not exist");
        let msg = err.to_string();
        assert!(msg.contains("/nowhere/data"));
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
