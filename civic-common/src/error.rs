//! Library error type
//!
//! The HTTP service maps these onto status codes in `civic_api::error`.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::auth::AuthError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "sqlx")]
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),

    /// Config file present but unusable
    #[error("config file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Stored or submitted text that names no known enum variant
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::UnknownVariant {
            kind: "issue status",
            value: "closed".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown issue status: closed");

        let err = Error::Config {
            path: PathBuf::from("/etc/civic/api.toml"),
            message: "expected `=`".to_string(),
        };
        assert_eq!(err.to_string(), "config file /etc/civic/api.toml: expected `=`");
    }

    #[test]
    fn test_auth_errors_pass_through() {
        let err: Error = AuthError::Hashing("salt too short".to_string()).into();
        assert_eq!(err.to_string(), "Password hashing failed: salt too short");
    }
}
