//! Error types for groundskeeper-core.
//!
//! The tick paths never surface errors: population drift, unload timeouts
//! and observer cancellations are all converted into skip/continue inside
//! the services. `Error` is reserved for startup and reload concerns
//! (config loading, logging init).

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for groundskeeper-core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("logging already initialized")]
    LoggingInit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_io_error_mentions_path() {
        let err = Error::ConfigIo {
            path: PathBuf::from("/etc/groundskeeper.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let text = err.to_string();
        assert!(text.contains("/etc/groundskeeper.toml"));
    }

    #[test]
    fn parse_error_wraps_toml() {
        let bad: std::result::Result<crate::config::CleanerConfig, _> =
            toml::from_str("item = \"not a table\"");
        let err = Error::from(bad.unwrap_err());
        assert!(err.to_string().contains("parse"));
    }
}
