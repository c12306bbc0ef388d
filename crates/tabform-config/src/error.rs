//! Error types for page configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration document failed.
    #[error("failed to read page configuration")]
    Io {
        /// Path of the document being read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// JSON document could not be parsed into a page configuration.
    #[error("invalid JSON page configuration")]
    Json {
        /// Path of the offending document, when loaded from disk.
        path: Option<PathBuf>,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// YAML document could not be parsed into a page configuration.
    #[error("invalid YAML page configuration")]
    Yaml {
        /// Path of the offending document, when loaded from disk.
        path: Option<PathBuf>,
        /// Source serde error.
        source: serde_yaml::Error,
    },
    /// File extension did not map to a supported document format.
    #[error("unsupported page configuration format")]
    UnsupportedFormat {
        /// Path whose extension was not recognised.
        path: PathBuf,
    },
    /// The configuration did not name the option record it manages.
    #[error("page configuration is missing an option id")]
    MissingOptionId,
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
