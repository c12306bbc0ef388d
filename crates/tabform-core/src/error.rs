//! # Design
//!
//! - Record storage is the only fallible collaborator; rendering and sanitizing
//!   degrade to safe defaults instead of failing.
//! - Keep error messages constant while carrying context fields for debugging.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by option store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("option store io failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Stored document could not be encoded or decoded.
    #[error("option store document is invalid")]
    Document {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the document.
        path: PathBuf,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("option store lock poisoned")]
    Poisoned {
        /// Operation identifier.
        operation: &'static str,
    },
}

/// Result alias for option store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the settings page facade.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the option record failed.
    #[error("option record operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Option record involved.
        option_id: String,
        /// Source store error.
        source: StoreError,
    },
    /// A built-in markup pattern failed to compile.
    #[error("markup pattern failed to compile")]
    Pattern {
        /// Pattern identifier.
        name: &'static str,
        /// Source regex error.
        source: regex::Error,
    },
}

/// Result alias for settings page operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
