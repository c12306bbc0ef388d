#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Tabform application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (environment loading, store and page wiring, server launch),
//! `error.rs` (`AppError`).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;

pub use bootstrap::{BootstrapSettings, run_app};
pub use error::{AppError, AppResult};
