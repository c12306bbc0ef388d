#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unused)]

//! HTTP host for a Tabform settings page.
//!
//! Routes: `GET /health`, `GET|POST /settings` (behind the optional admin token),
//! and the tab controller script and stylesheet under `/assets`.

pub mod error;
pub mod http;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::errors::ProblemDetails;
pub use http::router::ApiServer;
pub use state::ApiState;
