#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]

//! Declarative settings page configuration.
//!
//! Layout: `model.rs` (page, section and field definitions), `loader.rs` (JSON/YAML
//! documents), `defaults.rs` (shared sentinels), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use defaults::{CHECKBOX_ON, DEFAULT_CLASS_PREFIX};
pub use error::{ConfigError, ConfigResult};
pub use loader::{DocumentFormat, load_page_config, parse_page_config};
pub use model::{
    BuiltinKind, FieldDefinition, FieldDefinitions, FieldKind, NumberFallback, PageConfig,
    SectionConfig, Sections,
};
