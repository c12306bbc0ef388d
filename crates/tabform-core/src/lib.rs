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
#![allow(clippy::module_name_repetitions)]

//! Rendering and sanitization engine for configuration-driven settings pages.
//!
//! Layout: `normalize.rs` (section→field flattening), `resolve.rs` (effective
//! values), `render.rs` (field controls), `page.rs` (tabs, rows and document),
//! `sanitize.rs` (submission cleaning), `settings.rs` (the `SettingsPage` facade),
//! `store.rs` (option stores), `registry.rs`/`hooks.rs` (extension points).

pub mod error;
pub mod field;
pub mod hooks;
pub mod markup;
pub mod normalize;
pub mod page;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod sanitize;
pub mod settings;
pub mod store;
pub mod submission;

pub use error::{SettingsError, SettingsResult, StoreError, StoreResult};
pub use field::{Field, FieldTable, FieldType};
pub use hooks::{NoHooks, SettingsHooks};
pub use markup::{AllowList, MarkupFilter};
pub use normalize::{NormalizedPage, Section, normalize};
pub use page::{PageAssets, PageOptions, initial_section, layout_rows};
pub use registry::{ContentFn, FieldRegistry, FieldStrategy, RenderContext, SanitizeFn};
pub use render::FieldRenderer;
pub use resolve::{ValueResolver, resolve_value};
pub use sanitize::{SanitizeOptions, Sanitizer, coerce_number, coerce_url, unslash};
pub use settings::SettingsPage;
pub use store::{JsonFileStore, MemoryStore, OptionStore, Record};
pub use submission::collect_submission;
