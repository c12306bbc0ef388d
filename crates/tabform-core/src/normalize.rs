//! Flattening of sections→fields configuration into a field table.
//!
//! # Design
//! - Sections and fields are visited in declared order; ids are stamped onto each
//!   field along with the owning section key.
//! - No validation: unknown types pass through as `Unrecognized`.
//! - A field id declared twice keeps the first position but the last definition.

use indexmap::IndexMap;
use tabform_config::PageConfig;
use tracing::{debug, warn};

use crate::field::{Field, FieldTable};
use crate::hooks::SettingsHooks;
use crate::registry::FieldRegistry;

/// Tab metadata kept after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section key, used as the URL fragment and marker class.
    pub key: String,
    /// Tab label.
    pub title: String,
    /// Optional description shown while the tab is active.
    pub desc: Option<String>,
}

/// Result of normalizing a page configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPage {
    /// Sections in tab order.
    pub sections: IndexMap<String, Section>,
    /// Flattened fields in display order.
    pub fields: FieldTable,
}

/// Flatten `config` into tab metadata and a field table.
#[must_use]
pub fn normalize(
    config: &PageConfig,
    registry: &FieldRegistry,
    hooks: &dyn SettingsHooks,
) -> NormalizedPage {
    let mut page = NormalizedPage::default();
    let sections = hooks.sections(config.sections.clone());

    for (section_key, section) in sections {
        let section = hooks.section(&section_key, section);
        let fields = hooks.fields(&section_key, section.fields);

        for (field_id, definition) in fields {
            let field = Field {
                field_type: registry.resolve_type(&definition.kind),
                content_hook: lookup_hook(&field_id, definition.custom_content.as_deref(), |name| {
                    registry.content(name)
                }),
                sanitize_hook: lookup_hook(
                    &field_id,
                    definition.custom_sanitize.as_deref(),
                    |name| registry.sanitizer(name),
                ),
                id: field_id,
                section: section_key.clone(),
                definition,
            };
            if let Some(replaced) = page.fields.insert(field) {
                debug!(
                    field_id = %replaced.id,
                    replaced_section = %replaced.section,
                    section = %section_key,
                    "field id declared twice; later definition wins"
                );
            }
        }

        page.sections.insert(
            section_key.clone(),
            Section {
                key: section_key,
                title: section.title,
                desc: section.desc,
            },
        );
    }

    page
}

fn lookup_hook<T>(
    field_id: &str,
    name: Option<&str>,
    lookup: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let name = name.filter(|name| !name.is_empty())?;
    let hook = lookup(name);
    if hook.is_none() {
        warn!(field_id, hook = name, "field references an unregistered hook");
    }
    hook
}
