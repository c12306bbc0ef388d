//! Interception points offered to embedding applications.
//!
//! Every method receives the value being processed and returns its replacement;
//! the defaults pass values through untouched.

use tabform_config::{FieldDefinitions, PageConfig, SectionConfig, Sections};

use crate::field::Field;
use crate::store::Record;

/// Optional transforms applied while building, rendering and saving a settings page.
pub trait SettingsHooks: Send + Sync {
    /// Rewrite the whole configuration before it is used.
    fn config(&self, config: PageConfig) -> PageConfig {
        config
    }

    /// Rewrite the ordered section list during normalization.
    fn sections(&self, sections: Sections) -> Sections {
        sections
    }

    /// Rewrite one section during normalization.
    fn section(&self, _key: &str, section: SectionConfig) -> SectionConfig {
        section
    }

    /// Rewrite the field group of one section during normalization.
    fn fields(&self, _section_key: &str, fields: FieldDefinitions) -> FieldDefinitions {
        fields
    }

    /// Rewrite a value returned by the resolver.
    fn resolved_value(&self, _field_id: &str, value: String) -> String {
        value
    }

    /// Rewrite a field's control markup before its description is appended.
    fn field_control(&self, _field: &Field, html: String) -> String {
        html
    }

    /// Rewrite a field's final, wrapped markup.
    fn field_markup(&self, _field: &Field, html: String) -> String {
        html
    }

    /// Rewrite the sanitized record before it is stored.
    ///
    /// Implementations that add or drop keys change what gets stored.
    fn sanitized(&self, output: Record, _input: &Record) -> Record {
        output
    }

    /// Observe a record after it was saved.
    fn after_save(&self, _record: &Record) {}

    /// Decide whether a request path shows this settings page (gates asset loading).
    fn is_settings_page(&self, _path: &str, matched: bool) -> bool {
        matched
    }
}

/// Hooks that change nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SettingsHooks for NoHooks {}
