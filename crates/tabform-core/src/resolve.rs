//! Effective value resolution for a field id.

use tabform_config::BuiltinKind;

use crate::field::{Field, FieldTable};
use crate::hooks::SettingsHooks;
use crate::store::Record;

/// Resolves current values against one snapshot of the stored record.
///
/// The record is read once by the caller and shared by every lookup of a pass, so
/// rendering and sanitization fallbacks see the same values.
#[derive(Clone, Copy)]
pub struct ValueResolver<'a> {
    fields: &'a FieldTable,
    record: Option<&'a Record>,
    hooks: &'a dyn SettingsHooks,
}

impl<'a> ValueResolver<'a> {
    /// Resolve against `record`, which is `None` when nothing was saved yet.
    #[must_use]
    pub fn new(
        fields: &'a FieldTable,
        record: Option<&'a Record>,
        hooks: &'a dyn SettingsHooks,
    ) -> Self {
        Self {
            fields,
            record,
            hooks,
        }
    }

    /// Effective value of `field_id`.
    ///
    /// An absent key yields the configured default. A stored empty value yields the
    /// default when the field is `no_empty` or a radio group. Anything else is
    /// returned verbatim.
    #[must_use]
    pub fn resolve(&self, field_id: &str) -> String {
        let value = resolve_value(self.record, field_id, self.fields.get(field_id));
        self.hooks.resolved_value(field_id, value)
    }
}

/// Resolution rule without hooks.
#[must_use]
pub fn resolve_value(record: Option<&Record>, field_id: &str, field: Option<&Field>) -> String {
    let default = field.map_or("", |field| field.definition.default.as_str());
    match record.and_then(|record| record.get(field_id)) {
        None => default.to_string(),
        Some(stored) if stored.is_empty() && field.is_some_and(requires_value) => {
            default.to_string()
        }
        Some(stored) => stored.clone(),
    }
}

fn requires_value(field: &Field) -> bool {
    field.definition.no_empty || field.builtin() == Some(BuiltinKind::Radio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoHooks;
    use crate::normalize::normalize;
    use crate::registry::FieldRegistry;
    use tabform_config::{FieldDefinition, PageConfig, SectionConfig};

    fn table() -> FieldTable {
        let mut required = FieldDefinition::of_kind(BuiltinKind::Text).with_default("fallback");
        required.no_empty = true;
        let config = PageConfig::new("demo").with_section(
            "general",
            SectionConfig::titled("General")
                .with_field(
                    "site_name",
                    FieldDefinition::of_kind(BuiltinKind::Text).with_default("My Site"),
                )
                .with_field(
                    "layout",
                    FieldDefinition::of_kind(BuiltinKind::Radio)
                        .with_default("wide")
                        .with_option("wide", "Wide")
                        .with_option("narrow", "Narrow"),
                )
                .with_field("required", required)
                .with_field("bare", FieldDefinition::default()),
        );
        normalize(&config, &FieldRegistry::new(), &NoHooks).fields
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn absent_record_yields_defaults() {
        let fields = table();
        let resolver = ValueResolver::new(&fields, None, &NoHooks);
        assert_eq!(resolver.resolve("site_name"), "My Site");
        assert_eq!(resolver.resolve("bare"), "");
        assert_eq!(resolver.resolve("unknown"), "");
    }

    #[test]
    fn stored_empty_values_follow_field_rules() {
        let fields = table();
        let stored = record(&[("site_name", ""), ("layout", ""), ("required", "")]);
        let resolver = ValueResolver::new(&fields, Some(&stored), &NoHooks);
        assert_eq!(resolver.resolve("site_name"), "");
        assert_eq!(resolver.resolve("layout"), "wide");
        assert_eq!(resolver.resolve("required"), "fallback");
    }

    #[test]
    fn stored_values_are_returned_verbatim_and_deterministically() {
        let fields = table();
        let stored = record(&[("site_name", " Acme "), ("layout", "narrow"), ("unknown", "x")]);
        let resolver = ValueResolver::new(&fields, Some(&stored), &NoHooks);
        for _ in 0..3 {
            assert_eq!(resolver.resolve("site_name"), " Acme ");
            assert_eq!(resolver.resolve("layout"), "narrow");
            assert_eq!(resolver.resolve("unknown"), "x");
        }
    }

    struct Shout;

    impl SettingsHooks for Shout {
        fn resolved_value(&self, field_id: &str, value: String) -> String {
            if field_id == "site_name" {
                value.to_uppercase()
            } else {
                value
            }
        }
    }

    #[test]
    fn resolved_value_hook_rewrites_results() {
        let fields = table();
        let resolver = ValueResolver::new(&fields, None, &Shout);
        assert_eq!(resolver.resolve("site_name"), "MY SITE");
        assert_eq!(resolver.resolve("layout"), "wide");
    }
}
