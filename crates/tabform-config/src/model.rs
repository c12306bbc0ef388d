//! Typed page configuration models.
//!
//! # Design
//! - Pure data carriers deserialized from JSON or YAML documents.
//! - Declared order of sections, fields, options and attributes is preserved with
//!   `IndexMap`, since it drives tab order and control order.
//! - Scalar values (defaults, option keys, attribute values) accept strings, numbers
//!   and booleans and are normalized to strings, the representation of the stored record.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Ordered mapping of section key to section configuration.
pub type Sections = IndexMap<String, SectionConfig>;
/// Ordered mapping of field id to field definition.
pub type FieldDefinitions = IndexMap<String, FieldDefinition>;

/// Declarative description of one settings page and the option record it manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Identifier of the single stored record.
    pub option_id: String,
    /// Title shown at the top of the page and in the document title.
    #[serde(default)]
    pub page_title: String,
    /// Short title used by hosts that list the page in a menu.
    #[serde(default)]
    pub menu_title: String,
    /// Optional introduction rendered under the page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Policy applied to non-numeric input for `number` fields.
    #[serde(default)]
    pub number_fallback: NumberFallback,
    /// Remove backslash escapes from submitted values before sanitizing.
    #[serde(default = "defaults::unslash")]
    pub unslash: bool,
    /// Prefix for emitted CSS classes and element ids.
    #[serde(default = "defaults::class_prefix")]
    pub class_prefix: String,
    /// Sections in tab order.
    #[serde(default)]
    pub sections: Sections,
}

impl PageConfig {
    /// Build an empty configuration for the given option record.
    #[must_use]
    pub fn new(option_id: impl Into<String>) -> Self {
        Self {
            option_id: option_id.into(),
            page_title: String::new(),
            menu_title: String::new(),
            desc: None,
            number_fallback: NumberFallback::default(),
            unslash: defaults::unslash(),
            class_prefix: defaults::class_prefix(),
            sections: Sections::new(),
        }
    }

    /// Append a section, replacing any section already registered under `key`.
    #[must_use]
    pub fn with_section(mut self, key: impl Into<String>, section: SectionConfig) -> Self {
        self.sections.insert(key.into(), section);
        self
    }
}

/// One tab of the settings page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Tab label.
    #[serde(default)]
    pub title: String,
    /// Optional description shown while the tab is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Fields in display order.
    #[serde(default)]
    pub fields: FieldDefinitions,
}

impl SectionConfig {
    /// Build a section with the given tab title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Append a field definition.
    #[must_use]
    pub fn with_field(mut self, id: impl Into<String>, field: FieldDefinition) -> Self {
        self.fields.insert(id.into(), field);
        self
    }
}

/// Configuration of a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field type tag.
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    /// Row label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Markup appended to the label inside an `after-name` span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_name: Option<String>,
    /// Value used when nothing is stored, or when an empty value is not allowed.
    #[serde(default, deserialize_with = "scalar_string")]
    pub default: String,
    /// Treat a stored empty value as absent.
    #[serde(default)]
    pub no_empty: bool,
    /// Keep embedded markup in `text`/`textarea` values.
    #[serde(default)]
    pub allow_html: bool,
    /// Lay radio options out on one line.
    #[serde(default)]
    pub inline: bool,
    /// Choices for `radio` and `select` fields, value to label.
    #[serde(default, deserialize_with = "scalar_map")]
    pub options: IndexMap<String, String>,
    /// Extra attributes added to the control.
    #[serde(default, deserialize_with = "scalar_map")]
    pub attributes: IndexMap<String, String>,
    /// Extra CSS class added to the control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Help text rendered beneath the control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Static markup emitted by `content` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Name of a registered render hook that replaces the built-in control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_content: Option<String>,
    /// Name of a registered sanitize hook run after the type rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sanitize: Option<String>,
    /// Inline label rendered next to a checkbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkbox_label: Option<String>,
    /// Caption of the media picker trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_button: Option<String>,
    /// Title of the media picker dialog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_title: Option<String>,
    /// Media type the picker is restricted to (e.g. `image`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<String>,
    /// Preview width in pixels; enables the image preview when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_show_image: Option<u32>,
}

impl FieldDefinition {
    /// Build a field of the given kind with every other property unset.
    #[must_use]
    pub fn of_kind(kind: impl Into<FieldKind>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Set the row label.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    /// Append a choice for `radio`/`select` fields.
    #[must_use]
    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.insert(value.into(), label.into());
        self
    }
}

/// Built-in field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// Single-line text input.
    Text,
    /// Single-line input holding an absolute URL.
    Url,
    /// Multi-line text input.
    Textarea,
    /// URL input paired with a media picker.
    Upload,
    /// Boolean toggle stored as `1` or empty.
    Checkbox,
    /// One choice among labeled radio buttons.
    Radio,
    /// One choice from a drop-down list.
    Select,
    /// Integer input.
    Number,
    /// Informational markup with nothing to store.
    Content,
}

impl BuiltinKind {
    /// Every built-in type in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Text,
        Self::Url,
        Self::Textarea,
        Self::Upload,
        Self::Checkbox,
        Self::Radio,
        Self::Select,
        Self::Number,
        Self::Content,
    ];

    /// Render the type as its configuration tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::Textarea => "textarea",
            Self::Upload => "upload",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Number => "number",
            Self::Content => "content",
        }
    }

    /// Core styling class applied to controls of this type, if any.
    #[must_use]
    pub const fn default_class(self) -> Option<&'static str> {
        match self {
            Self::Text | Self::Url | Self::Upload => Some("regular-text"),
            Self::Number => Some("small-text"),
            Self::Textarea | Self::Checkbox | Self::Radio | Self::Select | Self::Content => None,
        }
    }
}

impl FromStr for BuiltinKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Field type tag as written in configuration.
///
/// Tags that do not name a built-in type are kept verbatim so the engine can look
/// them up in its registry of caller-supplied types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    /// One of the built-in types.
    Builtin(BuiltinKind),
    /// Any other tag, including the empty tag of a field with no type.
    Other(String),
}

impl FieldKind {
    /// Render the kind as its configuration tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Builtin(kind) => kind.as_str(),
            Self::Other(tag) => tag,
        }
    }

    /// The built-in type, when the tag names one.
    #[must_use]
    pub const fn builtin(&self) -> Option<BuiltinKind> {
        match self {
            Self::Builtin(kind) => Some(*kind),
            Self::Other(_) => None,
        }
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<BuiltinKind> for FieldKind {
    fn from(kind: BuiltinKind) -> Self {
        Self::Builtin(kind)
    }
}

impl From<String> for FieldKind {
    fn from(tag: String) -> Self {
        tag.parse::<BuiltinKind>().map_or(Self::Other(tag), Self::Builtin)
    }
}

impl From<&str> for FieldKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Builtin(builtin) => builtin.as_str().to_string(),
            FieldKind::Other(tag) => tag,
        }
    }
}

/// Handling of non-numeric input submitted to a `number` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFallback {
    /// Keep the field's configured default.
    #[default]
    Default,
    /// Cast the leading integer of the input, which yields `0` for non-numeric input.
    Zero,
}

/// Scalar configuration value normalized to its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor).map(Self)
    }
}

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string, number, boolean or null")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<String, E> {
        Ok(if value {
            defaults::CHECKBOX_ON.to_string()
        } else {
            String::new()
        })
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    ScalarString::deserialize(deserializer).map(|scalar| scalar.0)
}

fn scalar_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, String>, D::Error> {
    let raw = Option::<IndexMap<ScalarString, ScalarString>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key.0, value.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_kind_parses_builtin_and_custom_tags() {
        assert_eq!(
            FieldKind::from("select"),
            FieldKind::Builtin(BuiltinKind::Select)
        );
        assert_eq!(
            FieldKind::from("color"),
            FieldKind::Other("color".to_string())
        );
        assert_eq!(FieldKind::default().as_str(), "");
        assert_eq!(String::from(FieldKind::from("number")), "number");
    }

    #[test]
    fn default_classes_follow_core_styling() {
        assert_eq!(BuiltinKind::Text.default_class(), Some("regular-text"));
        assert_eq!(BuiltinKind::Upload.default_class(), Some("regular-text"));
        assert_eq!(BuiltinKind::Number.default_class(), Some("small-text"));
        assert_eq!(BuiltinKind::Select.default_class(), None);
    }

    #[test]
    fn scalar_defaults_are_normalized_to_strings() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "type": "number",
            "default": 10,
            "attributes": { "min": 1, "required": true },
            "options": { "1": "One" }
        }))
        .expect("field should deserialize");
        assert_eq!(field.default, "10");
        assert_eq!(field.attributes.get("min").map(String::as_str), Some("1"));
        assert_eq!(
            field.attributes.get("required").map(String::as_str),
            Some("1")
        );

        let unchecked: FieldDefinition =
            serde_json::from_value(json!({ "type": "checkbox", "default": false }))
                .expect("checkbox should deserialize");
        assert_eq!(unchecked.default, "");
    }

    #[test]
    fn missing_type_and_default_are_empty() {
        let field: FieldDefinition =
            serde_json::from_value(json!({})).expect("empty field should deserialize");
        assert_eq!(field.kind, FieldKind::Other(String::new()));
        assert!(field.default.is_empty());
        assert!(field.options.is_empty());
    }

    #[test]
    fn page_defaults_apply_when_keys_are_omitted() {
        let page: PageConfig = serde_json::from_value(json!({ "option_id": "demo" }))
            .expect("page should deserialize");
        assert_eq!(page.number_fallback, NumberFallback::Default);
        assert!(page.unslash);
        assert_eq!(page.class_prefix, defaults::DEFAULT_CLASS_PREFIX);
        assert!(page.sections.is_empty());
    }

    #[test]
    fn declared_order_is_preserved() {
        let page: PageConfig = serde_json::from_str(
            r#"{
                "option_id": "demo",
                "sections": {
                    "zeta": { "title": "Z", "fields": { "b": {}, "a": {} } },
                    "alpha": { "title": "A" }
                }
            }"#,
        )
        .expect("page should deserialize");
        let keys: Vec<_> = page.sections.keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        let fields: Vec<_> = page.sections["zeta"].fields.keys().cloned().collect();
        assert_eq!(fields, ["b", "a"]);
    }
}
