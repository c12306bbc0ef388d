//! Flattened field table built from a page configuration.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tabform_config::{BuiltinKind, FieldDefinition};

use crate::registry::{ContentFn, FieldStrategy, SanitizeFn};

/// How a field is rendered and sanitized.
#[derive(Clone)]
pub enum FieldType {
    /// One of the built-in types.
    Builtin(BuiltinKind),
    /// A caller-supplied type found in the registry.
    Custom(Arc<dyn FieldStrategy>),
    /// A tag with no built-in or registered implementation.
    Unrecognized,
}

impl fmt::Debug for FieldType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(kind) => formatter.debug_tuple("Builtin").field(kind).finish(),
            Self::Custom(_) => formatter.write_str("Custom"),
            Self::Unrecognized => formatter.write_str("Unrecognized"),
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(left), Self::Builtin(right)) => left == right,
            (Self::Custom(left), Self::Custom(right)) => Arc::ptr_eq(left, right),
            (Self::Unrecognized, Self::Unrecognized) => true,
            _ => false,
        }
    }
}

/// A field definition stamped with its id and owning section.
#[derive(Clone)]
pub struct Field {
    /// Field id, unique across the page.
    pub id: String,
    /// Key of the section the field belongs to.
    pub section: String,
    /// Definition as configured.
    pub definition: FieldDefinition,
    /// Render/sanitize behavior resolved from the type tag.
    pub field_type: FieldType,
    pub(crate) content_hook: Option<ContentFn>,
    pub(crate) sanitize_hook: Option<SanitizeFn>,
}

impl Field {
    /// Configured type tag, used in CSS classes.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.definition.kind.as_str()
    }

    /// Built-in type of the field, if it has one.
    #[must_use]
    pub const fn builtin(&self) -> Option<BuiltinKind> {
        match self.field_type {
            FieldType::Builtin(kind) => Some(kind),
            FieldType::Custom(_) | FieldType::Unrecognized => None,
        }
    }

    /// Whether `value` is one of the configured option keys.
    #[must_use]
    pub fn has_option(&self, value: &str) -> bool {
        self.definition.options.contains_key(value)
    }

    /// Whether the field has a non-empty row label.
    #[must_use]
    pub fn has_label(&self) -> bool {
        self.definition
            .name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Field")
            .field("id", &self.id)
            .field("section", &self.section)
            .field("type", &self.field_type)
            .field("custom_content", &self.content_hook.is_some())
            .field("custom_sanitize", &self.sanitize_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.section == other.section
            && self.definition == other.definition
            && self.field_type == other.field_type
            && same_hook(self.content_hook.as_ref(), other.content_hook.as_ref())
            && same_hook(self.sanitize_hook.as_ref(), other.sanitize_hook.as_ref())
    }
}

fn same_hook<T: ?Sized>(left: Option<&Arc<T>>, right: Option<&Arc<T>>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => Arc::ptr_eq(left, right),
        (None, None) => true,
        _ => false,
    }
}

/// Field id to field mapping in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable {
    fields: IndexMap<String, Field>,
}

impl FieldTable {
    /// Look up a field by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Iterate fields in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Iterate the fields of one section in display order.
    pub fn in_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Field> {
        self.fields
            .values()
            .filter(move |field| field.section == section)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the table holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert a field, replacing any field with the same id in place.
    ///
    /// Returns the replaced field.
    pub(crate) fn insert(&mut self, field: Field) -> Option<Field> {
        self.fields.insert(field.id.clone(), field)
    }
}
