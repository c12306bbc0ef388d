//! Registry of caller-supplied field types and per-field hooks.
//!
//! Built-in types dispatch through a closed enum. Anything else is resolved here
//! once, at normalization, by tag or by hook name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tabform_config::FieldKind;
use tracing::warn;

use crate::field::{Field, FieldType};

/// Everything a renderer needs to emit one control.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Field being rendered.
    pub field: &'a Field,
    /// Current value from the resolver.
    pub value: &'a str,
    /// Submission name, `option_id[field_id]`.
    pub name: &'a str,
    /// Element id of the primary control.
    pub element_id: &'a str,
    /// Space-separated CSS classes for the control.
    pub classes: &'a str,
    /// Pre-escaped `name`, `class` and custom attributes.
    pub common_attributes: &'a str,
    /// Prefix for auxiliary classes.
    pub class_prefix: &'a str,
}

/// Render and sanitize strategy for a caller-defined field type.
pub trait FieldStrategy: Send + Sync {
    /// Produce the control markup.
    fn render(&self, context: &RenderContext<'_>) -> String;

    /// Clean a trimmed submitted value. The default keeps it unchanged.
    fn sanitize(&self, value: &str, _field: &Field) -> String {
        value.to_string()
    }

    /// Styling class added to the control, if any.
    fn default_class(&self) -> Option<&str> {
        None
    }
}

/// Render hook replacing the built-in control of a single field.
pub type ContentFn = Arc<dyn Fn(&RenderContext<'_>) -> String + Send + Sync>;
/// Sanitize hook run after the type rules of a single field.
pub type SanitizeFn = Arc<dyn Fn(&str, &Field) -> String + Send + Sync>;

/// Type tags and hook names available to page configurations.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    types: HashMap<String, Arc<dyn FieldStrategy>>,
    content: HashMap<String, ContentFn>,
    sanitizers: HashMap<String, SanitizeFn>,
}

impl FieldRegistry {
    /// Registry with built-in types only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a caller-defined type under `tag`.
    ///
    /// Tags naming a built-in type are ignored, since built-ins always win.
    pub fn register_type(&mut self, tag: impl Into<String>, strategy: impl FieldStrategy + 'static) {
        let tag = tag.into();
        if FieldKind::from(tag.as_str()).builtin().is_some() {
            warn!(tag = %tag, "ignoring custom field type that shadows a built-in type");
            return;
        }
        self.types.insert(tag, Arc::new(strategy));
    }

    /// Register a render hook referenced by `custom_content`.
    pub fn register_content<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.content.insert(name.into(), Arc::new(hook));
    }

    /// Register a sanitize hook referenced by `custom_sanitize`.
    pub fn register_sanitizer<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&str, &Field) -> String + Send + Sync + 'static,
    {
        self.sanitizers.insert(name.into(), Arc::new(hook));
    }

    /// Builder form of [`Self::register_type`].
    #[must_use]
    pub fn with_type(mut self, tag: impl Into<String>, strategy: impl FieldStrategy + 'static) -> Self {
        self.register_type(tag, strategy);
        self
    }

    /// Builder form of [`Self::register_content`].
    #[must_use]
    pub fn with_content<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        self.register_content(name, hook);
        self
    }

    /// Builder form of [`Self::register_sanitizer`].
    #[must_use]
    pub fn with_sanitizer<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&str, &Field) -> String + Send + Sync + 'static,
    {
        self.register_sanitizer(name, hook);
        self
    }

    /// Resolve a configured type tag.
    #[must_use]
    pub fn resolve_type(&self, kind: &FieldKind) -> FieldType {
        match kind {
            FieldKind::Builtin(builtin) => FieldType::Builtin(*builtin),
            FieldKind::Other(tag) => self
                .types
                .get(tag)
                .map_or(FieldType::Unrecognized, |strategy| {
                    FieldType::Custom(Arc::clone(strategy))
                }),
        }
    }

    /// Render hook registered under `name`.
    #[must_use]
    pub fn content(&self, name: &str) -> Option<ContentFn> {
        self.content.get(name).cloned()
    }

    /// Sanitize hook registered under `name`.
    #[must_use]
    pub fn sanitizer(&self, name: &str) -> Option<SanitizeFn> {
        self.sanitizers.get(name).cloned()
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.types.keys().collect();
        types.sort();
        let mut content: Vec<_> = self.content.keys().collect();
        content.sort();
        let mut sanitizers: Vec<_> = self.sanitizers.keys().collect();
        sanitizers.sort();
        formatter
            .debug_struct("FieldRegistry")
            .field("types", &types)
            .field("content", &content)
            .field("sanitizers", &sanitizers)
            .finish()
    }
}
