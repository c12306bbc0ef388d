//! Markup for a single field control.
//!
//! # Design
//! - Every dynamic value is escaped for its context; configured rich text goes
//!   through an allow-list instead.
//! - A field's `custom_content` hook replaces both the control and its description.
//! - The control is wrapped in a container carrying the section marker class, which
//!   the page layout and the tab controller use to show one section at a time.

use std::fmt::Write as _;

use tabform_config::{BuiltinKind, CHECKBOX_ON};

use crate::field::{Field, FieldType};
use crate::hooks::SettingsHooks;
use crate::markup::{AllowList, MarkupFilter, escape_attr, escape_text, is_safe_reference};
use crate::registry::RenderContext;

/// Renders field controls for one page.
#[derive(Clone, Copy)]
pub struct FieldRenderer<'a> {
    option_id: &'a str,
    class_prefix: &'a str,
    markup: &'a MarkupFilter,
    hooks: &'a dyn SettingsHooks,
}

impl<'a> FieldRenderer<'a> {
    /// Build a renderer emitting names under `option_id` and classes under `class_prefix`.
    #[must_use]
    pub fn new(
        option_id: &'a str,
        class_prefix: &'a str,
        markup: &'a MarkupFilter,
        hooks: &'a dyn SettingsHooks,
    ) -> Self {
        Self {
            option_id,
            class_prefix,
            markup,
            hooks,
        }
    }

    /// Submission name of a field, `option_id[field_id]`.
    #[must_use]
    pub fn input_name(&self, field_id: &str) -> String {
        format!("{}[{field_id}]", self.option_id)
    }

    /// Element id of a field's primary control, escaped for an attribute value.
    #[must_use]
    pub fn element_id(&self, field_id: &str) -> String {
        format!("{}-field-{}", self.class_prefix, escape_attr(field_id))
    }

    /// Space-separated classes of a field's control.
    #[must_use]
    pub fn classes(&self, field: &Field) -> String {
        let prefix = self.class_prefix;
        let mut classes = vec![format!("{prefix}-field"), format!("{prefix}-{}", field.type_tag())];
        let type_class = match &field.field_type {
            FieldType::Builtin(kind) => kind.default_class(),
            FieldType::Custom(strategy) => strategy.default_class(),
            FieldType::Unrecognized => None,
        };
        if let Some(type_class) = type_class.filter(|class| !class.is_empty()) {
            classes.push(type_class.to_string());
        }
        if let Some(custom) = field
            .definition
            .class
            .as_deref()
            .map(str::trim)
            .filter(|class| !class.is_empty())
        {
            classes.push(custom.to_string());
        }
        classes.join(" ")
    }

    /// Render `field` showing `value`, wrapped in its section container.
    #[must_use]
    pub fn render(&self, field: &Field, value: &str) -> String {
        let name = self.input_name(&field.id);
        let element_id = self.element_id(&field.id);
        let classes = self.classes(field);
        let common_attributes = common_attributes(field, &name, &classes);
        let context = RenderContext {
            field,
            value,
            name: &name,
            element_id: &element_id,
            classes: &classes,
            common_attributes: &common_attributes,
            class_prefix: self.class_prefix,
        };

        let html = match &field.content_hook {
            Some(hook) => self.hooks.field_control(field, hook(&context)),
            None => {
                let control = self.control(&context);
                let mut html = self.hooks.field_control(field, control);
                html.push_str(&self.description(field));
                html
            }
        };

        let wrapped = format!(
            "<div class=\"{prefix}-section {prefix}-section-{section}\"> {html}</div>",
            prefix = self.class_prefix,
            section = escape_attr(&field.section),
        );
        self.hooks.field_markup(field, wrapped)
    }

    fn control(&self, context: &RenderContext<'_>) -> String {
        match &context.field.field_type {
            FieldType::Builtin(kind) => self.builtin_control(*kind, context),
            FieldType::Custom(strategy) => strategy.render(context),
            FieldType::Unrecognized => String::new(),
        }
    }

    fn builtin_control(&self, kind: BuiltinKind, context: &RenderContext<'_>) -> String {
        match kind {
            BuiltinKind::Text | BuiltinKind::Url => single_line(context, "text"),
            BuiltinKind::Number => single_line(context, "number"),
            BuiltinKind::Textarea => format!(
                "<textarea {} id=\"{}\">{}</textarea>",
                context.common_attributes,
                context.element_id,
                escape_text(context.value)
            ),
            BuiltinKind::Upload => self.upload(context),
            BuiltinKind::Checkbox => self.checkbox(context),
            BuiltinKind::Radio => self.radio(context),
            BuiltinKind::Select => select(context),
            BuiltinKind::Content => context
                .field
                .definition
                .content
                .as_deref()
                .map(|content| self.markup.filter(content, &AllowList::post()))
                .unwrap_or_default(),
        }
    }

    fn upload(&self, context: &RenderContext<'_>) -> String {
        let definition = &context.field.definition;
        let prefix = self.class_prefix;
        let show_image = definition
            .upload_show_image
            .map(|width| width.to_string())
            .unwrap_or_default();
        let mut html = format!(
            "<input type=\"text\" {} id=\"{}\" value=\"{}\" data-{prefix}-upload-show-image=\"{show_image}\" />",
            context.common_attributes,
            context.element_id,
            escape_attr(context.value),
        );
        let _ = write!(
            html,
            "<input type=\"button\" value=\"{}\" class=\"upload_button button {prefix}-upload-file\" data-{prefix}-upload-type=\"{}\" data-{prefix}-upload-title=\"{}\" /> ",
            escape_attr(definition.upload_button.as_deref().unwrap_or_default()),
            escape_attr(definition.upload_type.as_deref().unwrap_or_default()),
            escape_attr(definition.upload_title.as_deref().unwrap_or_default()),
        );
        let previewable = !context.value.is_empty() && is_safe_reference(context.value);
        if let Some(width) = definition.upload_show_image.filter(|_| previewable) {
            let _ = write!(
                html,
                "<img src=\"{}\" width=\"{width}\" alt=\"\" class=\"{prefix}-upload-preview\" />",
                escape_attr(context.value),
            );
        }
        html
    }

    fn checkbox(&self, context: &RenderContext<'_>) -> String {
        let checked = if context.value == CHECKBOX_ON {
            " checked='checked'"
        } else {
            ""
        };
        let mut html = format!(
            "<input type=\"hidden\" {} value=\"\" /><label for=\"{}\">\t<input type=\"checkbox\" {} id=\"{}\" value=\"{CHECKBOX_ON}\"{checked}/>",
            context.common_attributes,
            context.element_id,
            context.common_attributes,
            context.element_id,
        );
        if let Some(label) = context
            .field
            .definition
            .checkbox_label
            .as_deref()
            .filter(|label| !label.is_empty())
        {
            html.push_str(&self.markup.filter(label, &AllowList::label()));
        }
        html.push_str("</label>");
        html
    }

    fn radio(&self, context: &RenderContext<'_>) -> String {
        let definition = &context.field.definition;
        let container_class = if definition.inline {
            format!("{0}-radio-container {0}-inline", self.class_prefix)
        } else {
            format!("{}-radio-container", self.class_prefix)
        };
        let mut html = String::new();
        for (option_value, option_text) in &definition.options {
            let radio_id = format!("{}-{}", context.element_id, escape_attr(option_value));
            let checked = if *option_value == context.value {
                " checked='checked'"
            } else {
                ""
            };
            let _ = write!(
                html,
                "<div class=\"{container_class}\">\t<label for=\"{radio_id}\">\t\t<input type=\"radio\" {} id=\"{radio_id}\" value=\"{}\"{checked}/>{}\t</label></div>",
                context.common_attributes,
                escape_attr(option_value),
                escape_text(option_text),
            );
        }
        html
    }

    fn description(&self, field: &Field) -> String {
        field
            .definition
            .desc
            .as_deref()
            .filter(|desc| !desc.is_empty())
            .map(|desc| {
                format!(
                    "<p class=\"description\">{}</p>",
                    self.markup.filter(desc, &AllowList::description())
                )
            })
            .unwrap_or_default()
    }
}

fn common_attributes(field: &Field, name: &str, classes: &str) -> String {
    let mut attributes = format!("name=\"{}\" class=\"{}\"", escape_attr(name), escape_attr(classes));
    for (attribute, value) in &field.definition.attributes {
        if attribute.is_empty() || !attribute.chars().all(is_attribute_char) {
            continue;
        }
        let _ = write!(attributes, " {attribute}=\"{}\"", escape_attr(value));
    }
    attributes
}

fn is_attribute_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.')
}

fn single_line(context: &RenderContext<'_>, input_type: &str) -> String {
    format!(
        "<input type=\"{input_type}\" {} id=\"{}\" value=\"{}\" />",
        context.common_attributes,
        context.element_id,
        escape_attr(context.value)
    )
}

fn select(context: &RenderContext<'_>) -> String {
    let options = &context.field.definition.options;
    if options.is_empty() {
        return String::new();
    }
    let mut html = format!(
        "<select {} id=\"{}\">",
        context.common_attributes, context.element_id
    );
    for (option_value, option_text) in options {
        let selected = if *option_value == context.value {
            "selected='selected'"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<option value=\"{}\" {selected}> {}</option>",
            escape_attr(option_value),
            escape_text(option_text),
        );
    }
    html.push_str("</select>");
    html
}
