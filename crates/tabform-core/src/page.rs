//! Full settings page: tabs, section descriptions, field rows and the form.
//!
//! # Design
//! - Rows are laid out server-side. An unlabeled checkbox directly after a labeled
//!   checkbox of the same section joins that row, so grouped toggles read as one
//!   setting with or without the tab controller.
//! - The initially active tab is chosen with the same prefix rule the browser
//!   controller applies to the URL fragment.

use std::fmt::Write as _;

use indexmap::IndexMap;
use tabform_config::{BuiltinKind, PageConfig};

use crate::field::{Field, FieldTable};
use crate::markup::{AllowList, MarkupFilter, escape_attr, escape_text};
use crate::normalize::{NormalizedPage, Section};
use crate::render::FieldRenderer;
use crate::resolve::ValueResolver;

/// Request-specific rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    /// Form action the page posts to.
    pub action: String,
    /// Section requested by the URL fragment, if known.
    pub fragment: Option<String>,
    /// Show the "settings saved" notice.
    pub saved: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            action: "/settings".to_string(),
            fragment: None,
            saved: false,
        }
    }
}

/// Stylesheet and script linked from a rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssets {
    /// Stylesheet URL.
    pub stylesheet: String,
    /// Tab controller script URL.
    pub script: String,
}

/// Group fields into table rows in display order.
#[must_use]
pub fn layout_rows(fields: &FieldTable) -> Vec<Vec<&Field>> {
    let mut rows: Vec<Vec<&Field>> = Vec::new();
    for field in fields.iter() {
        let joins_previous = is_checkbox(field)
            && !field.has_label()
            && rows.last().and_then(|row| row.first()).is_some_and(|lead| {
                is_checkbox(lead) && lead.has_label() && lead.section == field.section
            });
        if joins_previous {
            if let Some(row) = rows.last_mut() {
                row.push(field);
                continue;
            }
        }
        rows.push(vec![field]);
    }
    rows
}

fn is_checkbox(field: &Field) -> bool {
    field.builtin() == Some(BuiltinKind::Checkbox)
}

/// Section shown first for a URL fragment.
///
/// An exact key wins, then the first key the fragment is a prefix of, then the
/// first section. `None` only when there are no sections.
#[must_use]
pub fn initial_section<'s>(
    fragment: Option<&str>,
    sections: &'s IndexMap<String, Section>,
) -> Option<&'s str> {
    let fragment = fragment
        .map(|fragment| fragment.trim_start_matches('#'))
        .filter(|fragment| !fragment.is_empty());
    fragment
        .and_then(|fragment| {
            sections
                .get_key_value(fragment)
                .map(|(key, _)| key)
                .or_else(|| sections.keys().find(|key| key.starts_with(fragment)))
        })
        .or_else(|| sections.keys().next())
        .map(String::as_str)
}

/// Renders the page body for one request.
pub struct PageLayout<'a> {
    config: &'a PageConfig,
    page: &'a NormalizedPage,
    renderer: FieldRenderer<'a>,
    resolver: ValueResolver<'a>,
    markup: &'a MarkupFilter,
}

impl<'a> PageLayout<'a> {
    /// Lay out `page`, rendering values from `resolver`.
    #[must_use]
    pub fn new(
        config: &'a PageConfig,
        page: &'a NormalizedPage,
        renderer: FieldRenderer<'a>,
        resolver: ValueResolver<'a>,
        markup: &'a MarkupFilter,
    ) -> Self {
        Self {
            config,
            page,
            renderer,
            resolver,
            markup,
        }
    }

    /// Page body: title, description, notice, tabs and form.
    #[must_use]
    pub fn render(&self, options: &PageOptions) -> String {
        let prefix = self.config.class_prefix.as_str();
        let active = initial_section(options.fragment.as_deref(), &self.page.sections);
        let mut html = format!("<div id=\"{prefix}-content\" class=\"wrap\">");
        let _ = write!(html, "<h2>{}</h2>", escape_text(&self.config.page_title));

        if let Some(desc) = self.config.desc.as_deref().filter(|desc| !desc.is_empty()) {
            let _ = write!(html, "<p>{}</p>", self.markup.filter(desc, &AllowList::section()));
        }
        if options.saved {
            html.push_str(
                "<div id=\"setting-error-settings_updated\" class=\"notice notice-success settings-error\"><p><strong>Settings saved.</strong></p></div>",
            );
        }

        html.push_str(&self.tabs(active));

        let action = match active {
            Some(section) => format!("{}#{section}", options.action),
            None => options.action.clone(),
        };
        let _ = write!(
            html,
            "<form id=\"{prefix}-form\" method=\"post\" action=\"{}\">",
            escape_attr(&action)
        );
        html.push_str(&self.section_descriptions());
        html.push_str("<table class=\"form-table\" role=\"presentation\">");
        for row in layout_rows(&self.page.fields) {
            html.push_str(&self.row(&row));
        }
        html.push_str("</table>");
        html.push_str(
            "<p class=\"submit\"><input type=\"submit\" name=\"submit\" id=\"submit\" class=\"button button-primary\" value=\"Save Changes\" /></p>",
        );
        html.push_str("</form></div>");
        html
    }

    /// Row label markup for a field: its name plus the optional `after_name` note.
    #[must_use]
    pub fn label(&self, field: &Field) -> String {
        let Some(name) = field.definition.name.as_deref().filter(|name| !name.is_empty()) else {
            return String::new();
        };
        let mut label = name.to_string();
        if let Some(after) = field
            .definition
            .after_name
            .as_deref()
            .filter(|after| !after.is_empty())
        {
            let _ = write!(
                label,
                " <span class=\"{}-after-name\">{after}</span>",
                self.config.class_prefix
            );
        }
        self.markup.filter(&label, &AllowList::label())
    }

    fn tabs(&self, active: Option<&str>) -> String {
        let mut html = format!(
            "<h2 id=\"{}-tabs\" class=\"nav-tab-wrapper\">",
            self.config.class_prefix
        );
        for section in self.page.sections.values() {
            let class = if active == Some(section.key.as_str()) {
                "nav-tab nav-tab-active"
            } else {
                "nav-tab"
            };
            let key = escape_attr(&section.key);
            let _ = write!(
                html,
                "<a href=\"#{key}\" data-section=\"{key}\" class=\"{class}\">{}</a>",
                escape_text(&section.title)
            );
        }
        html.push_str("</h2>");
        html
    }

    fn section_descriptions(&self) -> String {
        let prefix = self.config.class_prefix.as_str();
        let mut html = String::new();
        for section in self.page.sections.values() {
            let Some(desc) = section.desc.as_deref().filter(|desc| !desc.is_empty()) else {
                continue;
            };
            let _ = write!(
                html,
                "<p id=\"{prefix}-section-desc-{}\" class=\"{prefix}-section-desc\">{}</p>",
                escape_attr(&section.key),
                self.markup.filter(desc, &AllowList::section())
            );
        }
        html
    }

    fn row(&self, fields: &[&Field]) -> String {
        let Some((lead, merged)) = fields.split_first() else {
            return String::new();
        };
        let mut html = format!(
            "<tr><th scope=\"row\">{}</th><td>{}",
            self.label(lead),
            self.field(lead)
        );
        for field in merged {
            let _ = write!(html, "<div>{}</div>", self.field(field));
        }
        html.push_str("</td></tr>");
        html
    }

    fn field(&self, field: &Field) -> String {
        self.renderer
            .render(field, &self.resolver.resolve(&field.id))
    }
}

/// Wrap a page body in a complete HTML document.
#[must_use]
pub fn render_document(title: &str, body: &str, assets: Option<&PageAssets>) -> String {
    let mut html = String::from("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\" />");
    let _ = write!(html, "<title>{}</title>", escape_text(title));
    if let Some(assets) = assets {
        let _ = write!(
            html,
            "<link rel=\"stylesheet\" href=\"{}\" />",
            escape_attr(&assets.stylesheet)
        );
    }
    html.push_str("</head><body>");
    html.push_str(body);
    if let Some(assets) = assets {
        let _ = write!(html, "<script src=\"{}\"></script>", escape_attr(&assets.script));
    }
    html.push_str("</body></html>");
    html
}
