//! Escaping and allow-list filtering for emitted and submitted markup.
//!
//! # Design
//! - Escaping delegates to `html-escape`; filtering is a tag-level allow-list: tags
//!   outside the list are dropped (their text survives), attributes outside the
//!   list are dropped, and URL attributes with executable protocols are removed.
//! - Patterns are compiled once per engine instance.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::error::{SettingsError, SettingsResult};

/// Protocols accepted in `href`/`src` attributes and in URL fields.
pub const ALLOWED_PROTOCOLS: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "gopher", "nntp", "feed", "telnet",
    "mms", "rtsp", "sms", "svn", "tel", "fax", "xmpp", "webcal", "urn",
];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

/// Escape a value for a double-quoted attribute.
#[must_use]
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

/// Escape a value for element text content.
#[must_use]
pub fn escape_text(value: &str) -> Cow<'_, str> {
    html_escape::encode_text(value)
}

/// Set of tags, and the attributes of each, that survive filtering.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    tags: HashMap<&'static str, &'static [&'static str]>,
}

impl AllowList {
    /// Build an allow-list from `(tag, attributes)` pairs.
    #[must_use]
    pub fn new(entries: &[(&'static str, &'static [&'static str])]) -> Self {
        Self {
            tags: entries.iter().copied().collect(),
        }
    }

    /// Inline tags permitted in field descriptions.
    #[must_use]
    pub fn description() -> Self {
        Self::new(&[
            ("b", &[]),
            ("strong", &[]),
            ("a", &["href", "target"]),
            ("br", &[]),
            ("span", &["class", "id"]),
            ("code", &[]),
        ])
    }

    /// Inline tags permitted in field labels.
    #[must_use]
    pub fn label() -> Self {
        Self::new(&[
            ("i", &[]),
            ("em", &[]),
            ("br", &[]),
            ("span", &["class", "id"]),
            ("a", &["href", "target"]),
            ("code", &[]),
        ])
    }

    /// Inline tags permitted in page and section descriptions.
    #[must_use]
    pub fn section() -> Self {
        Self::new(&[
            ("b", &[]),
            ("strong", &[]),
            ("i", &[]),
            ("em", &[]),
            ("br", &[]),
            ("a", &["href", "target"]),
            ("span", &["class", "id"]),
            ("code", &[]),
        ])
    }

    /// Tags permitted in rich content, matching what primary post content may carry.
    #[must_use]
    pub fn post() -> Self {
        const CLASS_ID: &[&str] = &["class", "id"];
        Self::new(&[
            ("a", &["href", "title", "target", "rel", "class", "id"]),
            ("abbr", &["title"]),
            ("b", &[]),
            ("blockquote", &["cite"]),
            ("br", &[]),
            ("code", &[]),
            ("del", &["datetime"]),
            ("div", CLASS_ID),
            ("em", &[]),
            ("h1", CLASS_ID),
            ("h2", CLASS_ID),
            ("h3", CLASS_ID),
            ("h4", CLASS_ID),
            ("h5", CLASS_ID),
            ("h6", CLASS_ID),
            ("hr", &[]),
            ("i", &[]),
            ("img", &["src", "alt", "title", "width", "height", "class"]),
            ("li", CLASS_ID),
            ("ol", CLASS_ID),
            ("p", CLASS_ID),
            ("pre", &[]),
            ("q", &["cite"]),
            ("s", &[]),
            ("small", &[]),
            ("span", CLASS_ID),
            ("strong", &[]),
            ("sub", &[]),
            ("sup", &[]),
            ("table", CLASS_ID),
            ("tbody", &[]),
            ("td", &["colspan", "rowspan"]),
            ("th", &["colspan", "rowspan", "scope"]),
            ("thead", &[]),
            ("tr", &[]),
            ("u", &[]),
            ("ul", CLASS_ID),
        ])
    }

    fn attributes(&self, tag: &str) -> Option<&'static [&'static str]> {
        self.tags.get(tag).copied()
    }
}

/// Compiled patterns used by the markup helpers.
#[derive(Debug, Clone)]
pub struct MarkupFilter {
    tag: Regex,
    attribute: Regex,
    comment: Regex,
    script: Regex,
    style: Regex,
    any_tag: Regex,
}

impl MarkupFilter {
    /// Compile the tag and attribute patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> SettingsResult<Self> {
        Ok(Self {
            tag: compile("tag", r"<(/?)([A-Za-z][A-Za-z0-9]*)\b([^<>]*)>")?,
            attribute: compile(
                "attribute",
                r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
            )?,
            comment: compile("comment", r"(?s)<!--.*?-->")?,
            script: compile("script", r"(?is)<script\b[^>]*>.*?</script\s*>")?,
            style: compile("style", r"(?is)<style\b[^>]*>.*?</style\s*>")?,
            any_tag: compile("any_tag", r"</?[A-Za-z!?/][^<>]*>")?,
        })
    }

    /// Remove every tag, dropping the bodies of `script` and `style` elements, then trim.
    #[must_use]
    pub fn strip_all_tags(&self, input: &str) -> String {
        let without_code = self.script.replace_all(input, "");
        let without_code = self.style.replace_all(&without_code, "");
        let without_comments = self.comment.replace_all(&without_code, "");
        self.any_tag
            .replace_all(&without_comments, "")
            .trim()
            .to_string()
    }

    /// Keep only tags and attributes named by `allow`.
    ///
    /// Disallowed tags are removed while their inner text is kept. Stray `<` and `>`
    /// characters are encoded.
    #[must_use]
    pub fn filter(&self, input: &str, allow: &AllowList) -> String {
        let input = self.comment.replace_all(input, "");
        let mut output = String::with_capacity(input.len());
        let mut cursor = 0;
        for captures in self.tag.captures_iter(&input) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            push_text(&mut output, &input[cursor..whole.start()]);
            cursor = whole.end();
            if let Some(tag) = self.rebuild_tag(&captures, allow) {
                output.push_str(&tag);
            }
        }
        push_text(&mut output, &input[cursor..]);
        output
    }

    fn rebuild_tag(&self, captures: &Captures<'_>, allow: &AllowList) -> Option<String> {
        let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = captures.get(2)?.as_str().to_ascii_lowercase();
        let permitted = allow.attributes(&name)?;
        if closing {
            return Some(format!("</{name}>"));
        }
        let raw_attributes = captures.get(3).map_or("", |m| m.as_str());
        let self_closing = raw_attributes.trim_end().ends_with('/');
        let mut tag = format!("<{name}");
        for attribute in self.attribute.captures_iter(raw_attributes) {
            let Some(attr_name) = attribute.get(1) else {
                continue;
            };
            let attr_name = attr_name.as_str().to_ascii_lowercase();
            if !permitted.contains(&attr_name.as_str()) {
                continue;
            }
            let value = attribute
                .get(2)
                .or_else(|| attribute.get(3))
                .or_else(|| attribute.get(4))
                .map_or("", |m| m.as_str());
            if URL_ATTRIBUTES.contains(&attr_name.as_str()) && !is_safe_reference(value) {
                continue;
            }
            tag.push_str(&format!(" {attr_name}=\"{}\"", value.replace('"', "&quot;")));
        }
        tag.push_str(if self_closing { " />" } else { ">" });
        Some(tag)
    }
}

fn compile(name: &'static str, pattern: &str) -> SettingsResult<Regex> {
    Regex::new(pattern).map_err(|source| SettingsError::Pattern { name, source })
}

fn push_text(output: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            other => output.push(other),
        }
    }
}

/// Whether a link target is relative or uses an allowed protocol.
#[must_use]
pub fn is_safe_reference(value: &str) -> bool {
    let decoded = html_escape::decode_html_entities(value);
    let compact: String = decoded
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect();
    match scheme_of(&compact) {
        Some(scheme) => ALLOWED_PROTOCOLS.contains(&scheme.to_ascii_lowercase().as_str()),
        None => true,
    }
}

/// Scheme of a reference, when one precedes any path, query or fragment delimiter.
pub(crate) fn scheme_of(reference: &str) -> Option<&str> {
    let colon = reference.find(':')?;
    let delimiter = reference.find(['/', '?', '#']).unwrap_or(usize::MAX);
    (colon < delimiter && colon > 0).then(|| &reference[..colon])
}
