//! Cleaning of submitted values before they are stored.
//!
//! # Design
//! - One output entry per submitted key. Unknown keys map to the empty string and
//!   known keys are never dropped, so the output key set equals the input key set
//!   until the `sanitized` hook runs.
//! - Invalid choices fall back to the current value from the resolver, which reads
//!   the same record snapshot as the rest of the pass.
//! - Numeric policy is chosen per page through [`NumberFallback`].

use tabform_config::{BuiltinKind, CHECKBOX_ON, NumberFallback};
use tracing::trace;

use crate::field::{Field, FieldTable, FieldType};
use crate::hooks::SettingsHooks;
use crate::markup::{ALLOWED_PROTOCOLS, AllowList, MarkupFilter, scheme_of};
use crate::resolve::ValueResolver;
use crate::store::Record;

/// Per-page sanitization options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Handling of non-numeric `number` input.
    pub number_fallback: NumberFallback,
    /// Strip backslash escapes before the type rules run.
    pub unslash: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            number_fallback: NumberFallback::Default,
            unslash: true,
        }
    }
}

/// Sanitizes one submission against a field table.
#[derive(Clone, Copy)]
pub struct Sanitizer<'a> {
    fields: &'a FieldTable,
    resolver: ValueResolver<'a>,
    markup: &'a MarkupFilter,
    hooks: &'a dyn SettingsHooks,
    options: SanitizeOptions,
}

impl<'a> Sanitizer<'a> {
    /// Build a sanitizer; `resolver` supplies fallbacks for rejected choices.
    #[must_use]
    pub fn new(
        fields: &'a FieldTable,
        resolver: ValueResolver<'a>,
        markup: &'a MarkupFilter,
        hooks: &'a dyn SettingsHooks,
        options: SanitizeOptions,
    ) -> Self {
        Self {
            fields,
            resolver,
            markup,
            hooks,
            options,
        }
    }

    /// Sanitize every submitted pair, then apply the `sanitized` hook.
    #[must_use]
    pub fn sanitize(&self, submitted: &Record) -> Record {
        let output = submitted
            .iter()
            .map(|(key, value)| (key.clone(), self.sanitize_value(key, value)))
            .collect();
        self.hooks.sanitized(output, submitted)
    }

    /// Sanitize a single submitted value.
    #[must_use]
    pub fn sanitize_value(&self, field_id: &str, raw: &str) -> String {
        let Some(field) = self.fields.get(field_id) else {
            trace!(field_id, "discarding value for unknown field");
            return String::new();
        };

        let unslashed = if self.options.unslash {
            unslash(raw)
        } else {
            raw.to_string()
        };
        let value = unslashed.trim();
        let mut cleaned = self.apply_type_rules(field, value);
        if let Some(hook) = &field.sanitize_hook {
            cleaned = hook(&cleaned, field);
        }
        cleaned.trim().to_string()
    }

    fn apply_type_rules(&self, field: &Field, value: &str) -> String {
        match &field.field_type {
            FieldType::Builtin(kind) => self.builtin_rules(*kind, field, value),
            FieldType::Custom(strategy) => strategy.sanitize(value, field),
            FieldType::Unrecognized => value.to_string(),
        }
    }

    fn builtin_rules(&self, kind: BuiltinKind, field: &Field, value: &str) -> String {
        match kind {
            BuiltinKind::Text | BuiltinKind::Textarea => {
                let text = if field.definition.allow_html {
                    value.to_string()
                } else {
                    self.markup.strip_all_tags(value)
                };
                self.markup.filter(&text, &AllowList::post())
            }
            BuiltinKind::Url | BuiltinKind::Upload => coerce_url(value),
            BuiltinKind::Checkbox => {
                if value.is_empty() {
                    String::new()
                } else {
                    CHECKBOX_ON.to_string()
                }
            }
            BuiltinKind::Radio | BuiltinKind::Select => {
                if field.has_option(value) {
                    value.to_string()
                } else {
                    self.resolver.resolve(&field.id)
                }
            }
            BuiltinKind::Number => {
                coerce_number(value, self.options.number_fallback, &field.definition.default)
            }
            BuiltinKind::Content => String::new(),
        }
    }
}

/// Remove backslash escapes: `\x` becomes `x` and a trailing lone backslash is dropped.
#[must_use]
pub fn unslash(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                output.push(escaped);
            }
        } else {
            output.push(ch);
        }
    }
    output
}

/// Coerce input to an absolute URL with an allowed protocol, or the empty string.
///
/// Whitespace and control characters are removed and a bare host gets `http://`.
/// Relative references are rejected. The accepted value is returned as written
/// rather than in normalized form.
#[must_use]
pub fn coerce_url(value: &str) -> String {
    let compact: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect();
    if compact.is_empty() || compact.starts_with(['/', '#', '?', '.']) {
        return String::new();
    }

    let candidate = match scheme_of(&compact).map(str::to_ascii_lowercase) {
        Some(scheme) if ALLOWED_PROTOCOLS.contains(&scheme.as_str()) => compact,
        Some(_) if !looks_like_port(&compact) => return String::new(),
        _ => format!("http://{compact}"),
    };

    match url::Url::parse(&candidate) {
        Ok(parsed) if ALLOWED_PROTOCOLS.contains(&parsed.scheme()) => candidate,
        _ => String::new(),
    }
}

// `example.com:8080/path` has no scheme; its "scheme" is a host followed by a port.
fn looks_like_port(reference: &str) -> bool {
    reference.split_once(':').is_some_and(|(host, rest)| {
        host.contains('.') && rest.starts_with(|ch: char| ch.is_ascii_digit())
    })
}

/// Coerce `number` input according to `fallback`.
#[must_use]
pub fn coerce_number(value: &str, fallback: NumberFallback, default: &str) -> String {
    match fallback {
        NumberFallback::Default => parse_numeric(value)
            .map_or_else(|| default.to_string(), |number| number.to_string()),
        NumberFallback::Zero => leading_integer(value).to_string(),
    }
}

/// Parse a decimal numeric string (sign, digits, fraction, exponent), truncated
/// toward zero.
#[allow(clippy::cast_possible_truncation)]
fn parse_numeric(value: &str) -> Option<i64> {
    let value = value.trim();
    let body = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(index) => (&body[..index], Some(&body[index + 1..])),
        None => (body, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits_only = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return None;
    }
    if let Some(exponent) = exponent {
        let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent.is_empty() || !digits_only(exponent) {
            return None;
        }
    }
    let parsed: f64 = value.parse().ok()?;
    parsed.is_finite().then(|| parsed.trunc() as i64)
}

/// Integer formed by the leading sign and digits of `value`, or zero.
fn leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    signed
        .parse()
        .unwrap_or(if negative { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoHooks;
    use crate::normalize::normalize;
    use crate::registry::{FieldRegistry, FieldStrategy, RenderContext};
    use tabform_config::{FieldDefinition, PageConfig, SectionConfig};

    fn config() -> PageConfig {
        let mut rich = FieldDefinition::of_kind(BuiltinKind::Textarea);
        rich.allow_html = true;
        let mut shouty = FieldDefinition::of_kind(BuiltinKind::Text);
        shouty.custom_sanitize = Some("upper".into());
        PageConfig::new("demo").with_section(
            "general",
            SectionConfig::titled("General")
                .with_field(
                    "site_name",
                    FieldDefinition::of_kind(BuiltinKind::Text).with_default("My Site"),
                )
                .with_field("bio", rich)
                .with_field("homepage", FieldDefinition::of_kind(BuiltinKind::Url))
                .with_field("newsletter", FieldDefinition::of_kind(BuiltinKind::Checkbox))
                .with_field(
                    "theme_color",
                    FieldDefinition::of_kind(BuiltinKind::Select)
                        .with_default("red")
                        .with_option("blue", "Blue")
                        .with_option("green", "Green"),
                )
                .with_field(
                    "max_items",
                    FieldDefinition::of_kind(BuiltinKind::Number).with_default("10"),
                )
                .with_field("notice", FieldDefinition::of_kind(BuiltinKind::Content))
                .with_field("shouty", shouty)
                .with_field("accent", FieldDefinition::of_kind("color")),
        )
    }

    struct HexColor;

    impl FieldStrategy for HexColor {
        fn render(&self, _context: &RenderContext<'_>) -> String {
            String::new()
        }

        fn sanitize(&self, value: &str, _field: &Field) -> String {
            if value.starts_with('#') && value.len() == 7 {
                value.to_ascii_lowercase()
            } else {
                String::new()
            }
        }
    }

    fn registry() -> FieldRegistry {
        FieldRegistry::new()
            .with_type("color", HexColor)
            .with_sanitizer("upper", |value, _field| value.to_uppercase())
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    fn sanitize_with(
        stored: Option<&Record>,
        options: SanitizeOptions,
        submitted: &Record,
    ) -> Record {
        let page = normalize(&config(), &registry(), &NoHooks);
        let markup = MarkupFilter::new().expect("patterns compile");
        let resolver = ValueResolver::new(&page.fields, stored, &NoHooks);
        Sanitizer::new(&page.fields, resolver, &markup, &NoHooks, options).sanitize(submitted)
    }

    fn sanitize(stored: Option<&Record>, submitted: &Record) -> Record {
        sanitize_with(stored, SanitizeOptions::default(), submitted)
    }

    #[test]
    fn text_strips_markup_and_trims() {
        let out = sanitize(None, &record(&[("site_name", "  <script>x</script>Acme  ")]));
        assert_eq!(out["site_name"], "Acme");
    }

    #[test]
    fn allow_html_keeps_safe_markup_only() {
        let out = sanitize(
            None,
            &record(&[("bio", "<p>Hi <strong>there</strong></p><iframe src=\"x\"></iframe>")]),
        );
        assert_eq!(out["bio"], "<p>Hi <strong>there</strong></p>");
    }

    #[test]
    fn unknown_keys_become_empty_and_keys_are_preserved() {
        let submitted = record(&[("ghost", "boo"), ("site_name", "Acme"), ("notice", "text")]);
        let out = sanitize(None, &submitted);
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, ["ghost", "site_name", "notice"]);
        assert_eq!(out["ghost"], "");
        assert_eq!(out["notice"], "");
    }

    #[test]
    fn checkbox_is_binary() {
        for (input, expected) in [("", ""), ("1", "1"), ("on", "1"), ("   ", "")] {
            let out = sanitize(None, &record(&[("newsletter", input)]));
            assert_eq!(out["newsletter"], expected, "input {input:?}");
        }
    }

    #[test]
    fn invalid_choice_keeps_current_value() {
        let stored = record(&[("theme_color", "blue")]);
        let out = sanitize(Some(&stored), &record(&[("theme_color", "purple")]));
        assert_eq!(out["theme_color"], "blue");

        let accepted = sanitize(Some(&stored), &record(&[("theme_color", "green")]));
        assert_eq!(accepted["theme_color"], "green");

        let unsaved = sanitize(None, &record(&[("theme_color", "purple")]));
        assert_eq!(unsaved["theme_color"], "red");
    }

    #[test]
    fn number_policies_diverge_on_non_numeric_input() {
        let submitted = record(&[("max_items", "abc")]);
        assert_eq!(sanitize(None, &submitted)["max_items"], "10");

        let zero = SanitizeOptions {
            number_fallback: NumberFallback::Zero,
            ..SanitizeOptions::default()
        };
        assert_eq!(sanitize_with(None, zero, &submitted)["max_items"], "0");
        assert_eq!(
            sanitize_with(None, zero, &record(&[("max_items", "12abc")]))["max_items"],
            "12"
        );
    }

    #[test]
    fn numeric_strings_are_truncated_to_integers() {
        assert_eq!(coerce_number("42", NumberFallback::Default, "0"), "42");
        assert_eq!(coerce_number("-7.9", NumberFallback::Default, "0"), "-7");
        assert_eq!(coerce_number("1e3", NumberFallback::Default, "0"), "1000");
        assert_eq!(coerce_number(".5", NumberFallback::Default, "0"), "0");
        assert_eq!(coerce_number("inf", NumberFallback::Default, "3"), "3");
        assert_eq!(coerce_number("1e", NumberFallback::Default, "3"), "3");
        assert_eq!(coerce_number("", NumberFallback::Default, "3"), "3");
        assert_eq!(coerce_number("-15px", NumberFallback::Zero, "3"), "-15");
        assert_eq!(coerce_number("", NumberFallback::Zero, "3"), "0");
    }

    #[test]
    fn urls_must_be_absolute_with_allowed_protocol() {
        assert_eq!(coerce_url("https://example.com/a b"), "https://example.com/ab");
        assert_eq!(coerce_url("example.com/page"), "http://example.com/page");
        assert_eq!(coerce_url("example.com:8080/x"), "http://example.com:8080/x");
        assert_eq!(coerce_url("mailto:team@example.com"), "mailto:team@example.com");
        assert_eq!(coerce_url("javascript:alert(1)"), "");
        assert_eq!(coerce_url("/relative"), "");
        assert_eq!(coerce_url("   "), "");

        let out = sanitize(None, &record(&[("homepage", " HTTPS://Example.com ")]));
        assert_eq!(out["homepage"], "HTTPS://Example.com");
    }

    #[test]
    fn unslash_removes_escapes() {
        assert_eq!(unslash(r#"O\'Reilly \"quoted\" a\\b\"#), r#"O'Reilly "quoted" a\b"#);
        let kept = SanitizeOptions {
            unslash: false,
            ..SanitizeOptions::default()
        };
        let out = sanitize_with(None, kept, &record(&[("site_name", r"C:\path")]));
        assert_eq!(out["site_name"], r"C:\path");
    }

    #[test]
    fn custom_type_and_hook_run_in_order() {
        let out = sanitize(
            None,
            &record(&[("accent", " #FF00AA "), ("shouty", " <b>hey</b> ")]),
        );
        assert_eq!(out["accent"], "#ff00aa");
        assert_eq!(out["shouty"], "HEY");
    }

    struct AddStamp;

    impl SettingsHooks for AddStamp {
        fn sanitized(&self, mut output: Record, input: &Record) -> Record {
            output.insert("submitted_keys".into(), input.len().to_string());
            output
        }
    }

    #[test]
    fn sanitized_hook_sees_output_and_input() {
        let page = normalize(&config(), &registry(), &NoHooks);
        let markup = MarkupFilter::new().expect("patterns compile");
        let resolver = ValueResolver::new(&page.fields, None, &NoHooks);
        let out = Sanitizer::new(
            &page.fields,
            resolver,
            &markup,
            &AddStamp,
            SanitizeOptions::default(),
        )
        .sanitize(&record(&[("site_name", "Acme")]));
        assert_eq!(out["submitted_keys"], "1");
        assert_eq!(out["site_name"], "Acme");
    }
}
