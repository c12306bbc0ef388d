//! Loading page configurations from JSON or YAML documents.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::PageConfig;

/// Document formats accepted by [`load_page_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON document (`.json`).
    Json,
    /// YAML document (`.yaml` / `.yml`).
    Yaml,
}

impl DocumentFormat {
    /// Infer the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Read and parse a page configuration, choosing the format by file extension.
///
/// # Errors
///
/// Returns an error when the file cannot be read, its extension is not recognised,
/// the document does not parse, or it names no option record.
pub fn load_page_config(path: impl AsRef<Path>) -> ConfigResult<PageConfig> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_document(&raw, format, Some(path.to_path_buf()))?;
    debug!(
        path = %path.display(),
        option_id = %config.option_id,
        sections = config.sections.len(),
        "loaded page configuration"
    );
    Ok(config)
}

/// Parse a page configuration from an in-memory document.
///
/// # Errors
///
/// Returns an error when the document does not parse or names no option record.
pub fn parse_page_config(raw: &str, format: DocumentFormat) -> ConfigResult<PageConfig> {
    parse_document(raw, format, None)
}

fn parse_document(
    raw: &str,
    format: DocumentFormat,
    path: Option<PathBuf>,
) -> ConfigResult<PageConfig> {
    let config: PageConfig = match format {
        DocumentFormat::Json => {
            serde_json::from_str(raw).map_err(|source| ConfigError::Json { path, source })?
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml { path, source })?
        }
    };
    if config.option_id.trim().is_empty() {
        return Err(ConfigError::MissingOptionId);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuiltinKind, NumberFallback};

    #[test]
    fn format_is_inferred_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("page.JSON")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("page.yml")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("page.toml")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("page")), None);
    }

    #[test]
    fn yaml_document_parses_with_order_and_variant() {
        let raw = r"
option_id: legacy_options
number_fallback: zero
sections:
  general:
    title: General
    fields:
      max_items:
        type: number
        default: 10
      layout:
        type: radio
        default: wide
        options:
          wide: Wide
          narrow: Narrow
";
        let config = parse_page_config(raw, DocumentFormat::Yaml).expect("yaml should parse");
        assert_eq!(config.number_fallback, NumberFallback::Zero);
        let fields = &config.sections["general"].fields;
        assert_eq!(fields["max_items"].default, "10");
        assert_eq!(
            fields["layout"].kind.builtin(),
            Some(BuiltinKind::Radio)
        );
        let options: Vec<_> = fields["layout"].options.keys().cloned().collect();
        assert_eq!(options, ["wide", "narrow"]);
    }

    #[test]
    fn blank_option_id_is_rejected() {
        let err = parse_page_config(r#"{"option_id": "  "}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOptionId));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let err = parse_page_config("{", DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Json { path: None, .. }));
    }
}
