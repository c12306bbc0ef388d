use std::fs;

use tabform_config::{BuiltinKind, ConfigError, FieldKind, load_page_config};

const PAGE_JSON: &str = r#"{
    "option_id": "acme_settings",
    "page_title": "Acme Settings",
    "menu_title": "Acme",
    "sections": {
        "general": {
            "title": "General",
            "desc": "Basic <strong>site</strong> options.",
            "fields": {
                "site_name": { "type": "text", "name": "Site Name", "default": "My Site" },
                "theme_color": {
                    "type": "select",
                    "default": "red",
                    "options": { "red": "Red", "blue": "Blue" }
                }
            }
        },
        "advanced": {
            "title": "Advanced",
            "fields": {
                "swatch": { "type": "color_swatch" }
            }
        }
    }
}"#;

#[test]
fn loads_json_page_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("page.json");
    fs::write(&path, PAGE_JSON)?;

    let page = load_page_config(&path)?;
    assert_eq!(page.option_id, "acme_settings");
    assert_eq!(page.page_title, "Acme Settings");
    assert_eq!(page.sections.len(), 2);
    let general = &page.sections["general"];
    assert_eq!(general.desc.as_deref(), Some("Basic <strong>site</strong> options."));
    assert_eq!(
        general.fields["site_name"].kind,
        FieldKind::Builtin(BuiltinKind::Text)
    );
    assert_eq!(
        page.sections["advanced"].fields["swatch"].kind,
        FieldKind::Other("color_swatch".to_string())
    );
    Ok(())
}

#[test]
fn loads_yaml_page_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("page.yaml");
    fs::write(
        &path,
        "option_id: yaml_settings\nsections:\n  main:\n    title: Main\n    fields:\n      enabled:\n        type: checkbox\n        default: true\n",
    )?;

    let page = load_page_config(&path)?;
    assert_eq!(page.sections["main"].fields["enabled"].default, "1");
    Ok(())
}

#[test]
fn unknown_extension_is_rejected_before_reading() {
    let err = load_page_config("/nonexistent/page.ini").unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn missing_file_reports_io_error() {
    let err = load_page_config("/nonexistent/page.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
