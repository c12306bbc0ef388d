use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use tabform_api::{ApiServer, ApiState};
use tabform_core::{JsonFileStore, MemoryStore, OptionStore, SettingsPage};
use tabform_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

const ENV_PAGE_CONFIG: &str = "TABFORM_PAGE_CONFIG";
const ENV_STORE_PATH: &str = "TABFORM_STORE_PATH";
const ENV_BIND_ADDR: &str = "TABFORM_BIND_ADDR";
const ENV_ADMIN_TOKEN: &str = "TABFORM_ADMIN_TOKEN";
const ENV_LOG_LEVEL: &str = "TABFORM_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "TABFORM_LOG_FORMAT";

/// Listener address used when `TABFORM_BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 7171);

/// Settings required to bootstrap the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    /// Page configuration document (JSON or YAML).
    pub page_config: PathBuf,
    /// JSON record file; `None` keeps records in memory.
    pub store_path: Option<PathBuf>,
    /// Listener address.
    pub bind_addr: SocketAddr,
    /// Capability token required on the settings routes.
    pub admin_token: Option<String>,
    /// Log level filter.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl BootstrapSettings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable if set.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let page_config = value(ENV_PAGE_CONFIG)
            .map(PathBuf::from)
            .ok_or(AppError::MissingEnv {
                name: ENV_PAGE_CONFIG,
            })?;

        let bind_addr = match value(ENV_BIND_ADDR) {
            Some(raw) => raw.parse().map_err(|_| AppError::InvalidConfig {
                field: "bind_addr",
                reason: "not_a_socket_address",
                value: Some(raw),
            })?,
            None => DEFAULT_BIND_ADDR,
        };

        let log_format = match value(ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse()
                .map_err(|err| AppError::telemetry("log_format.parse", err))?,
            None => LogFormat::infer(),
        };

        Ok(Self {
            page_config,
            store_path: value(ENV_STORE_PATH).map(PathBuf::from),
            bind_addr,
            admin_token: value(ENV_ADMIN_TOKEN),
            log_level: value(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
        })
    }
}

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if the environment is invalid or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let settings = BootstrapSettings::from_env()?;
    let logging = LoggingConfig {
        level: &settings.log_level,
        format: settings.log_format,
        build_sha: option_env!("TABFORM_BUILD_SHA").unwrap_or("dev"),
    };
    tabform_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    run_app_with(settings).await
}

/// Boot sequence driven entirely by the supplied settings.
pub(crate) async fn run_app_with(settings: BootstrapSettings) -> AppResult<()> {
    info!("Tabform application bootstrap starting");

    enforce_loopback_guard(settings.bind_addr.ip(), settings.admin_token.is_some())?;
    let page = build_page(&settings)?;
    info!(
        option_id = %page.option_id(),
        sections = page.sections().len(),
        fields = page.fields().len(),
        "settings page ready"
    );

    let api = ApiServer::new(ApiState::new(Arc::new(page), settings.admin_token));
    info!(addr = %settings.bind_addr, "Launching settings listener");
    api.serve(settings.bind_addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("settings server shutdown complete");
    Ok(())
}

pub(crate) fn build_page(settings: &BootstrapSettings) -> AppResult<SettingsPage> {
    let config = tabform_config::load_page_config(&settings.page_config)
        .map_err(|err| AppError::config("page_config.load", err))?;
    let store: Arc<dyn OptionStore> = match &settings.store_path {
        Some(path) => {
            info!(path = %path.display(), "persisting option records to file");
            Arc::new(JsonFileStore::new(path))
        }
        None => {
            warn!("no store path configured; option records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    SettingsPage::with_store(config, store)
        .map_err(|err| AppError::settings("settings_page.new", err))
}

fn enforce_loopback_guard(bind_addr: IpAddr, has_token: bool) -> AppResult<()> {
    if !bind_addr.is_loopback() && !has_token {
        error!(
            bind_addr = %bind_addr,
            "refusing to expose the settings page on a non-loopback address without an admin token"
        );
        return Err(AppError::InvalidConfig {
            field: "bind_addr",
            reason: "non_loopback_without_token",
            value: Some(bind_addr.to_string()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn settings_apply_defaults() -> AppResult<()> {
        let settings = BootstrapSettings::from_lookup(lookup(&[(ENV_PAGE_CONFIG, "page.yaml")]))?;
        assert_eq!(settings.page_config, PathBuf::from("page.yaml"));
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.store_path, None);
        assert_eq!(settings.admin_token, None);
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.log_format, LogFormat::infer());
        Ok(())
    }

    #[test]
    fn settings_read_every_variable() -> AppResult<()> {
        let settings = BootstrapSettings::from_lookup(lookup(&[
            (ENV_PAGE_CONFIG, "/etc/tabform/page.json"),
            (ENV_STORE_PATH, "/var/lib/tabform/options.json"),
            (ENV_BIND_ADDR, "0.0.0.0:8080"),
            (ENV_ADMIN_TOKEN, " s3cret "),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_LOG_FORMAT, "json"),
        ]))?;
        assert_eq!(
            settings.store_path,
            Some(PathBuf::from("/var/lib/tabform/options.json"))
        );
        assert_eq!(settings.bind_addr.port(), 8080);
        assert_eq!(settings.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Json);
        Ok(())
    }

    #[test]
    fn settings_reject_missing_or_malformed_values() {
        assert!(matches!(
            BootstrapSettings::from_lookup(lookup(&[(ENV_PAGE_CONFIG, "  ")])),
            Err(AppError::MissingEnv {
                name: ENV_PAGE_CONFIG
            })
        ));
        assert!(matches!(
            BootstrapSettings::from_lookup(lookup(&[
                (ENV_PAGE_CONFIG, "page.yaml"),
                (ENV_BIND_ADDR, "localhost"),
            ])),
            Err(AppError::InvalidConfig {
                field: "bind_addr",
                ..
            })
        ));
        assert!(matches!(
            BootstrapSettings::from_lookup(lookup(&[
                (ENV_PAGE_CONFIG, "page.yaml"),
                (ENV_LOG_FORMAT, "xml"),
            ])),
            Err(AppError::Telemetry { .. })
        ));
    }

    #[test]
    fn loopback_guard_requires_token_off_loopback() {
        assert!(enforce_loopback_guard(IpAddr::from([127, 0, 0, 1]), false).is_ok());
        assert!(enforce_loopback_guard(IpAddr::from([192, 168, 1, 1]), true).is_ok());
        assert!(matches!(
            enforce_loopback_guard(IpAddr::from([192, 168, 1, 1]), false),
            Err(AppError::InvalidConfig {
                reason: "non_loopback_without_token",
                ..
            })
        ));
    }

    #[test]
    fn build_page_wires_file_store() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let page_config = dir.path().join("page.yaml");
        fs::write(
            &page_config,
            "option_id: demo\nsections:\n  general:\n    title: General\n    fields:\n      site_name:\n        type: text\n        default: My Site\n",
        )?;
        let settings = BootstrapSettings {
            page_config,
            store_path: Some(dir.path().join("options.json")),
            bind_addr: DEFAULT_BIND_ADDR,
            admin_token: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Pretty,
        };

        let page = build_page(&settings)?;
        assert_eq!(page.get("site_name")?, "My Site");
        page.update("site_name", "Acme")?;
        assert!(dir.path().join("options.json").exists());

        let reopened = build_page(&settings)?;
        assert_eq!(reopened.get("site_name")?, "Acme");
        Ok(())
    }

    #[test]
    fn build_page_reports_missing_config() {
        let settings = BootstrapSettings {
            page_config: PathBuf::from("/nonexistent/tabform/page.yaml"),
            store_path: None,
            bind_addr: DEFAULT_BIND_ADDR,
            admin_token: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Pretty,
        };
        assert!(matches!(build_page(&settings), Err(AppError::Config { .. })));
    }
}
