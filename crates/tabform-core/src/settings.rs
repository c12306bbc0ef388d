//! Settings page facade tying configuration, store and hooks together.
//!
//! # Design
//! - Built once at startup; immutable afterwards and shareable across requests.
//! - Each render or save pass reads the record once and hands that snapshot to the
//!   resolver, renderer and sanitizer.
//! - A save writes the sanitized submission wholesale, then runs `after_save`.

use std::sync::Arc;

use indexmap::IndexMap;
use tabform_config::PageConfig;
use tracing::{debug, info};

use crate::error::{SettingsError, SettingsResult};
use crate::field::FieldTable;
use crate::hooks::{NoHooks, SettingsHooks};
use crate::markup::MarkupFilter;
use crate::normalize::{NormalizedPage, Section, normalize};
use crate::page::{PageAssets, PageLayout, PageOptions, render_document};
use crate::registry::FieldRegistry;
use crate::render::FieldRenderer;
use crate::resolve::ValueResolver;
use crate::sanitize::{SanitizeOptions, Sanitizer};
use crate::store::{OptionStore, Record};
use crate::submission::collect_submission;

/// A configured settings page backed by an option store.
pub struct SettingsPage {
    config: PageConfig,
    page: NormalizedPage,
    store: Arc<dyn OptionStore>,
    hooks: Arc<dyn SettingsHooks>,
    markup: MarkupFilter,
}

impl SettingsPage {
    /// Build a page from `config`, resolving custom types and hooks in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup patterns fail to compile.
    pub fn new(
        config: PageConfig,
        store: Arc<dyn OptionStore>,
        registry: &FieldRegistry,
        hooks: Arc<dyn SettingsHooks>,
    ) -> SettingsResult<Self> {
        let config = hooks.config(config);
        let page = normalize(&config, registry, hooks.as_ref());
        debug!(
            option_id = %config.option_id,
            sections = page.sections.len(),
            fields = page.fields.len(),
            "settings page normalized"
        );
        Ok(Self {
            config,
            page,
            store,
            hooks,
            markup: MarkupFilter::new()?,
        })
    }

    /// Build a page with built-in types only and no hooks.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup patterns fail to compile.
    pub fn with_store(config: PageConfig, store: Arc<dyn OptionStore>) -> SettingsResult<Self> {
        Self::new(config, store, &FieldRegistry::new(), Arc::new(NoHooks))
    }

    /// Configuration in effect, after the `config` hook.
    #[must_use]
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Identifier of the stored record.
    #[must_use]
    pub fn option_id(&self) -> &str {
        &self.config.option_id
    }

    /// Flattened field table.
    #[must_use]
    pub fn fields(&self) -> &FieldTable {
        &self.page.fields
    }

    /// Sections in tab order.
    #[must_use]
    pub fn sections(&self) -> &IndexMap<String, Section> {
        &self.page.sections
    }

    /// Effective value of `field_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    pub fn get(&self, field_id: &str) -> SettingsResult<String> {
        let record = self.load("settings.get")?;
        Ok(self.resolver(record.as_ref()).resolve(field_id))
    }

    /// Markup for one field, or the empty string for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    pub fn render_field(&self, field_id: &str) -> SettingsResult<String> {
        let Some(field) = self.page.fields.get(field_id) else {
            return Ok(String::new());
        };
        let record = self.load("settings.render_field")?;
        let value = self.resolver(record.as_ref()).resolve(field_id);
        Ok(self.renderer().render(field, &value))
    }

    /// Page body with tabs, descriptions and every field row.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    pub fn render_page(&self, options: &PageOptions) -> SettingsResult<String> {
        let record = self.load("settings.render_page")?;
        let layout = PageLayout::new(
            &self.config,
            &self.page,
            self.renderer(),
            self.resolver(record.as_ref()),
            &self.markup,
        );
        Ok(layout.render(options))
    }

    /// Complete HTML document for the page, linking `assets` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    pub fn render_document(
        &self,
        options: &PageOptions,
        assets: Option<&PageAssets>,
    ) -> SettingsResult<String> {
        let body = self.render_page(options)?;
        Ok(render_document(&self.config.page_title, &body, assets))
    }

    /// Submission record from form-encoded pairs named `option_id[field_id]`.
    #[must_use]
    pub fn submission<I, K, V>(&self, pairs: I) -> Record
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        collect_submission(&self.config.option_id, pairs)
    }

    /// Sanitized copy of `submitted`, without storing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the current record cannot be read.
    pub fn sanitize(&self, submitted: &Record) -> SettingsResult<Record> {
        let record = self.load("settings.sanitize")?;
        Ok(self.sanitize_against(record.as_ref(), submitted))
    }

    /// Sanitize `submitted`, store it as the new record and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or written.
    pub fn save(&self, submitted: &Record) -> SettingsResult<Record> {
        let current = self.load("settings.save")?;
        let cleaned = self.sanitize_against(current.as_ref(), submitted);
        self.store
            .set(&self.config.option_id, &cleaned)
            .map_err(|source| SettingsError::Store {
                operation: "settings.save",
                option_id: self.config.option_id.clone(),
                source,
            })?;
        info!(
            option_id = %self.config.option_id,
            keys = cleaned.len(),
            "settings saved"
        );
        self.hooks.after_save(&cleaned);
        Ok(cleaned)
    }

    /// Store `value` under `field_id`, keeping every other stored key.
    ///
    /// The value is written as given, without sanitization.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or written.
    pub fn update(&self, field_id: &str, value: impl Into<String>) -> SettingsResult<()> {
        let mut record = self.load("settings.update")?.unwrap_or_default();
        record.insert(field_id.to_string(), value.into());
        self.store
            .set(&self.config.option_id, &record)
            .map_err(|source| SettingsError::Store {
                operation: "settings.update",
                option_id: self.config.option_id.clone(),
                source,
            })?;
        debug!(option_id = %self.config.option_id, field_id, "setting updated");
        Ok(())
    }

    /// Whether `path` shows this page, given the route the page is mounted on.
    #[must_use]
    pub fn is_settings_page(&self, path: &str, settings_path: &str) -> bool {
        let matched = path.trim_end_matches('/') == settings_path.trim_end_matches('/');
        self.hooks.is_settings_page(path, matched)
    }

    fn load(&self, operation: &'static str) -> SettingsResult<Option<Record>> {
        self.store
            .get(&self.config.option_id)
            .map_err(|source| SettingsError::Store {
                operation,
                option_id: self.config.option_id.clone(),
                source,
            })
    }

    fn resolver<'a>(&'a self, record: Option<&'a Record>) -> ValueResolver<'a> {
        ValueResolver::new(&self.page.fields, record, self.hooks.as_ref())
    }

    fn renderer(&self) -> FieldRenderer<'_> {
        FieldRenderer::new(
            &self.config.option_id,
            &self.config.class_prefix,
            &self.markup,
            self.hooks.as_ref(),
        )
    }

    fn sanitize_against(&self, current: Option<&Record>, submitted: &Record) -> Record {
        let options = SanitizeOptions {
            number_fallback: self.config.number_fallback,
            unslash: self.config.unslash,
        };
        Sanitizer::new(
            &self.page.fields,
            self.resolver(current),
            &self.markup,
            self.hooks.as_ref(),
            options,
        )
        .sanitize(submitted)
    }
}

impl std::fmt::Debug for SettingsPage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SettingsPage")
            .field("option_id", &self.config.option_id)
            .field("sections", &self.page.sections.len())
            .field("fields", &self.page.fields.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::MemoryStore;
    use std::sync::Mutex;
    use tabform_config::{BuiltinKind, FieldDefinition, SectionConfig};

    fn config() -> PageConfig {
        PageConfig::new("demo").with_section(
            "general",
            SectionConfig::titled("General")
                .with_field(
                    "site_name",
                    FieldDefinition::of_kind(BuiltinKind::Text).with_default("My Site"),
                )
                .with_field("newsletter", FieldDefinition::of_kind(BuiltinKind::Checkbox)),
        )
    }

    #[test]
    fn get_falls_back_to_default_until_saved() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let page = SettingsPage::with_store(config(), store.clone())?;
        assert_eq!(page.get("site_name")?, "My Site");

        let saved = page.save(&page.submission([("demo[site_name]", " Acme ")]))?;
        assert_eq!(saved.get("site_name").map(String::as_str), Some("Acme"));
        assert_eq!(page.get("site_name")?, "Acme");
        assert_eq!(store.get("demo")?, Some(saved));
        Ok(())
    }

    #[test]
    fn update_writes_a_single_key() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let page = SettingsPage::with_store(config(), store.clone())?;
        page.save(&page.submission([("demo[site_name]", "Acme"), ("demo[newsletter]", "1")]))?;
        page.update("newsletter", "")?;

        let stored = store.get("demo")?.unwrap_or_default();
        assert_eq!(stored.get("site_name").map(String::as_str), Some("Acme"));
        assert_eq!(stored.get("newsletter").map(String::as_str), Some(""));
        Ok(())
    }

    #[test]
    fn render_field_handles_unknown_ids() -> anyhow::Result<()> {
        let page = SettingsPage::with_store(config(), Arc::new(MemoryStore::new()))?;
        assert_eq!(page.render_field("missing")?, "");
        assert!(page.render_field("site_name")?.contains("value=\"My Site\""));
        Ok(())
    }

    #[derive(Default)]
    struct Recorder {
        saved: Mutex<Vec<Record>>,
    }

    impl SettingsHooks for Recorder {
        fn config(&self, mut config: PageConfig) -> PageConfig {
            config.class_prefix = "acme".into();
            config
        }

        fn after_save(&self, record: &Record) {
            if let Ok(mut saved) = self.saved.lock() {
                saved.push(record.clone());
            }
        }

        fn is_settings_page(&self, path: &str, matched: bool) -> bool {
            matched || path == "/legacy-settings"
        }
    }

    #[test]
    fn hooks_shape_config_and_observe_saves() -> anyhow::Result<()> {
        let hooks = Arc::new(Recorder::default());
        let page = SettingsPage::new(
            config(),
            Arc::new(MemoryStore::new()),
            &FieldRegistry::new(),
            hooks.clone(),
        )?;
        assert!(page.render_field("site_name")?.contains("acme-field acme-text"));

        page.save(&page.submission([("demo[newsletter]", "yes")]))?;
        let saved = hooks.saved.lock().map(|saved| saved.clone()).unwrap_or_default();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].get("newsletter").map(String::as_str), Some("1"));

        assert!(page.is_settings_page("/settings/", "/settings"));
        assert!(page.is_settings_page("/legacy-settings", "/settings"));
        assert!(!page.is_settings_page("/health", "/settings"));
        Ok(())
    }

    struct BrokenStore;

    impl OptionStore for BrokenStore {
        fn get(&self, _option_id: &str) -> StoreResult<Option<Record>> {
            Err(StoreError::Poisoned { operation: "broken.get" })
        }

        fn set(&self, _option_id: &str, _record: &Record) -> StoreResult<()> {
            Err(StoreError::Poisoned { operation: "broken.set" })
        }
    }

    #[test]
    fn store_failures_carry_operation_context() -> anyhow::Result<()> {
        let page = SettingsPage::with_store(config(), Arc::new(BrokenStore))?;
        let err = page.get("site_name").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Store {
                operation: "settings.get",
                ..
            }
        ));
        Ok(())
    }
}
