//! Shared state handed to every handler.

use std::sync::Arc;

use tabform_core::SettingsPage;

/// Settings page and access policy shared across requests.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub(crate) page: Arc<SettingsPage>,
    pub(crate) admin_token: Option<String>,
}

impl ApiState {
    /// Serve `page`, requiring `admin_token` on the settings routes when it is set.
    #[must_use]
    pub fn new(page: Arc<SettingsPage>, admin_token: Option<String>) -> Self {
        let admin_token = admin_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self { page, admin_token }
    }

    /// Settings page being served.
    #[must_use]
    pub fn page(&self) -> &SettingsPage {
        &self.page
    }

    /// Whether the settings routes require a token.
    #[must_use]
    pub const fn requires_token(&self) -> bool {
        self.admin_token.is_some()
    }
}
