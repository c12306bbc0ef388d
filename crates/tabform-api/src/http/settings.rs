//! Settings page handlers.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State, rejection::FormRejection},
    http::Uri,
    response::{Html, Redirect},
};
use serde::Deserialize;
use tabform_core::{PageAssets, PageOptions, SettingsError};
use tracing::{error, info};

use crate::http::constants::{
    QUERY_TOKEN, SCRIPT_PATH, SETTINGS_PATH, SETTINGS_SAVED_LOCATION, STYLESHEET_PATH,
};
use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsQuery {
    #[serde(rename = "settings-updated")]
    pub(crate) settings_updated: Option<String>,
    pub(crate) section: Option<String>,
    pub(crate) token: Option<String>,
}

impl SettingsQuery {
    /// Query token to forward to follow-up requests; only set when the page is gated.
    fn forwarded_token<'q>(&'q self, state: &ApiState) -> Option<&'q str> {
        self.token
            .as_deref()
            .filter(|token| state.requires_token() && !token.is_empty())
    }
}

pub(crate) async fn show_settings(
    State(state): State<Arc<ApiState>>,
    uri: Uri,
    Query(query): Query<SettingsQuery>,
) -> Result<Html<String>, ApiError> {
    let options = PageOptions {
        action: carry_token(SETTINGS_PATH, query.forwarded_token(&state)),
        fragment: query.section,
        saved: query.settings_updated.as_deref() == Some("true"),
    };
    let assets = state
        .page
        .is_settings_page(uri.path(), SETTINGS_PATH)
        .then(|| PageAssets {
            stylesheet: STYLESHEET_PATH.to_string(),
            script: SCRIPT_PATH.to_string(),
        });
    let document = state
        .page
        .render_document(&options, assets.as_ref())
        .map_err(|err| settings_failure(&err, "failed to load settings"))?;
    Ok(Html(document))
}

pub(crate) async fn save_settings(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SettingsQuery>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let Form(pairs) =
        form.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let submission = state.page.submission(pairs);
    let saved = state
        .page
        .save(&submission)
        .map_err(|err| settings_failure(&err, "failed to save settings"))?;
    info!(
        option_id = %state.page.option_id(),
        keys = saved.len(),
        "settings submission stored"
    );
    Ok(Redirect::to(&carry_token(
        SETTINGS_SAVED_LOCATION,
        query.forwarded_token(&state),
    )))
}

/// Append the admin token to `target` so browser sessions stay authorized across the
/// form post and the redirect that follows it.
fn carry_token(target: &str, token: Option<&str>) -> String {
    let Some(token) = token else {
        return target.to_string();
    };
    let separator = if target.contains('?') { '&' } else { '?' };
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!("{target}{separator}{QUERY_TOKEN}={encoded}")
}

fn settings_failure(err: &SettingsError, message: &'static str) -> ApiError {
    error!(error = %err, source = ?std::error::Error::source(err), "{message}");
    ApiError::internal(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_token_appends_encoded_query_pair() {
        assert_eq!(carry_token(SETTINGS_PATH, None), "/settings");
        assert_eq!(
            carry_token(SETTINGS_PATH, Some("s3cret")),
            "/settings?token=s3cret"
        );
        assert_eq!(
            carry_token(SETTINGS_SAVED_LOCATION, Some("a&b=c d")),
            "/settings?settings-updated=true&token=a%26b%3Dc+d"
        );
    }
}
