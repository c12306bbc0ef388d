//! Static assets for the settings page.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;

const SCRIPT: &str = include_str!("../../assets/tabform.js");
const STYLESHEET: &str = include_str!("../../assets/tabform.css");
const CACHE_POLICY: &str = "public, max-age=3600";

pub(crate) async fn script() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (CACHE_CONTROL, CACHE_POLICY),
        ],
        SCRIPT,
    )
}

pub(crate) async fn stylesheet() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/css; charset=utf-8"),
            (CACHE_CONTROL, CACHE_POLICY),
        ],
        STYLESHEET,
    )
}
