//! Shared HTTP constants (routes, headers, problem URIs).

pub(crate) const SETTINGS_PATH: &str = "/settings";
pub(crate) const SETTINGS_SAVED_LOCATION: &str = "/settings?settings-updated=true";
pub(crate) const SCRIPT_PATH: &str = "/assets/tabform.js";
pub(crate) const STYLESHEET_PATH: &str = "/assets/tabform.css";

pub(crate) const HEADER_ADMIN_TOKEN: &str = "x-tabform-admin-token";
pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const QUERY_TOKEN: &str = "token";

pub(crate) const PROBLEM_INTERNAL: &str = "https://tabform.dev/problems/internal";
pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://tabform.dev/problems/unauthorized";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://tabform.dev/problems/bad-request";
