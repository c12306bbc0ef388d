//! HTTP surface modules (router, handlers, middleware).

/// Static asset handlers.
pub mod assets;
/// Admin token middleware.
pub mod auth;
/// Shared constants and header names.
pub mod constants;
/// Problem response helpers and error types.
pub mod errors;
/// Liveness endpoint.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Settings page handlers.
pub mod settings;
