//! Router construction and server host for the settings page.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    middleware,
    routing::get,
};
use tabform_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::assets::{script, stylesheet};
use crate::http::auth::require_admin_token;
use crate::http::constants::{HEADER_REQUEST_ID, SCRIPT_PATH, SETTINGS_PATH, STYLESHEET_PATH};
use crate::http::health::health;
use crate::http::settings::{save_settings, show_settings};
use crate::state::ApiState;

/// Axum router wrapper that hosts one settings page.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a server around shared state.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let state = Arc::new(state);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(tabform_telemetry::propagate_request_id_layer())
            .layer(tabform_telemetry::set_request_id_layer())
            .layer(trace_layer);

        let router = Self::public_routes()
            .merge(Self::settings_routes(&state))
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route(SCRIPT_PATH, get(script))
            .route(STYLESHEET_PATH, get(stylesheet))
    }

    fn settings_routes(state: &Arc<ApiState>) -> Router<Arc<ApiState>> {
        let require_token = middleware::from_fn_with_state(state.clone(), require_admin_token);
        Router::new().route(
            SETTINGS_PATH,
            get(show_settings)
                .post(save_settings)
                .route_layer(require_token),
        )
    }

    /// Router with every route and layer applied.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "serving settings page");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
