//! HTTP surface: page viewer and mark-as-read endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::service::{MarkReadOutcome, MarkReadService};
use crate::store::{ContentStore, ViewOutcome, mask};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    store: ContentStore,
    mark_read: Arc<MarkReadService>,
}

impl AppState {
    /// Bundles the store and the mark-read service.
    #[must_use]
    pub const fn new(store: ContentStore, mark_read: Arc<MarkReadService>) -> Self {
        Self { store, mark_read }
    }
}

#[derive(Debug, Deserialize)]
struct AccessParams {
    id: Option<String>,
    token: Option<String>,
}

impl AccessParams {
    /// Both parameters, when present and non-empty.
    fn pair(&self) -> Option<(&str, &str)> {
        let id = self.id.as_deref().filter(|s| !s.is_empty())?;
        let token = self.token.as_deref().filter(|s| !s.is_empty())?;
        Some((id, token))
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/view", get(view))
        .route("/mark_read", get(mark_read).post(mark_read))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serves until `shutdown` fires.
///
/// # Errors
///
/// Returns the server's I/O error.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "http server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

async fn view(State(state): State<AppState>, Query(params): Query<AccessParams>) -> Response {
    let Some((id, token)) = params.pair() else {
        tracing::info!(reason = "missing_params", "view refused");
        return not_found().await.into_response();
    };

    let reason = match state.store.view(id, token) {
        ViewOutcome::Served(html) => {
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                html,
            )
                .into_response();
        }
        ViewOutcome::NotFound => "not_found",
        ViewOutcome::InvalidToken => "invalid_token",
        ViewOutcome::Expired => "expired",
    };
    tracing::info!(page_id = %mask(id), reason, "view refused");
    not_found().await.into_response()
}

async fn mark_read(
    State(state): State<AppState>,
    Query(params): Query<AccessParams>,
) -> (StatusCode, &'static str) {
    let Some((id, token)) = params.pair() else {
        tracing::info!(reason = "missing_params", "mark read refused");
        return not_found().await;
    };

    let outcome = state.mark_read.mark_read(id, token).await;
    tracing::debug!(page_id = %mask(id), outcome = outcome.as_str(), "mark read request");
    match outcome {
        MarkReadOutcome::Success => (StatusCode::OK, "Marked as read"),
        MarkReadOutcome::NotFound | MarkReadOutcome::NoMailId => not_found().await,
        MarkReadOutcome::UpstreamFailure => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to mark as read")
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "http request"
    );
    response
}
