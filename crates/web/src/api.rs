//! Health and provenance endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use gitfooter_core::models::ProvenanceSummary;

use crate::AppState;

/// API error type.
#[derive(Debug)]
pub enum AppError {
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvenanceQuery {
    /// Run the cache check (and a crawl if stale) before answering.
    #[serde(default)]
    pub refresh: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/provenance", get(get_provenance))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The working summary as of the last render, or freshly resolved with
/// `?refresh=true`.
async fn get_provenance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProvenanceQuery>,
) -> Result<Json<ProvenanceSummary>, AppError> {
    let injector = state.injector.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let mut resolver = injector.resolver();
        if query.refresh {
            resolver.refresh();
            resolver.persist_or_warn();
        }
        resolver.summary().clone()
    })
    .await
    .map_err(|e| AppError::Internal(format!("provenance task failed: {e}")))?;

    Ok(Json(summary))
}
