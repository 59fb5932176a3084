//! Response middleware applying the footer transform.

use std::sync::Arc;

use axum::body::{to_bytes, Body, HttpBody};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::AppState;

/// Largest page body the middleware will buffer.
const MAX_PAGE_BYTES: usize = 16 * 1024 * 1024;

/// Declared body length, from `Content-Length` or the body's own size hint.
fn declared_len(headers: &HeaderMap, body: &Body) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| body.size_hint().exact())
}

/// Rewrite HTML responses; everything else passes through untouched.
///
/// Status and headers are kept, except `Content-Length`, which no longer
/// matches once the body changes. A page that fails to rewrite is served as
/// it was. `HEAD` responses and pages larger than [`MAX_PAGE_BYTES`] are
/// never buffered.
pub async fn decorate_html(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let is_head = request.method() == Method::HEAD;
    let response = next.run(request).await;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if is_head || !state.injector.should_apply(&path, content_type) {
        return response;
    }
    if let Some(len) = declared_len(response.headers(), response.body()) {
        if len > MAX_PAGE_BYTES as u64 {
            debug!(path = %path, len, "page too large to rewrite, serving unmodified");
            return response;
        }
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_PAGE_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // The body is gone; keep the status and headers rather than
            // inventing an error response.
            warn!(path = %path, error = %e, "failed to buffer page body");
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let html = match std::str::from_utf8(&bytes) {
        Ok(html) => html.to_owned(),
        Err(_) => {
            debug!(path = %path, "page body is not UTF-8, serving unmodified");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    // A crawl can take a while; keep it off the async workers.
    let injector = state.injector.clone();
    let task_path = path.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        injector
            .apply(&task_path, &html)
            .map_err(|e| warn!(path = %task_path, error = %e, "footer rewrite failed"))
            .ok()
    })
    .await;

    match rendered {
        Ok(Some(out)) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(out))
        }
        Ok(None) => Response::from_parts(parts, Body::from(bytes)),
        Err(e) => {
            warn!(path = %path, error = %e, "footer task panicked, serving unmodified");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
