//! gitfooter web host.
//!
//! Serves a built site from disk and runs every HTML response through the
//! footer transform before it leaves the server. Also exposes:
//! - `GET /api/health`
//! - `GET /api/provenance` with the current provenance summary

pub mod api;
pub mod decorate;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use gitfooter_core::config::ServerConfig;
use gitfooter_core::FooterInjector;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub injector: Arc<FooterInjector>,
}

/// The web server.
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ServerConfig, injector: Arc<FooterInjector>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { injector }),
        }
    }

    /// Router serving the site directory through the footer middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(api::routes())
            .fallback_service(ServeDir::new(&self.config.site_dir))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                decorate::decorate_html,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server on the configured listen address.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.listen.parse()?;
        let app = self.router();

        info!(
            addr = %addr,
            site_dir = %self.config.site_dir.display(),
            "starting web server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
