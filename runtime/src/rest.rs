// Copyright 2026 SiteDigest Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP front of the crawler service.
//!
//! `POST /crawl` takes `{url, max_pages?}` and answers with the
//! [`CrawlResponse`] wire shape. The shared secret travels in the
//! `x-crawler-token` header or as a bearer token.

use crate::crawl::client::TOKEN_HEADER;
use crate::crawl::{CrawlRequest, CrawlResponse, CrawlService};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

/// State shared by all handlers.
pub struct ServiceState {
    pub service: CrawlService,
    pub started_at: Instant,
}

impl ServiceState {
    pub fn new(service: CrawlService) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum Router.
pub fn router(state: Arc<ServiceState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/crawl", post(handle_crawl))
        .layer(cors)
        .with_state(state)
}

/// Serve the crawler endpoint on `host:port` until the process exits.
pub async fn start(host: &str, port: u16, state: Arc<ServiceState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("crawler service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

/// Token from `x-crawler-token`, falling back to `Authorization: Bearer`.
fn supplied_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(v) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(v.trim());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn status_for(response: &CrawlResponse) -> StatusCode {
    if response.success {
        return StatusCode::OK;
    }
    match response.code.as_deref() {
        Some("E_UNAUTHORIZED") => StatusCode::UNAUTHORIZED,
        Some("E_CRAWL") | Some("E_UPSTREAM") | Some("E_RENDER") => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServiceState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn handle_crawl(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(request): Json<CrawlRequest>,
) -> (StatusCode, Json<CrawlResponse>) {
    let response = state
        .service
        .crawl(&request, supplied_token(&headers))
        .await;
    (status_for(&response), Json(response))
}
