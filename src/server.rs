// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP endpoints for metrics and Kubernetes probes.
//!
//! The metrics address serves `/metrics` (Prometheus text format); the
//! health-probe address serves `/healthz` (liveness, always 200) and
//! `/readyz` (readiness, 200 once the reconcilers are running).

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Default)]
pub struct ServerState {
    is_ready: AtomicBool,
}

impl ServerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::Relaxed);
    }
}

pub async fn serve_metrics(addr: String) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to bind metrics address {}", addr))?;
    info!("Metrics endpoint listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn serve_probes(addr: String, state: Arc<ServerState>) -> Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to bind health probe address {}", addr))?;
    info!("Health probes listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = crate::metrics::REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {}", e).into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
