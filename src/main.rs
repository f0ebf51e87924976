// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use kube::Client;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use courier::config::Options;
use courier::constants::OPERATOR_NAME;
use courier::kubernetes::LeaderElector;
use courier::metrics;
use courier::reconcilers::{ConfigMapReconciler, SecretReconciler};
use courier::server::{serve_metrics, serve_probes, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "courier=info".into()),
        )
        .init();

    let options = Options::parse();
    info!("Starting Courier operator");

    // Register metrics and start the metrics/probe endpoints
    metrics::register_metrics()?;
    let server_state = ServerState::new();
    tokio::spawn({
        let addr = options.metrics_bind_address.clone();
        async move {
            if let Err(e) = serve_metrics(addr).await {
                error!("Metrics server error: {}", e);
            }
        }
    });
    tokio::spawn({
        let addr = options.health_probe_bind_address.clone();
        let state = server_state.clone();
        async move {
            if let Err(e) = serve_probes(addr, state).await {
                error!("Health probe server error: {}", e);
            }
        }
    });

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Hold the leader lease before reconciling; losing it later is fatal
    if options.leader_elect {
        let elector = LeaderElector::new(client.clone(), lease_namespace(), identity());
        elector.acquire().await?;
        tokio::spawn(async move {
            if let Err(e) = elector.renew_forever().await {
                error!("Leader election lost: {}", e);
                std::process::exit(1);
            }
        });
    }

    // Create reconcilers for both managed kinds
    let configmap_reconciler = ConfigMapReconciler::new(client.clone());
    let secret_reconciler = SecretReconciler::new(client);

    info!("Starting reconcilers...");
    server_state.set_ready(true);

    // Run both reconcilers concurrently until shutdown
    tokio::try_join!(configmap_reconciler.run(), secret_reconciler.run())?;

    warn!("All reconcilers stopped");
    Ok(())
}

/// Namespace holding the leader election lease; the pod's own namespace
/// when running in-cluster.
fn lease_namespace() -> String {
    std::env::var("POD_NAMESPACE").unwrap_or_else(|_| "default".to_string())
}

/// Identity recorded in the lease, unique per replica
fn identity() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| OPERATOR_NAME.to_string());
    format!("{}_{}", host, std::process::id())
}
