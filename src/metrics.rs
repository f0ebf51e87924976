// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for the controller.
//!
//! - `courier_reconciliations_total` - reconcile invocations per kind path
//! - `courier_reconciliation_errors_total` - failed reconciles
//! - `courier_copies_synced_total` - copies created or updated
//! - `courier_ownership_conflicts_total` - refused overwrites of foreign copies

use anyhow::Result;
use prometheus::{IntCounter, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("valid metric definition")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("valid metric definition")
});

static COPIES_SYNCED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_copies_synced_total",
        "Total number of copies created or updated in target namespaces",
    )
    .expect("valid metric definition")
});

static OWNERSHIP_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_ownership_conflicts_total",
        "Total number of refused overwrites of copies owned by another source",
    )
    .expect("valid metric definition")
});

/// Register all metrics with the process-wide registry. Called once at
/// startup, before the metrics endpoint is served.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COPIES_SYNCED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OWNERSHIP_CONFLICTS_TOTAL.clone()))?;
    Ok(())
}

pub fn inc_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn inc_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn inc_copies_synced() {
    COPIES_SYNCED_TOTAL.inc();
}

pub fn inc_ownership_conflicts() {
    OWNERSHIP_CONFLICTS_TOTAL.inc();
}
