// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - watches Secrets plus namespaces and drives the sync
//! engine.

use crate::constants::ERROR_REQUEUE_SECS;
use crate::error::{CourierError, Result};
use crate::metrics;
use crate::reconcilers::namespace_event_sources;
use crate::sync::engine;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct SecretReconciler {
    client: Client,
}

impl SecretReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let controller = Controller::new(secrets, watcher::Config::default());
        let store = controller.store();
        let context = Arc::new(self);

        controller
            .watches(namespaces, watcher::Config::default(), move |ns: Namespace| {
                namespace_event_sources(store.state(), &ns)
            })
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<SecretReconciler>) -> Result<Action> {
    let name = secret.name_any();
    let namespace = secret.namespace().unwrap_or_default();

    debug!("Reconciling secret: {}/{}", namespace, name);
    metrics::inc_reconciliations();

    engine::reconcile::<Secret>(&ctx.client, &name, &namespace).await?;
    Ok(Action::await_change())
}

fn error_policy(
    secret: Arc<Secret>,
    error: &CourierError,
    _ctx: Arc<SecretReconciler>,
) -> Action {
    error!(
        "Reconciliation error for secret {}/{}: {}",
        secret.namespace().unwrap_or_default(),
        secret.name_any(),
        error
    );
    metrics::inc_reconciliation_errors();
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}
