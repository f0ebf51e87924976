// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigMap reconciler - watches ConfigMaps plus namespaces and drives the
//! sync engine.

use crate::constants::ERROR_REQUEUE_SECS;
use crate::error::{CourierError, Result};
use crate::metrics;
use crate::reconcilers::namespace_event_sources;
use crate::sync::engine;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct ConfigMapReconciler {
    client: Client,
}

impl ConfigMapReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let configmaps: Api<ConfigMap> = Api::all(self.client.clone());
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let controller = Controller::new(configmaps, watcher::Config::default());
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
                    Ok(o) => debug!("Reconciled configmap: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(configmap: Arc<ConfigMap>, ctx: Arc<ConfigMapReconciler>) -> Result<Action> {
    let name = configmap.name_any();
    let namespace = configmap.namespace().unwrap_or_default();

    debug!("Reconciling configmap: {}/{}", namespace, name);
    metrics::inc_reconciliations();

    engine::reconcile::<ConfigMap>(&ctx.client, &name, &namespace).await?;
    Ok(Action::await_change())
}

fn error_policy(
    configmap: Arc<ConfigMap>,
    error: &CourierError,
    _ctx: Arc<ConfigMapReconciler>,
) -> Action {
    error!(
        "Reconciliation error for configmap {}/{}: {}",
        configmap.namespace().unwrap_or_default(),
        configmap.name_any(),
        error
    );
    metrics::inc_reconciliation_errors();
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}
