// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The kind-agnostic reconcile engine.
//!
//! One entry point, [`reconcile`], drives a single (kind, name, namespace)
//! event to convergence: sources fan out into selected namespaces, deleted
//! sources and orphaned sources retract their copies, user-deleted copies
//! are regenerated, and objects in terminating namespaces are released so
//! the namespace can finish going away. Every step re-reads state and is
//! safe to replay.

use crate::constants::labels;
use crate::error::{CourierError, Result};
use crate::kubernetes::namespaces;
use crate::metrics;
use crate::sync::object::{
    add_finalizer_token, classify, clear_origin_label, has_sync_finalizer,
    remove_finalizer_token, Classification, Propagate,
};
use crate::sync::selector::Selector;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info, warn};

pub async fn reconcile<K: Propagate>(client: &Client, name: &str, namespace: &str) -> Result<()> {
    if name.is_empty() && namespace.is_empty() {
        return Ok(());
    }
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let Some(obj) = api.get_opt(name).await? else {
        debug!("{} {}/{} is gone, nothing to do", K::KIND, namespace, name);
        return Ok(());
    };

    let classification = classify(&obj);

    if has_sync_finalizer(&obj) {
        if obj.meta().deletion_timestamp.is_some() {
            return match classification {
                Classification::Source(_) | Classification::OrphanSource => {
                    info!(
                        "{} {}/{} marked for deletion, retracting copies",
                        K::KIND,
                        namespace,
                        name
                    );
                    retract(client, &api, obj).await
                }
                _ => {
                    if namespaces::terminating_or_absent(client, namespace).await? {
                        info!(
                            "namespace {} is being torn down, releasing {} {}",
                            namespace,
                            K::KIND,
                            name
                        );
                        release(&api, obj).await
                    } else {
                        info!(
                            "copy {} {}/{} deleted by user, regenerating",
                            K::KIND,
                            namespace,
                            name
                        );
                        regenerate(client, &api, obj).await
                    }
                }
            };
        }

        return match classification {
            // copies are driven by reconciles of their source
            Classification::Copy { .. } => Ok(()),
            Classification::OrphanSource => {
                info!(
                    "sync annotation removed from {} {}/{}, retracting copies",
                    K::KIND,
                    namespace,
                    name
                );
                retract(client, &api, obj).await
            }
            Classification::Source(selector) => fan_out(client, &obj, &selector).await,
            Classification::Unmanaged => Ok(()),
        };
    }

    if let Classification::Source(selector) = classification {
        if obj.meta().deletion_timestamp.is_some() {
            // already on its way out and not ours to block
            return Ok(());
        }
        info!("new source {} {}/{}", K::KIND, namespace, name);
        let obj = persist_finalizer(&api, obj).await?;
        return fan_out(client, &obj, &selector).await;
    }

    Ok(())
}

/// Copy the source into every active namespace its selector targets.
/// Per-target failures are collected so one bad namespace does not stall
/// the rest; any failure retries the whole reconcile.
async fn fan_out<K: Propagate>(client: &Client, source: &K, selector: &Selector) -> Result<()> {
    let source_name = source.name_any();
    let source_namespace = source.namespace().unwrap_or_default();
    let targets = namespaces::list_selected(client, selector).await?;

    let mut failures = Vec::new();
    for ns in &targets {
        let target = ns.name_any();
        // a copy never lives in its source's namespace
        if target == source_namespace {
            continue;
        }
        match upsert_copy(client, source, &target).await {
            Ok(()) => {
                metrics::inc_copies_synced();
                info!(
                    "synced {} {}/{} to namespace {}",
                    K::KIND,
                    source_namespace,
                    source_name,
                    target
                );
            }
            Err(e @ CourierError::OwnershipConflict { .. }) => {
                metrics::inc_ownership_conflicts();
                warn!(
                    "refusing to overwrite {} {}/{}: {}",
                    K::KIND,
                    target,
                    source_name,
                    e
                );
                failures.push(format!("{}: {}", target, e));
            }
            Err(e) => {
                warn!(
                    "unable to sync {} {}/{} to namespace {}: {}",
                    K::KIND,
                    source_namespace,
                    source_name,
                    target,
                    e
                );
                failures.push(format!("{}: {}", target, e));
            }
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CourierError::PartialFanout(failures.join("; ")))
    }
}

/// Create the copy in the target namespace, or update it in place when it
/// already exists and is ours (or unowned). A copy owned by a different
/// source namespace is refused.
async fn upsert_copy<K: Propagate>(client: &Client, source: &K, target_namespace: &str) -> Result<()> {
    let name = source.name_any();
    let targets: Api<K> = Api::namespaced(client.clone(), target_namespace);
    let copy = source.duplicate(target_namespace);

    match targets.get_opt(&name).await? {
        None => match targets.create(&PostParams::default(), &copy).await {
            Ok(_) => Ok(()),
            // lost a create race; fetch the winner and update in place
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                match targets.get_opt(&name).await? {
                    Some(existing) => replace_existing(&targets, source, copy, &existing).await,
                    None => Ok(()),
                }
            }
            Err(e) => Err(e.into()),
        },
        Some(existing) => replace_existing(&targets, source, copy, &existing).await,
    }
}

/// Overwrite an existing object with the copy, keeping the stored identity.
/// Refused when the object is a copy of a source in another namespace.
async fn replace_existing<K: Propagate>(
    api: &Api<K>,
    source: &K,
    mut copy: K,
    existing: &K,
) -> Result<()> {
    let source_namespace = source.namespace().unwrap_or_default();
    if let Some(origin) = existing.labels().get(labels::ORIGIN_NAMESPACE) {
        if *origin != source_namespace {
            return Err(CourierError::OwnershipConflict {
                kind: K::KIND,
                name: existing.name_any(),
                namespace: existing.namespace().unwrap_or_default(),
                origin: origin.clone(),
            });
        }
    }
    // carry identity and resource version so the update replaces the stored
    // object instead of racing it
    copy.meta_mut().uid = existing.meta().uid.clone();
    copy.meta_mut().resource_version = existing.meta().resource_version.clone();
    api.replace(&existing.name_any(), &PostParams::default(), &copy)
        .await?;
    Ok(())
}

/// Retract a deleted or orphaned source: release every copy first, then the
/// source itself. The source's finalizer is only dropped once no copy still
/// holds one, so a partial failure keeps everything retryable.
async fn retract<K: Propagate>(client: &Client, api: &Api<K>, obj: K) -> Result<()> {
    let copies = list_copies(client, &obj).await?;

    let mut failures = Vec::new();
    for mut copy in copies {
        if !has_sync_finalizer(&copy) {
            continue;
        }
        let copy_name = copy.name_any();
        let copy_namespace = copy.namespace().unwrap_or_default();
        remove_finalizer_token(&mut copy);
        clear_origin_label(&mut copy);
        debug!("releasing copy {} {}/{}", K::KIND, copy_namespace, copy_name);
        let copy_api: Api<K> = Api::namespaced(client.clone(), &copy_namespace);
        if let Err(e) = copy_api
            .replace(&copy_name, &PostParams::default(), &copy)
            .await
        {
            warn!(
                "unable to release copy {} {}/{}: {}",
                K::KIND,
                copy_namespace,
                copy_name,
                e
            );
            failures.push(format!("{}/{}: {}", copy_namespace, copy_name, e));
        }
    }
    if !failures.is_empty() {
        return Err(CourierError::PartialFanout(failures.join("; ")));
    }
    release(api, obj).await
}

/// A user deleted a copy out from under us. Let the deletion proceed, then
/// rebuild the copy if its source still exists and still selects the
/// namespace.
async fn regenerate<K: Propagate>(client: &Client, api: &Api<K>, obj: K) -> Result<()> {
    let name = obj.name_any();
    let copy_namespace = obj.namespace().unwrap_or_default();
    let origin = obj.labels().get(labels::ORIGIN_NAMESPACE).cloned();

    release(api, obj).await?;

    let Some(origin_namespace) = origin else {
        return Ok(());
    };
    let sources: Api<K> = Api::namespaced(client.clone(), &origin_namespace);
    let Some(source) = sources.get_opt(&name).await? else {
        debug!(
            "source {} {}/{} is gone, not regenerating",
            K::KIND,
            origin_namespace,
            name
        );
        return Ok(());
    };
    let Classification::Source(selector) = classify(&source) else {
        return Ok(());
    };

    let all_namespaces: Api<Namespace> = Api::all(client.clone());
    let Some(ns) = all_namespaces.get_opt(&copy_namespace).await? else {
        return Ok(());
    };
    if namespaces::is_terminating(&ns) {
        return Ok(());
    }
    if selector.matches(ns.labels()) {
        upsert_copy(client, &source, &copy_namespace).await?;
        info!(
            "regenerated copy {} {}/{} from {}/{}",
            K::KIND,
            copy_namespace,
            name,
            origin_namespace,
            name
        );
    } else {
        debug!(
            "namespace {} no longer selected by {}/{}, copy stays deleted",
            copy_namespace,
            origin_namespace,
            name
        );
    }
    Ok(())
}

/// All copies of the source: same name, origin-namespace label pointing at
/// the source's namespace.
async fn list_copies<K: Propagate>(client: &Client, source: &K) -> Result<Vec<K>> {
    let source_name = source.name_any();
    let source_namespace = source.namespace().unwrap_or_default();
    let all: Api<K> = Api::all(client.clone());
    let lp = ListParams::default().labels(&format!(
        "{}={}",
        labels::ORIGIN_NAMESPACE,
        source_namespace
    ));
    let list = all.list(&lp).await?;
    Ok(list
        .items
        .into_iter()
        .filter(|copy| copy.name_any() == source_name)
        .collect())
}

/// Persist the sync finalizer on a source; idempotent
async fn persist_finalizer<K: Propagate>(api: &Api<K>, mut obj: K) -> Result<K> {
    let name = obj.name_any();
    add_finalizer_token(&mut obj);
    let updated = api.replace(&name, &PostParams::default(), &obj).await?;
    Ok(updated)
}

/// Drop the sync finalizer from the object itself
async fn release<K: Propagate>(api: &Api<K>, mut obj: K) -> Result<()> {
    let name = obj.name_any();
    remove_finalizer_token(&mut obj);
    api.replace(&name, &PostParams::default(), &obj).await?;
    Ok(())
}
