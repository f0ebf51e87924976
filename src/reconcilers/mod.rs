// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod configmap;
pub mod secret;

pub use configmap::ConfigMapReconciler;
pub use secret::SecretReconciler;

use crate::kubernetes::namespaces;
use crate::sync::object::{classify, Classification, Propagate};
use k8s_openapi::api::core::v1::Namespace;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::sync::Arc;

/// Map a namespace event to the sources whose fan-out it may affect:
/// every known source whose selector the namespace's current labels
/// satisfy. Terminating or half-deleted namespaces trigger nothing.
pub(crate) fn namespace_event_sources<K: Propagate>(
    objects: Vec<Arc<K>>,
    namespace: &Namespace,
) -> Vec<ObjectRef<K>> {
    if namespaces::is_terminating(namespace) {
        return Vec::new();
    }
    let namespace_labels = namespace.labels();
    objects
        .iter()
        .filter_map(|obj| match classify(obj.as_ref()) {
            Classification::Source(selector) if selector.matches(namespace_labels) => {
                Some(ObjectRef::from_obj(obj.as_ref()))
            }
            _ => None,
        })
        .collect()
}
