// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The per-kind adapter trait and the classification shared by both kinds.

use crate::constants::{annotations, labels, SYNC_FINALIZER};
use crate::sync::selector::Selector;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Capability set a kind must provide to be propagated by the engine.
///
/// Everything else the engine needs (classification, finalizer and label
/// bookkeeping) is derived from object metadata and shared between kinds.
pub trait Propagate:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + DeserializeOwned
    + Serialize
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Kind name for log context
    const KIND: &'static str;

    /// Build a fresh copy of `self` for the target namespace: payload
    /// cloned, origin-namespace label and sync finalizer set, and no
    /// annotations so a copy can never be mistaken for a source.
    fn duplicate(&self, target_namespace: &str) -> Self;
}

impl Propagate for ConfigMap {
    const KIND: &'static str = "ConfigMap";

    fn duplicate(&self, target_namespace: &str) -> Self {
        ConfigMap {
            metadata: copy_metadata(self, target_namespace),
            data: self.data.clone(),
            binary_data: self.binary_data.clone(),
            ..Default::default()
        }
    }
}

impl Propagate for Secret {
    const KIND: &'static str = "Secret";

    fn duplicate(&self, target_namespace: &str) -> Self {
        Secret {
            metadata: copy_metadata(self, target_namespace),
            data: self.data.clone(),
            string_data: self.string_data.clone(),
            type_: self.type_.clone(),
            ..Default::default()
        }
    }
}

fn copy_metadata<K: Resource>(source: &K, target_namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: source.meta().name.clone(),
        namespace: Some(target_namespace.to_string()),
        labels: Some(BTreeMap::from([(
            labels::ORIGIN_NAMESPACE.to_string(),
            source.namespace().unwrap_or_default(),
        )])),
        finalizers: Some(vec![SYNC_FINALIZER.to_string()]),
        ..Default::default()
    }
}

/// What a managed object is, derived from its metadata on every reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Carries a parseable sync annotation and no origin label
    Source(Selector),
    /// Carries the origin-namespace label and the sync finalizer
    Copy { origin_namespace: String },
    /// Carries the finalizer but neither a usable annotation nor an origin
    /// label; a former source whose sync directive went away
    OrphanSource,
    /// Not ours
    Unmanaged,
}

pub fn classify<K: Resource>(obj: &K) -> Classification {
    let origin = obj.labels().get(labels::ORIGIN_NAMESPACE).cloned();
    let selector = obj
        .annotations()
        .get(annotations::SYNC)
        .and_then(|v| Selector::parse(v));
    match (selector, origin, has_sync_finalizer(obj)) {
        (Some(selector), None, _) => Classification::Source(selector),
        (_, Some(origin_namespace), true) => Classification::Copy { origin_namespace },
        (None, None, true) => Classification::OrphanSource,
        _ => Classification::Unmanaged,
    }
}

pub fn has_sync_finalizer<K: Resource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == SYNC_FINALIZER)
}

/// Idempotent in-memory add; callers persist with an UPDATE
pub fn add_finalizer_token<K: Resource>(obj: &mut K) {
    let finalizers = obj.finalizers_mut();
    if !finalizers.iter().any(|f| f == SYNC_FINALIZER) {
        finalizers.push(SYNC_FINALIZER.to_string());
    }
}

/// Idempotent in-memory remove; callers persist with an UPDATE
pub fn remove_finalizer_token<K: Resource>(obj: &mut K) {
    obj.finalizers_mut().retain(|f| f != SYNC_FINALIZER);
}

/// Strips the origin-namespace label when a copy is released from
/// management, leaving a plain unmanaged object behind.
pub fn clear_origin_label<K: Resource>(obj: &mut K) {
    if let Some(labels) = obj.meta_mut().labels.as_mut() {
        labels.remove(labels::ORIGIN_NAMESPACE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    fn meta(
        name: &str,
        namespace: &str,
        annotations: Option<BTreeMap<String, String>>,
        labels: Option<BTreeMap<String, String>>,
        finalizers: Option<Vec<String>>,
    ) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations,
            labels,
            finalizers,
            ..Default::default()
        }
    }

    fn sync_annotation(directive: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(annotations::SYNC.to_string(), directive.to_string())])
    }

    fn origin_label(namespace: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(labels::ORIGIN_NAMESPACE.to_string(), namespace.to_string())])
    }

    fn make_source_configmap() -> ConfigMap {
        ConfigMap {
            metadata: meta("cfg", "src", Some(sync_annotation("app=demo")), None, None),
            data: Some(BTreeMap::from([("HOST".to_string(), "a".to_string())])),
            binary_data: Some(BTreeMap::from([(
                "blob".to_string(),
                ByteString(vec![1, 2, 3]),
            )])),
            ..Default::default()
        }
    }

    fn make_source_secret() -> Secret {
        Secret {
            metadata: meta("tok", "src", Some(sync_annotation("app=demo")), None, None),
            data: Some(BTreeMap::from([(
                "pw".to_string(),
                ByteString(b"p1".to_vec()),
            )])),
            string_data: Some(BTreeMap::from([("user".to_string(), "admin".to_string())])),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_configmap_clones_payload() {
        let source = make_source_configmap();
        let copy = source.duplicate("t1");

        assert_eq!(copy.data, source.data);
        assert_eq!(copy.binary_data, source.binary_data);
        assert_eq!(copy.metadata.name.as_deref(), Some("cfg"));
        assert_eq!(copy.metadata.namespace.as_deref(), Some("t1"));
    }

    #[test]
    fn test_duplicate_configmap_tags_origin_and_finalizer() {
        let copy = make_source_configmap().duplicate("t1");

        assert_eq!(
            copy.labels().get(labels::ORIGIN_NAMESPACE).map(String::as_str),
            Some("src")
        );
        assert!(has_sync_finalizer(&copy));
    }

    #[test]
    fn test_duplicate_configmap_drops_annotations() {
        let copy = make_source_configmap().duplicate("t1");
        assert!(copy.metadata.annotations.is_none());
    }

    #[test]
    fn test_duplicate_secret_clones_payload_and_type() {
        let source = make_source_secret();
        let copy = source.duplicate("t2");

        assert_eq!(copy.data, source.data);
        assert_eq!(copy.string_data, source.string_data);
        assert_eq!(copy.type_, source.type_);
        assert_eq!(copy.metadata.namespace.as_deref(), Some("t2"));
        assert!(copy.metadata.annotations.is_none());
        assert!(has_sync_finalizer(&copy));
    }

    #[test]
    fn test_classify_source() {
        let cm = make_source_configmap();
        match classify(&cm) {
            Classification::Source(selector) => assert_eq!(selector.to_string(), "app=demo"),
            other => panic!("expected source, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_copy() {
        let cm = ConfigMap {
            metadata: meta(
                "cfg",
                "t1",
                None,
                Some(origin_label("src")),
                Some(vec![SYNC_FINALIZER.to_string()]),
            ),
            ..Default::default()
        };
        assert_eq!(
            classify(&cm),
            Classification::Copy {
                origin_namespace: "src".to_string()
            }
        );
    }

    #[test]
    fn test_classify_orphan_source() {
        let cm = ConfigMap {
            metadata: meta("cfg", "src", None, None, Some(vec![SYNC_FINALIZER.to_string()])),
            ..Default::default()
        };
        assert_eq!(classify(&cm), Classification::OrphanSource);
    }

    #[test]
    fn test_classify_unmanaged() {
        let cm = ConfigMap {
            metadata: meta("cfg", "ns", None, None, None),
            ..Default::default()
        };
        assert_eq!(classify(&cm), Classification::Unmanaged);
    }

    #[test]
    fn test_classify_malformed_annotation_without_finalizer_is_unmanaged() {
        let cm = ConfigMap {
            metadata: meta("cfg", "src", Some(sync_annotation("not a selector")), None, None),
            ..Default::default()
        };
        assert_eq!(classify(&cm), Classification::Unmanaged);
    }

    #[test]
    fn test_classify_malformed_annotation_with_finalizer_is_orphan() {
        let cm = ConfigMap {
            metadata: meta(
                "cfg",
                "src",
                Some(sync_annotation("not a selector")),
                None,
                Some(vec![SYNC_FINALIZER.to_string()]),
            ),
            ..Default::default()
        };
        assert_eq!(classify(&cm), Classification::OrphanSource);
    }

    #[test]
    fn test_classify_annotated_copy_stays_copy() {
        // A sync annotation on a copy must not turn it into a source.
        let cm = ConfigMap {
            metadata: meta(
                "cfg",
                "t1",
                Some(sync_annotation("app=demo")),
                Some(origin_label("src")),
                Some(vec![SYNC_FINALIZER.to_string()]),
            ),
            ..Default::default()
        };
        assert_eq!(
            classify(&cm),
            Classification::Copy {
                origin_namespace: "src".to_string()
            }
        );
    }

    #[test]
    fn test_add_finalizer_token_is_idempotent() {
        let mut cm = ConfigMap {
            metadata: meta("cfg", "src", None, None, None),
            ..Default::default()
        };
        add_finalizer_token(&mut cm);
        add_finalizer_token(&mut cm);
        assert_eq!(cm.finalizers(), &[SYNC_FINALIZER.to_string()]);
    }

    #[test]
    fn test_remove_finalizer_token() {
        let mut cm = ConfigMap {
            metadata: meta(
                "cfg",
                "src",
                None,
                None,
                Some(vec!["other/finalizer".to_string(), SYNC_FINALIZER.to_string()]),
            ),
            ..Default::default()
        };
        remove_finalizer_token(&mut cm);
        assert_eq!(cm.finalizers(), &["other/finalizer".to_string()]);
        remove_finalizer_token(&mut cm);
        assert_eq!(cm.finalizers(), &["other/finalizer".to_string()]);
    }

    #[test]
    fn test_clear_origin_label() {
        let mut cm = ConfigMap {
            metadata: meta("cfg", "t1", None, Some(origin_label("src")), None),
            ..Default::default()
        };
        clear_origin_label(&mut cm);
        assert!(!cm.labels().contains_key(labels::ORIGIN_NAMESPACE));
    }
}
