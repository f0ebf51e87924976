// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The namespace oracle: liveness and selector membership of namespaces.

use crate::error::Result;
use crate::sync::selector::Selector;
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::ListParams, Api, Client, Resource};
use tracing::debug;

/// True once the namespace is on its way out: phase Terminating or a
/// deletion timestamp is set.
pub fn is_terminating(namespace: &Namespace) -> bool {
    if namespace.meta().deletion_timestamp.is_some() {
        return true;
    }
    namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Terminating")
}

/// True if the namespace is gone or terminating. Finalizer operations in
/// such a namespace would wedge its teardown, so callers skip them.
/// Errors other than not-found propagate as transient.
pub async fn terminating_or_absent(client: &Client, name: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.get_opt(name).await? {
        None => Ok(true),
        Some(ns) => Ok(is_terminating(&ns)),
    }
}

/// List the namespaces the selector targets, excluding terminating ones.
pub async fn list_selected(client: &Client, selector: &Selector) -> Result<Vec<Namespace>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let lp = ListParams::default().labels(&selector.to_string());
    let namespace_list = namespaces.list(&lp).await?;

    let selected: Vec<Namespace> = namespace_list
        .items
        .into_iter()
        .filter(|ns| !is_terminating(ns))
        .collect();
    debug!(
        "Selector {} matches {} active namespaces",
        selector,
        selected.len()
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{namespace_json, namespace_list_json, MockService};
    use kube::ResourceExt;

    #[tokio::test]
    async fn test_terminating_or_absent_not_found() {
        let client = MockService::new().into_client();
        assert!(terminating_or_absent(&client, "gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_terminating_or_absent_active_namespace() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces/t1",
                200,
                &namespace_json("t1", &[], "Active"),
            )
            .into_client();
        assert!(!terminating_or_absent(&client, "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_terminating_or_absent_terminating_namespace() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces/t1",
                200,
                &namespace_json("t1", &[], "Terminating"),
            )
            .into_client();
        assert!(terminating_or_absent(&client, "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_selected_filters_terminating() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces",
                200,
                &namespace_list_json(&[
                    namespace_json("t1", &[("app", "demo")], "Active"),
                    namespace_json("t2", &[("app", "demo")], "Terminating"),
                ]),
            )
            .into_client();

        let selector = Selector::parse("app=demo").unwrap();
        let selected = list_selected(&client, &selector).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name_any(), "t1");
    }

    #[test]
    fn test_is_terminating_by_deletion_timestamp() {
        let mut ns: Namespace =
            serde_json::from_str(&namespace_json("t1", &[], "Active")).unwrap();
        assert!(!is_terminating(&ns));
        ns.metadata.deletion_timestamp = Some(
            k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(chrono::Utc::now()),
        );
        assert!(is_terminating(&ns));
    }
}
