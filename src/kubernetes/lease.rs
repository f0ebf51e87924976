// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lease-based leader election.
//!
//! A single coordination/v1 Lease object names the active replica. The
//! elector acquires the lease before the reconcilers start and renews it
//! periodically; losing the lease is fatal so a stale leader never keeps
//! writing.

use crate::constants::lease;
use crate::error::{CourierError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::{ObjectMeta, PostParams};
use kube::{Api, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct LeaderElector {
    client: Client,
    namespace: String,
    identity: String,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: String, identity: String) -> Self {
        Self {
            client,
            namespace,
            identity,
        }
    }

    fn api(&self) -> Api<Lease> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Block until this replica holds the lease.
    pub async fn acquire(&self) -> Result<()> {
        info!(
            "Attempting to acquire leader lease {}/{} as {}",
            self.namespace,
            lease::NAME,
            self.identity
        );
        loop {
            match self.try_acquire().await {
                Ok(true) => {
                    info!("Acquired leader lease as {}", self.identity);
                    return Ok(());
                }
                Ok(false) => {
                    debug!("Leader lease held elsewhere, retrying");
                }
                Err(e) => {
                    warn!("Error while acquiring leader lease: {}", e);
                }
            }
            sleep(Duration::from_secs(lease::RETRY_INTERVAL_SECS)).await;
        }
    }

    async fn try_acquire(&self) -> Result<bool> {
        let api = self.api();
        match api.get_opt(lease::NAME).await? {
            None => {
                let fresh = self.desired_lease(None);
                match api.create(&PostParams::default(), &fresh).await {
                    Ok(_) => Ok(true),
                    // another candidate won the create race
                    Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
            Some(current) => {
                let spec = current.spec.clone().unwrap_or_default();
                let ours = spec.holder_identity.as_deref() == Some(self.identity.as_str());
                if !ours && spec.holder_identity.is_some() && !lease_expired(&spec, Utc::now()) {
                    return Ok(false);
                }
                let renewed = self.desired_lease(Some(&current));
                match api
                    .replace(lease::NAME, &PostParams::default(), &renewed)
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Renew the held lease until it is lost or the cluster stops answering.
    pub async fn renew_forever(self) -> Result<()> {
        let api = self.api();
        loop {
            sleep(Duration::from_secs(lease::RENEW_INTERVAL_SECS)).await;
            let current = api.get(lease::NAME).await?;
            let holder = current
                .spec
                .as_ref()
                .and_then(|s| s.holder_identity.clone());
            if holder.as_deref() != Some(self.identity.as_str()) {
                return Err(CourierError::LeadershipLost(holder.unwrap_or_default()));
            }
            let renewed = self.desired_lease(Some(&current));
            api.replace(lease::NAME, &PostParams::default(), &renewed)
                .await?;
            debug!("Renewed leader lease as {}", self.identity);
        }
    }

    fn desired_lease(&self, current: Option<&Lease>) -> Lease {
        let now = MicroTime(Utc::now());
        let previous = current.and_then(|l| l.spec.as_ref());
        let takeover =
            previous.and_then(|s| s.holder_identity.as_deref()) != Some(self.identity.as_str());
        let transitions = previous.and_then(|s| s.lease_transitions).unwrap_or(0);
        Lease {
            metadata: ObjectMeta {
                name: Some(lease::NAME.to_string()),
                namespace: Some(self.namespace.clone()),
                resource_version: current.and_then(|l| l.metadata.resource_version.clone()),
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(lease::DURATION_SECS),
                acquire_time: if takeover {
                    Some(now.clone())
                } else {
                    previous.and_then(|s| s.acquire_time.clone())
                },
                renew_time: Some(now),
                lease_transitions: Some(if takeover { transitions + 1 } else { transitions }),
                ..Default::default()
            }),
        }
    }
}

/// A lease with no renewal inside its duration window is up for grabs.
fn lease_expired(spec: &LeaseSpec, now: DateTime<Utc>) -> bool {
    let Some(last) = spec
        .renew_time
        .as_ref()
        .or(spec.acquire_time.as_ref())
        .map(|t| t.0)
    else {
        return true;
    };
    let duration = i64::from(spec.lease_duration_seconds.unwrap_or(lease::DURATION_SECS));
    last + ChronoDuration::seconds(duration) < now
}
