// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} {name} in namespace {namespace} is owned by source namespace {origin}")]
    OwnershipConflict {
        kind: &'static str,
        name: String,
        namespace: String,
        origin: String,
    },

    #[error("partial fan-out failure: {0}")]
    PartialFanout(String),

    #[error("leader election lease was taken over by {0}")]
    LeadershipLost(String),
}

pub type Result<T> = std::result::Result<T, CourierError>;
