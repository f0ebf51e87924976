// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-facing utilities: the namespace oracle and leader election.

pub mod lease;
pub mod namespaces;

pub use lease::LeaderElector;
