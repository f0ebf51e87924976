// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Propagation logic: selector parsing, the per-kind adapter, and the
//! reconcile engine.

pub mod engine;
pub mod object;
pub mod selector;

pub use object::{classify, Classification, Propagate};
pub use selector::Selector;
