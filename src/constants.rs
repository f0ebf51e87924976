// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by Courier
pub mod annotations {
    /// Declares an object as a sync source; the value is the `key=value`
    /// namespace selector.
    pub const SYNC: &str = "courier.geeko.me/sync";
}

/// Kubernetes label keys used by Courier
pub mod labels {
    /// Namespace of the source object, stamped on every copy.
    pub const ORIGIN_NAMESPACE: &str = "courier.geeko.me/origin.namespace";
}

/// Finalizer that blocks deletion of managed objects until the controller
/// has retracted or regenerated their copies.
pub const SYNC_FINALIZER: &str = "courier.geeko.me/finalizer";

/// The operator name, used for the leader election lease and log context
pub const OPERATOR_NAME: &str = "courier";

/// Requeue delay after a failed reconcile, in seconds
pub const ERROR_REQUEUE_SECS: u64 = 60;

/// Leader election lease configuration
pub mod lease {
    /// Name of the coordination/v1 Lease object
    pub const NAME: &str = "courier-leader-election";
    /// How long a lease is valid without renewal, in seconds
    pub const DURATION_SECS: i32 = 15;
    /// Interval between renewals by the holder, in seconds
    pub const RENEW_INTERVAL_SECS: u64 = 10;
    /// Retry interval for candidates waiting to acquire, in seconds
    pub const RETRY_INTERVAL_SECS: u64 = 2;
}
