// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes label keys forming the replication provenance contract.
/// External tooling reads these; the key strings are load-bearing.
pub mod labels {
    /// On a home-cluster original: "true" marks it for outward replication.
    /// On a replicated copy this is always "false".
    pub const REPLICATION: &str = "peersync.geeko.me/replication";
    /// On a home-cluster original: the cluster ID the object is destined for.
    pub const DESTINATION: &str = "peersync.geeko.me/destination";
    /// On a replicated copy: the cluster ID that authored it.
    pub const ORIGIN: &str = "peersync.geeko.me/origin";
    /// "true" on every object this engine created.
    pub const REPLICATED: &str = "peersync.geeko.me/replicated";
    /// Set on namespaces created by the engine in peer clusters.
    pub const MANAGED_BY: &str = "peersync.geeko.me/managed-by";
}

/// The operator name used for API calls and the managed-by label value
pub const OPERATOR_NAME: &str = "peersync";

/// Finalizer placed on ForeignCluster objects so peer teardown runs before removal
pub const FOREIGN_CLUSTER_FINALIZER: &str = "peersync.geeko.me/finalizer";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Conflict-retry tuning for spec/status updates
pub mod retry {
    /// Attempt cap for resourceVersion conflict retries
    pub const UPDATE_ATTEMPTS: u32 = 5;
    /// Initial backoff in milliseconds, doubled per attempt
    pub const INITIAL_BACKOFF_MS: u64 = 100;
    /// Backoff cap in milliseconds
    pub const MAX_BACKOFF_MS: u64 = 1600;
}
