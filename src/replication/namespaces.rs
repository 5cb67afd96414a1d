// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-cluster namespace translation.
//!
//! Keys are always (cluster ID, namespace) pairs: two peers may use the
//! same remote namespace name without colliding. A namespace with no
//! mapping translates to itself, so unenrolled and cluster-scoped objects
//! replicate untouched.

use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct NamespaceTranslator {
    local_to_remote: RwLock<HashMap<(String, String), String>>,
    remote_to_local: RwLock<HashMap<(String, String), String>>,
}

impl NamespaceTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bidirectional mapping for one peer
    pub async fn add_mapping(&self, cluster_id: &str, local_ns: &str, remote_ns: &str) {
        self.local_to_remote.write().await.insert(
            (cluster_id.to_string(), local_ns.to_string()),
            remote_ns.to_string(),
        );
        self.remote_to_local.write().await.insert(
            (cluster_id.to_string(), remote_ns.to_string()),
            local_ns.to_string(),
        );
    }

    /// Translate a home-cluster namespace for the given peer, identity on miss
    pub async fn to_remote(&self, cluster_id: &str, local_ns: &str) -> String {
        self.local_to_remote
            .read()
            .await
            .get(&(cluster_id.to_string(), local_ns.to_string()))
            .cloned()
            .unwrap_or_else(|| local_ns.to_string())
    }

    /// Translate a peer namespace back to the home cluster, identity on miss
    pub async fn to_local(&self, cluster_id: &str, remote_ns: &str) -> String {
        self.remote_to_local
            .read()
            .await
            .get(&(cluster_id.to_string(), remote_ns.to_string()))
            .cloned()
            .unwrap_or_else(|| remote_ns.to_string())
    }

    /// Drop every entry for a disconnected peer
    pub async fn remove_cluster(&self, cluster_id: &str) {
        self.local_to_remote
            .write()
            .await
            .retain(|(c, _), _| c != cluster_id);
        self.remote_to_local
            .write()
            .await
            .retain(|(c, _), _| c != cluster_id);
    }

    /// True when no mapping remains for the given peer
    pub async fn is_empty_for(&self, cluster_id: &str) -> bool {
        let ltr = self.local_to_remote.read().await;
        let rtl = self.remote_to_local.read().await;
        !ltr.keys().any(|(c, _)| c == cluster_id) && !rtl.keys().any(|(c, _)| c == cluster_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_fallback() {
        let translator = NamespaceTranslator::new();
        assert_eq!(translator.to_remote("cluster-a", "apps").await, "apps");
        assert_eq!(translator.to_local("cluster-a", "apps").await, "apps");
    }

    #[tokio::test]
    async fn test_round_trip() {
        let translator = NamespaceTranslator::new();
        translator
            .add_mapping("cluster-a", "apps", "tenant-home-apps")
            .await;

        let remote = translator.to_remote("cluster-a", "apps").await;
        assert_eq!(remote, "tenant-home-apps");
        assert_eq!(translator.to_local("cluster-a", &remote).await, "apps");
    }

    #[tokio::test]
    async fn test_clusters_do_not_collide() {
        let translator = NamespaceTranslator::new();
        translator
            .add_mapping("cluster-a", "apps-a", "shared-ns")
            .await;
        translator
            .add_mapping("cluster-b", "apps-b", "shared-ns")
            .await;

        assert_eq!(translator.to_local("cluster-a", "shared-ns").await, "apps-a");
        assert_eq!(translator.to_local("cluster-b", "shared-ns").await, "apps-b");
    }

    #[tokio::test]
    async fn test_remove_cluster() {
        let translator = NamespaceTranslator::new();
        translator
            .add_mapping("cluster-a", "apps", "tenant-a")
            .await;
        translator
            .add_mapping("cluster-b", "apps", "tenant-b")
            .await;

        translator.remove_cluster("cluster-a").await;

        assert!(translator.is_empty_for("cluster-a").await);
        // other clusters untouched, removed cluster falls back to identity
        assert_eq!(translator.to_remote("cluster-a", "apps").await, "apps");
        assert_eq!(translator.to_remote("cluster-b", "apps").await, "tenant-b");
    }
}
