// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator owning all replication state.
//!
//! One `ReplicationEngine` is built at startup and shared as `Arc`; every
//! table lives behind its own lock here, nothing is process-global.

use crate::replication::handlers::ReplicationContext;
use crate::replication::namespaces::NamespaceTranslator;
use crate::replication::phase::{is_replication_enabled, PeeringPhase, PhaseStore};
use crate::replication::registry::{ReplicatedResource, ResourceRegistry};
use crate::replication::watchers::{self, Direction, WatcherKey, WatcherManager};
use kube::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

pub struct ReplicationEngine {
    local_client: Client,
    cluster_id: String,
    registry: RwLock<ResourceRegistry>,
    phases: PhaseStore,
    namespaces: Arc<NamespaceTranslator>,
    connections: RwLock<HashMap<String, Client>>,
    watchers: WatcherManager,
    /// Resource IDs whose watchers must be torn down on the next tick
    unregistered: Mutex<Vec<String>>,
}

impl ReplicationEngine {
    pub fn new(local_client: Client, cluster_id: String, resources: Vec<ReplicatedResource>) -> Self {
        Self {
            local_client,
            cluster_id,
            registry: RwLock::new(ResourceRegistry::new(resources)),
            phases: PhaseStore::new(),
            namespaces: Arc::new(NamespaceTranslator::new()),
            connections: RwLock::new(HashMap::new()),
            watchers: WatcherManager::new(),
            unregistered: Mutex::new(Vec::new()),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn namespaces(&self) -> &NamespaceTranslator {
        &self.namespaces
    }

    pub fn watchers(&self) -> &WatcherManager {
        &self.watchers
    }

    /// Register the client for a newly connected peer. At most one client
    /// exists per cluster; re-registering is a no-op returning false.
    pub async fn register_peer(&self, cluster_id: &str, client: Client) -> bool {
        let mut connections = self.connections.write().await;
        if connections.contains_key(cluster_id) {
            return false;
        }
        info!("Registered peer connection for {}", cluster_id);
        connections.insert(cluster_id.to_string(), client);
        true
    }

    pub async fn has_peer(&self, cluster_id: &str) -> bool {
        self.connections.read().await.contains_key(cluster_id)
    }

    /// Tear down a disconnected peer: cancel its watchers, then discard the
    /// client, translation entries, and phase. Watchers go first so none
    /// outlives its client.
    pub async fn remove_peer(&self, cluster_id: &str) {
        let stopped = self.watchers.stop_cluster(cluster_id).await;
        self.connections.write().await.remove(cluster_id);
        self.namespaces.remove_cluster(cluster_id).await;
        self.phases.remove(cluster_id).await;
        info!(
            "Removed peer {} ({} watchers stopped)",
            cluster_id, stopped
        );
    }

    pub async fn set_peering_phase(&self, cluster_id: &str, phase: PeeringPhase) {
        self.phases.set(cluster_id, phase).await;
    }

    pub async fn peering_phase(&self, cluster_id: &str) -> PeeringPhase {
        self.phases.get(cluster_id).await
    }

    pub async fn add_namespace_mapping(&self, cluster_id: &str, local_ns: &str, remote_ns: &str) {
        self.namespaces
            .add_mapping(cluster_id, local_ns, remote_ns)
            .await;
    }

    /// Swap in a new replication table; watchers of removed entries are
    /// queued for teardown on the next tick
    pub async fn reload_registry(&self, next: Vec<ReplicatedResource>) {
        let diff = self.registry.write().await.reload(next);
        if diff.added.is_empty() && diff.removed.is_empty() {
            return;
        }
        info!(
            "Replication table reloaded: {} added, {} removed",
            diff.added.len(),
            diff.removed.len()
        );
        let mut unregistered = self.unregistered.lock().await;
        for entry in diff.removed {
            unregistered.push(entry.resource.id());
        }
    }

    /// One lifecycle pass: tear down watchers of unregistered types, then
    /// ensure a watcher pair runs for every eligible (peer, resource).
    /// Only starts and stops tasks, never waits on them.
    pub async fn tick(&self) {
        let removed: Vec<String> = self.unregistered.lock().await.drain(..).collect();
        for resource_id in removed {
            let stopped = self.watchers.stop_resource(&resource_id).await;
            debug!(
                "Unregistered {}: stopped {} watchers",
                resource_id, stopped
            );
        }

        let resources = self.registry.read().await.snapshot();
        let connections = self.connections.read().await.clone();

        for (cluster_id, peer_client) in connections {
            let phase = self.phases.get(&cluster_id).await;
            for entry in &resources {
                if !is_replication_enabled(phase, entry.peering_phase) {
                    continue;
                }
                self.ensure_watcher_pair(&cluster_id, &peer_client, entry)
                    .await;
            }
        }
    }

    async fn ensure_watcher_pair(
        &self,
        cluster_id: &str,
        peer_client: &Client,
        entry: &ReplicatedResource,
    ) {
        let resource_id = entry.resource.id();
        let ctx = ReplicationContext {
            local_client: self.local_client.clone(),
            peer_client: peer_client.clone(),
            local_cluster_id: self.cluster_id.clone(),
            remote_cluster_id: cluster_id.to_string(),
            entry: entry.clone(),
            namespaces: Arc::clone(&self.namespaces),
        };

        let local_key = WatcherKey::new(cluster_id, &resource_id, Direction::LocalOrigin);
        self.watchers
            .start(local_key, watchers::run_local_watcher(ctx.clone()))
            .await;

        let remote_key = WatcherKey::new(cluster_id, &resource_id, Direction::RemoteOrigin);
        self.watchers
            .start(remote_key, watchers::run_remote_watcher(ctx))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::registry::default_resources;
    use crate::test_utils::MockService;

    fn make_engine() -> ReplicationEngine {
        ReplicationEngine::new(
            MockService::new().into_client(),
            "home".to_string(),
            default_resources(),
        )
    }

    #[tokio::test]
    async fn test_register_peer_at_most_once() {
        let engine = make_engine();
        assert!(
            engine
                .register_peer("cluster-x", MockService::new().into_client())
                .await
        );
        assert!(
            !engine
                .register_peer("cluster-x", MockService::new().into_client())
                .await
        );
    }

    #[tokio::test]
    async fn test_tick_without_phase_starts_nothing() {
        let engine = make_engine();
        engine
            .register_peer("cluster-x", MockService::new().into_client())
            .await;

        engine.tick().await;

        assert_eq!(engine.watchers().active_count().await, 0);
    }

    #[tokio::test]
    async fn test_tick_starts_eligible_watcher_pairs() {
        let engine = make_engine();
        engine
            .register_peer("cluster-x", MockService::new().into_client())
            .await;
        engine
            .set_peering_phase("cluster-x", PeeringPhase::Outgoing)
            .await;

        engine.tick().await;

        // Defaults: Authenticated and Established gates pass for Outgoing,
        // the Incoming-gated entry does not. Two directions each.
        assert_eq!(engine.watchers().active_count().await, 4);

        // A second tick is a no-op
        engine.tick().await;
        assert_eq!(engine.watchers().active_count().await, 4);
    }

    #[tokio::test]
    async fn test_bidirectional_enables_everything() {
        let engine = make_engine();
        engine
            .register_peer("cluster-x", MockService::new().into_client())
            .await;
        engine
            .set_peering_phase("cluster-x", PeeringPhase::Bidirectional)
            .await;

        engine.tick().await;

        assert_eq!(engine.watchers().active_count().await, 6);
    }

    #[tokio::test]
    async fn test_reload_tears_down_removed_resources() {
        let engine = make_engine();
        engine
            .register_peer("cluster-x", MockService::new().into_client())
            .await;
        engine
            .set_peering_phase("cluster-x", PeeringPhase::Bidirectional)
            .await;
        engine.tick().await;
        assert_eq!(engine.watchers().active_count().await, 6);

        engine.reload_registry(Vec::new()).await;
        engine.tick().await;

        assert_eq!(engine.watchers().active_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_peer_tears_everything_down() {
        let engine = make_engine();
        engine
            .register_peer("cluster-x", MockService::new().into_client())
            .await;
        engine
            .set_peering_phase("cluster-x", PeeringPhase::Bidirectional)
            .await;
        engine
            .add_namespace_mapping("cluster-x", "apps", "tenant-home")
            .await;
        engine.tick().await;
        assert!(engine.watchers().active_count().await > 0);

        engine.remove_peer("cluster-x").await;

        assert_eq!(engine.watchers().count_for_cluster("cluster-x").await, 0);
        assert!(!engine.has_peer("cluster-x").await);
        assert!(engine.namespaces().is_empty_for("cluster-x").await);
        assert_eq!(engine.peering_phase("cluster-x").await, PeeringPhase::None);
    }
}
