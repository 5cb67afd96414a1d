// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Foreign cluster reconciler - manages peer connection lifecycle and drives
//! the watcher lifecycle tick.

use crate::config::Config;
use crate::constants::FOREIGN_CLUSTER_FINALIZER;
use crate::error::{PeersyncError, Result};
use crate::kubernetes::create_peer_client;
use crate::replication::{PeeringPhase, ReplicationEngine};
use crate::types::ForeignCluster;
use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct ForeignClusterReconciler {
    client: Client,
    config: Config,
    engine: Arc<ReplicationEngine>,
}

impl ForeignClusterReconciler {
    pub fn new(client: Client, config: Config, engine: Arc<ReplicationEngine>) -> Self {
        Self {
            client,
            config,
            engine,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let foreign_clusters: Api<ForeignCluster> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(foreign_clusters, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled foreign cluster: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(
    fc: Arc<ForeignCluster>,
    ctx: Arc<ForeignClusterReconciler>,
) -> Result<Action> {
    let name = fc.name_any();
    let cluster_id = fc.spec.cluster_id.clone();

    if fc.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&fc) {
            info!("Foreign cluster {} deleted, tearing down peer {}", name, cluster_id);
            ctx.engine.remove_peer(&cluster_id).await;
            remove_finalizer(&ctx.client, &fc).await?;
        }
        return Ok(Action::await_change());
    }

    ensure_finalizer(&ctx.client, &fc).await?;

    debug!("Reconciling foreign cluster: {}", name);
    ctx.engine
        .set_peering_phase(&cluster_id, effective_phase(&fc))
        .await;

    if !ctx.engine.has_peer(&cluster_id).await {
        if fc.is_authenticated() {
            match create_peer_client(&ctx.client, &fc, &ctx.config).await {
                Ok(peer_client) => {
                    ctx.engine.register_peer(&cluster_id, peer_client).await;
                    if let Some((local_ns, remote_ns)) = fc.tenant_namespace() {
                        ctx.engine
                            .add_namespace_mapping(&cluster_id, &local_ns, &remote_ns)
                            .await;
                    }
                }
                // No watchers start this round; retried on the next requeue
                Err(e) => {
                    warn!("Failed to create peer client for {}: {}", cluster_id, e);
                }
            }
        } else {
            debug!(
                "Foreign cluster {} not authenticated yet, no connection",
                name
            );
        }
    }

    ctx.engine.tick().await;

    Ok(Action::requeue(Duration::from_secs(
        ctx.config.resync_period_secs,
    )))
}

fn error_policy(
    _fc: Arc<ForeignCluster>,
    error: &PeersyncError,
    _ctx: Arc<ForeignClusterReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

/// Phase derived from the join flags, upgraded to Authenticated for a peer
/// with resolved credentials but no join in either direction yet
fn effective_phase(fc: &ForeignCluster) -> PeeringPhase {
    let phase = PeeringPhase::from_join_status(fc.incoming_joined(), fc.outgoing_joined());
    if phase == PeeringPhase::None && fc.is_authenticated() {
        PeeringPhase::Authenticated
    } else {
        phase
    }
}

fn has_finalizer(fc: &ForeignCluster) -> bool {
    fc.metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == FOREIGN_CLUSTER_FINALIZER))
}

async fn ensure_finalizer(client: &Client, fc: &ForeignCluster) -> Result<()> {
    if has_finalizer(fc) {
        return Ok(());
    }
    let api: Api<ForeignCluster> = Api::all(client.clone());
    let mut finalizers = fc.metadata.finalizers.clone().unwrap_or_default();
    finalizers.push(FOREIGN_CLUSTER_FINALIZER.to_string());
    let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&fc.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn remove_finalizer(client: &Client, fc: &ForeignCluster) -> Result<()> {
    let api: Api<ForeignCluster> = Api::all(client.clone());
    let finalizers: Vec<String> = fc
        .metadata
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != FOREIGN_CLUSTER_FINALIZER)
        .collect();
    let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&fc.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}
