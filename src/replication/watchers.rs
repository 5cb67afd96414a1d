// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watcher lifecycle: one task per (cluster, resource, direction), each
//! owning a cancellation handle in the active-handle table.

use crate::constants::labels;
use crate::replication::handlers::{self, ReplicationContext};
use futures::future::{AbortHandle, Abortable};
use futures::StreamExt;
use kube::api::{Api, DynamicObject};
use kube::ResourceExt;
use kube_runtime::{watcher, WatchStreamExt};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Watches the home cluster for originals to push outward
    LocalOrigin,
    /// Watches a peer for copies this cluster pushed there
    RemoteOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatcherKey {
    pub cluster_id: String,
    pub resource_id: String,
    pub direction: Direction,
}

impl WatcherKey {
    pub fn new(cluster_id: &str, resource_id: &str, direction: Direction) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            resource_id: resource_id.to_string(),
            direction,
        }
    }
}

/// Active-handle table. Start and stop are idempotent so callers never
/// pre-check existence.
#[derive(Default)]
pub struct WatcherManager {
    handles: RwLock<HashMap<WatcherKey, AbortHandle>>,
}

impl WatcherManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `key` unless a watcher for that key already runs.
    /// Returns whether a new task was spawned.
    pub async fn start<F>(&self, key: WatcherKey, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.handles.write().await;
        if handles.contains_key(&key) {
            return false;
        }
        let (abort, registration) = AbortHandle::new_pair();
        tokio::spawn(async move {
            // Aborted is the expected way for a watcher to end
            let _ = Abortable::new(task, registration).await;
        });
        handles.insert(key, abort);
        true
    }

    /// Cancel the watcher under `key`, if any. Returns whether one existed.
    pub async fn stop(&self, key: &WatcherKey) -> bool {
        match self.handles.write().await.remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every watcher bound to a cluster, returning how many stopped
    pub async fn stop_cluster(&self, cluster_id: &str) -> usize {
        let mut handles = self.handles.write().await;
        let mut stopped = 0;
        handles.retain(|key, handle| {
            if key.cluster_id == cluster_id {
                handle.abort();
                stopped += 1;
                false
            } else {
                true
            }
        });
        stopped
    }

    /// Cancel every watcher for an unregistered resource type
    pub async fn stop_resource(&self, resource_id: &str) -> usize {
        let mut handles = self.handles.write().await;
        let mut stopped = 0;
        handles.retain(|key, handle| {
            if key.resource_id == resource_id {
                handle.abort();
                stopped += 1;
                false
            } else {
                true
            }
        });
        stopped
    }

    pub async fn is_running(&self, key: &WatcherKey) -> bool {
        self.handles.read().await.contains_key(key)
    }

    pub async fn active_count(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn count_for_cluster(&self, cluster_id: &str) -> usize {
        self.handles
            .read()
            .await
            .keys()
            .filter(|k| k.cluster_id == cluster_id)
            .count()
    }
}

/// Watch the home cluster for originals destined to this context's peer
pub async fn run_local_watcher(ctx: ReplicationContext) {
    let ar = ctx.entry.resource.api_resource();
    let api: Api<DynamicObject> = Api::all_with(ctx.local_client.clone(), &ar);
    let selector = format!(
        "{}=true,{}={}",
        labels::REPLICATION,
        labels::DESTINATION,
        ctx.remote_cluster_id
    );
    run_watch_loop(api, selector, Direction::LocalOrigin, ctx).await;
}

/// Watch the peer for copies this cluster pushed out
pub async fn run_remote_watcher(ctx: ReplicationContext) {
    let ar = ctx.entry.resource.api_resource();
    let api: Api<DynamicObject> = Api::all_with(ctx.peer_client.clone(), &ar);
    let selector = format!(
        "{}=true,{}={}",
        labels::REPLICATED,
        labels::ORIGIN,
        ctx.local_cluster_id
    );
    run_watch_loop(api, selector, Direction::RemoteOrigin, ctx).await;
}

async fn run_watch_loop(
    api: Api<DynamicObject>,
    selector: String,
    direction: Direction,
    ctx: ReplicationContext,
) {
    let resource = ctx.entry.resource.id();
    info!(
        "Watcher started: {} {:?} toward {} (selector {})",
        resource, direction, ctx.remote_cluster_id, selector
    );

    let config = watcher::Config::default().labels(&selector);
    let mut events = Box::pin(watcher::watcher(api, config).default_backoff());

    while let Some(item) = events.next().await {
        match item {
            Ok(watcher::Event::Apply(obj)) | Ok(watcher::Event::InitApply(obj)) => {
                dispatch_apply(direction, &ctx, &obj).await;
            }
            Ok(watcher::Event::Delete(obj)) => {
                dispatch_delete(direction, &ctx, &obj).await;
            }
            Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => {}
            // The watcher re-establishes itself; nothing to do but log
            Err(e) => {
                warn!("Watch stream error for {}: {}, retrying", resource, e);
            }
        }
    }

    debug!("Watcher for {} toward {} ended", resource, ctx.remote_cluster_id);
}

async fn dispatch_apply(direction: Direction, ctx: &ReplicationContext, obj: &DynamicObject) {
    let result = match direction {
        Direction::LocalOrigin => handlers::handle_local_apply(ctx, obj).await,
        Direction::RemoteOrigin => handlers::handle_remote_apply(ctx, obj).await,
    };
    if let Err(e) = result {
        error!(
            "Failed to replicate {} toward {}: {}",
            obj.name_any(),
            ctx.remote_cluster_id,
            e
        );
    }
}

async fn dispatch_delete(direction: Direction, ctx: &ReplicationContext, obj: &DynamicObject) {
    match direction {
        Direction::LocalOrigin => {
            if let Err(e) = handlers::handle_local_delete(ctx, obj).await {
                error!(
                    "Failed to delete remote copy of {} on {}: {}",
                    obj.name_any(),
                    ctx.remote_cluster_id,
                    e
                );
            }
        }
        Direction::RemoteOrigin => {
            // A vanished copy is recreated by the next local resync
            debug!(
                "Remote copy of {} deleted on {}",
                obj.name_any(),
                ctx.remote_cluster_id
            );
        }
    }
}
