// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object-lifecycle reactions: push local originals outward, pull shared
//! status back, clean up orphaned copies.

use crate::constants::labels;
use crate::error::Result;
use crate::kubernetes::objects;
use crate::kubernetes::objects::{subtree, subtree_equal};
use crate::kubernetes::ensure_namespace_exists;
use crate::replication::namespaces::NamespaceTranslator;
use crate::replication::registry::{Ownership, ReplicatedResource};
use kube::api::{Api, DynamicObject, PostParams};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Everything one watcher needs to react to an object event
#[derive(Clone)]
pub struct ReplicationContext {
    pub local_client: Client,
    pub peer_client: Client,
    pub local_cluster_id: String,
    pub remote_cluster_id: String,
    pub entry: ReplicatedResource,
    pub namespaces: Arc<NamespaceTranslator>,
}

impl ReplicationContext {
    fn api_on(&self, client: &Client, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = self.entry.resource.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(client.clone(), ns, &ar),
            None => Api::all_with(client.clone(), &ar),
        }
    }

    /// Whether a local original's destination label names this context's
    /// peer. A missing or foreign label means the object is not ours to
    /// replicate.
    fn is_destined_here(&self, obj: &DynamicObject) -> bool {
        match obj.labels().get(labels::DESTINATION) {
            Some(dest) if *dest == self.remote_cluster_id => true,
            Some(dest) => {
                debug!(
                    "Object {} is destined for {}, not {}, skipping",
                    obj.name_any(),
                    dest,
                    self.remote_cluster_id
                );
                false
            }
            None => {
                debug!(
                    "Object {} has no destination label, not ours to replicate",
                    obj.name_any()
                );
                false
            }
        }
    }
}

/// React to a local original being added or modified: create the remote
/// copy if absent, otherwise converge the remote spec (and, for
/// locally-owned resources, the remote status) onto the local values.
#[instrument(skip(ctx, obj), fields(resource = %ctx.entry.resource.id(), object = %obj.name_any(), cluster = %ctx.remote_cluster_id))]
pub async fn handle_local_apply(ctx: &ReplicationContext, obj: &DynamicObject) -> Result<()> {
    if !ctx.is_destined_here(obj) {
        return Ok(());
    }

    let name = obj.name_any();
    let remote_ns = match obj.namespace() {
        Some(ns) => Some(ctx.namespaces.to_remote(&ctx.remote_cluster_id, &ns).await),
        None => None,
    };
    let api = ctx.api_on(&ctx.peer_client, remote_ns.as_deref());

    match objects::get_opt(&api, &name).await? {
        None => {
            if let Some(ns) = remote_ns.as_deref() {
                ensure_namespace_exists(&ctx.peer_client, ns).await?;
            }
            let copy = build_remote_copy(obj, remote_ns.as_deref(), ctx);
            match api.create(&PostParams::default(), &copy).await {
                Ok(_) => {
                    info!("Created remote copy of {}", name);
                }
                // Concurrent create by a previous event: already converged
                Err(kube::Error::Api(err)) if err.code == 409 => {
                    debug!("Remote copy of {} already exists", name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some(remote) => {
            if !subtree_equal(obj, &remote, "spec") {
                info!("Spec drift on remote copy of {}, updating", name);
                objects::update_subtree(&api, &name, "spec", subtree(obj, "spec")).await?;
            }
            if ctx.entry.ownership == Ownership::Local && !subtree_equal(obj, &remote, "status") {
                info!("Status drift on remote copy of {}, updating", name);
                objects::update_status(&api, &name, subtree(obj, "status")).await?;
            }
        }
    }

    Ok(())
}

/// React to a local original being deleted: remove the remote copy,
/// tolerating a concurrent delete
#[instrument(skip(ctx, obj), fields(resource = %ctx.entry.resource.id(), object = %obj.name_any(), cluster = %ctx.remote_cluster_id))]
pub async fn handle_local_delete(ctx: &ReplicationContext, obj: &DynamicObject) -> Result<()> {
    if !ctx.is_destined_here(obj) {
        return Ok(());
    }

    let name = obj.name_any();
    let remote_ns = match obj.namespace() {
        Some(ns) => Some(ctx.namespaces.to_remote(&ctx.remote_cluster_id, &ns).await),
        None => None,
    };
    let api = ctx.api_on(&ctx.peer_client, remote_ns.as_deref());

    objects::delete_tolerant(&api, &name).await?;
    info!("Deleted remote copy of {}", name);
    Ok(())
}

/// React to a change on a remote copy we pushed out. Only the status of
/// shared-ownership resources flows back; spec and metadata never do. A
/// copy whose local original is gone is removed rather than resurrected.
#[instrument(skip(ctx, obj), fields(resource = %ctx.entry.resource.id(), object = %obj.name_any(), cluster = %ctx.remote_cluster_id))]
pub async fn handle_remote_apply(ctx: &ReplicationContext, obj: &DynamicObject) -> Result<()> {
    if ctx.entry.ownership != Ownership::Shared {
        return Ok(());
    }

    let name = obj.name_any();
    match obj.labels().get(labels::ORIGIN) {
        Some(origin) if *origin == ctx.local_cluster_id => {}
        Some(_) | None => {
            debug!("Object {} was not pushed by this cluster, skipping", name);
            return Ok(());
        }
    }

    let local_ns = match obj.namespace() {
        Some(ns) => Some(ctx.namespaces.to_local(&ctx.remote_cluster_id, &ns).await),
        None => None,
    };
    let local_api = ctx.api_on(&ctx.local_client, local_ns.as_deref());

    match objects::get_opt(&local_api, &name).await? {
        None => {
            // Orphaned copy: the local original is gone, remove the copy
            let remote_api = ctx.api_on(&ctx.peer_client, obj.namespace().as_deref());
            objects::delete_tolerant(&remote_api, &name).await?;
            info!("Deleted orphaned remote copy of {}", name);
        }
        Some(local) => {
            if !subtree_equal(&local, obj, "status") {
                info!("Reflecting remote status of {} onto local object", name);
                objects::update_status(&local_api, &name, subtree(obj, "status")).await?;
            }
        }
    }

    Ok(())
}

/// Clone a local original into its remote form: same apiVersion/kind/name,
/// translated namespace, spec verbatim, provenance labels attached
fn build_remote_copy(
    local: &DynamicObject,
    remote_ns: Option<&str>,
    ctx: &ReplicationContext,
) -> DynamicObject {
    let ar = ctx.entry.resource.api_resource();
    let mut copy = DynamicObject::new(&local.name_any(), &ar);
    if let Some(ns) = remote_ns {
        copy = copy.within(ns);
    }

    copy.data = match subtree(local, "spec") {
        Some(spec) => serde_json::json!({ "spec": spec }),
        None => serde_json::json!({}),
    };

    let copy_labels = copy.labels_mut();
    copy_labels.insert(labels::ORIGIN.to_string(), ctx.local_cluster_id.clone());
    copy_labels.insert(labels::REPLICATION.to_string(), "false".to_string());
    copy_labels.insert(labels::REPLICATED.to_string(), "true".to_string());

    copy
}
