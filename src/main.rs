// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use peersync::config::Config;
use peersync::kubernetes::wait_for_foreign_cluster_crd;
use peersync::reconcilers::ForeignClusterReconciler;
use peersync::replication::{registry, ReplicationEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Peersync operator");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: cluster_id={}", config.cluster_id);

    // Create Kubernetes client for the home cluster
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the ForeignCluster CRD before starting the reconciler
    info!("Waiting for ForeignCluster CRD to become available...");
    wait_for_foreign_cluster_crd(&client).await?;

    // Load the replication table
    let resources = match &config.resources_file {
        Some(path) => registry::load_from_file(path)?,
        None => registry::default_resources(),
    };
    info!("Replication table loaded: {} resource types", resources.len());

    // Build the engine owning all replication state
    let engine = Arc::new(ReplicationEngine::new(
        client.clone(),
        config.cluster_id.clone(),
        resources,
    ));

    let reconciler = ForeignClusterReconciler::new(client, config, engine);

    info!("Starting foreign cluster reconciler...");
    reconciler.run().await?;

    // This should never be reached as the reconciler runs forever
    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
