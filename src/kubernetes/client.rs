// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Peer cluster client creation and kubeconfig utilities

use crate::config::Config;
use crate::error::{PeersyncError, Result};
use crate::types::ForeignCluster;
use k8s_openapi::api::core::v1::Secret;
use kube::{config::KubeConfigOptions, Api, Client, Config as KConfig, ResourceExt};
use tracing::{debug, info, instrument};

/// Create a Kubernetes client for a peered remote cluster
#[instrument(skip(home_client, foreign_cluster, config), fields(cluster = %foreign_cluster.spec.cluster_id))]
pub async fn create_peer_client(
    home_client: &Client,
    foreign_cluster: &ForeignCluster,
    config: &Config,
) -> Result<Client> {
    if config.testing_mode {
        create_testing_client(foreign_cluster).await
    } else {
        let kubeconfig = get_peer_kubeconfig(home_client, foreign_cluster).await?;
        create_client_from_kubeconfig(&kubeconfig).await
    }
}

/// Create a client for testing mode (uses modified cluster URL)
async fn create_testing_client(foreign_cluster: &ForeignCluster) -> Result<Client> {
    let mut c = KConfig::infer()
        .await
        .map_err(|e| PeersyncError::KubeconfigError(format!("Failed to infer config: {}", e)))?;

    if let Some(cluster_url) = c.cluster_url.to_string().rsplit('/').next() {
        if cluster_url == "home" {
            let new_cluster_url = c
                .cluster_url
                .to_string()
                .replace("home", &foreign_cluster.spec.cluster_id);
            debug!(
                "Testing mode: modifying cluster URL from {} to {}",
                c.cluster_url, new_cluster_url
            );
            c.cluster_url = new_cluster_url
                .parse()
                .map_err(|e| PeersyncError::KubeconfigError(format!("Invalid URL: {}", e)))?;
        }
    }

    Client::try_from(c)
        .map_err(|e| PeersyncError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// Get the kubeconfig for a peered cluster from its credentials secret
#[instrument(skip(client, foreign_cluster), fields(cluster = %foreign_cluster.spec.cluster_id))]
async fn get_peer_kubeconfig(client: &Client, foreign_cluster: &ForeignCluster) -> Result<String> {
    let cluster_name = foreign_cluster.name_any();
    let secret_name = foreign_cluster.kubeconfig_secret_name();
    let namespace = foreign_cluster.kubeconfig_secret_namespace();
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    info!(
        "Getting kubeconfig secret '{}/{}' for peer '{}'...",
        namespace, secret_name, cluster_name
    );

    let secret = secrets.get(&secret_name).await.map_err(|e| {
        PeersyncError::KubeconfigError(format!(
            "Failed to get kubeconfig secret for peer {}: {}",
            cluster_name, e
        ))
    })?;

    let Some(data) = secret.data.as_ref() else {
        return Err(PeersyncError::KubeconfigError(format!(
            "Kubeconfig secret for peer {} has no data",
            cluster_name
        )));
    };

    let Some(kubeconfig_data) = data.get("kubeconfig") else {
        return Err(PeersyncError::KubeconfigError(format!(
            "Kubeconfig secret for peer {} does not contain 'kubeconfig' key",
            cluster_name
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        PeersyncError::KubeconfigError(format!(
            "Failed to decode kubeconfig for peer {}: {}",
            cluster_name, e
        ))
    })
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    use kube::config::Kubeconfig;

    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| PeersyncError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                PeersyncError::KubeconfigError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| PeersyncError::KubeconfigError(format!("Failed to create client: {}", e)))
}
