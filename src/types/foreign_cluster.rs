// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "peering.geeko.me", version = "v1alpha1", kind = "ForeignCluster")]
#[kube(status = "ForeignClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ForeignClusterSpec {
    /// Stable identity of the remote cluster for the lifetime of the peering
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig_secret_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig_secret_namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForeignClusterStatus {
    /// Credentials for the remote cluster have been resolved and verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    /// The remote cluster consumes resources from the home cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_joined: Option<bool>,
    /// The home cluster consumes resources from the remote cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing_joined: Option<bool>,
    /// Namespace pair reserved for this peering on each side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_namespace: Option<TenantNamespace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantNamespace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ForeignCluster {
    /// Whether credentials are resolved and a peer client can be constructed
    pub fn is_authenticated(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.authenticated)
            .unwrap_or(false)
    }

    pub fn incoming_joined(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.incoming_joined)
            .unwrap_or(false)
    }

    pub fn outgoing_joined(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.outgoing_joined)
            .unwrap_or(false)
    }

    /// Get the name of the kubeconfig secret for this peer
    pub fn kubeconfig_secret_name(&self) -> String {
        self.spec
            .kubeconfig_secret_name
            .clone()
            .unwrap_or_else(|| format!("{}-kubeconfig", self.name_any()))
    }

    /// Namespace holding the kubeconfig secret
    pub fn kubeconfig_secret_namespace(&self) -> String {
        self.spec
            .kubeconfig_secret_namespace
            .clone()
            .unwrap_or_else(|| "peersync-system".to_string())
    }

    /// Tenant namespace pair, if the peering reconciler has assigned one
    pub fn tenant_namespace(&self) -> Option<(String, String)> {
        let tenant = self.status.as_ref()?.tenant_namespace.as_ref()?;
        match (&tenant.local, &tenant.remote) {
            (Some(l), Some(r)) => Some((l.clone(), r.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn make_foreign_cluster(name: &str, status: Option<ForeignClusterStatus>) -> ForeignCluster {
        ForeignCluster {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: ForeignClusterSpec {
                cluster_id: format!("{}-id", name),
                kubeconfig_secret_name: None,
                kubeconfig_secret_namespace: None,
            },
            status,
        }
    }

    #[test]
    fn test_is_authenticated_true() {
        let fc = make_foreign_cluster(
            "peer",
            Some(ForeignClusterStatus {
                authenticated: Some(true),
                ..Default::default()
            }),
        );
        assert!(fc.is_authenticated());
    }

    #[test]
    fn test_is_authenticated_no_status() {
        let fc = make_foreign_cluster("peer", None);
        assert!(!fc.is_authenticated());
    }

    #[test]
    fn test_join_flags_default_false() {
        let fc = make_foreign_cluster("peer", Some(ForeignClusterStatus::default()));
        assert!(!fc.incoming_joined());
        assert!(!fc.outgoing_joined());
    }

    #[test]
    fn test_join_flags_set() {
        let fc = make_foreign_cluster(
            "peer",
            Some(ForeignClusterStatus {
                incoming_joined: Some(true),
                outgoing_joined: Some(false),
                ..Default::default()
            }),
        );
        assert!(fc.incoming_joined());
        assert!(!fc.outgoing_joined());
    }

    #[test]
    fn test_kubeconfig_secret_name_from_spec() {
        let mut fc = make_foreign_cluster("peer", None);
        fc.spec.kubeconfig_secret_name = Some("custom-kubeconfig".to_string());
        assert_eq!(fc.kubeconfig_secret_name(), "custom-kubeconfig");
    }

    #[test]
    fn test_kubeconfig_secret_name_fallback() {
        let fc = make_foreign_cluster("peer", None);
        assert_eq!(fc.kubeconfig_secret_name(), "peer-kubeconfig");
    }

    #[test]
    fn test_kubeconfig_secret_namespace_fallback() {
        let fc = make_foreign_cluster("peer", None);
        assert_eq!(fc.kubeconfig_secret_namespace(), "peersync-system");
    }

    #[test]
    fn test_tenant_namespace_requires_both_sides() {
        let fc = make_foreign_cluster(
            "peer",
            Some(ForeignClusterStatus {
                tenant_namespace: Some(TenantNamespace {
                    local: Some("tenant-peer".to_string()),
                    remote: None,
                }),
                ..Default::default()
            }),
        );
        assert!(fc.tenant_namespace().is_none());

        let fc = make_foreign_cluster(
            "peer",
            Some(ForeignClusterStatus {
                tenant_namespace: Some(TenantNamespace {
                    local: Some("tenant-peer".to_string()),
                    remote: Some("tenant-home".to_string()),
                }),
                ..Default::default()
            }),
        );
        assert_eq!(
            fc.tenant_namespace(),
            Some(("tenant-peer".to_string(), "tenant-home".to_string()))
        );
    }
}
