// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The table of resource types eligible for replication.

use crate::error::{PeersyncError, Result};
use crate::replication::phase::PeeringPhase;
use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// (group, version, resource) identity of a replicated type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. "networkconfigs"
    pub resource: String,
    pub kind: String,
}

impl ResourceType {
    pub fn new(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Stable identifier used as the watcher-table key
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.group, self.version, self.resource)
    }

    pub fn api_resource(&self) -> ApiResource {
        let api_version = if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        };
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version,
            kind: self.kind.clone(),
            plural: self.resource.clone(),
        }
    }
}

/// Which side is authoritative for spec vs. status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    /// Home cluster owns spec and status; both flow outward only
    Local,
    /// Home cluster owns spec; the remote cluster mutates status, which flows back
    Shared,
}

/// One entry of the replication table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedResource {
    pub resource: ResourceType,
    /// Minimum peering relationship required for replication to be active
    pub peering_phase: PeeringPhase,
    pub ownership: Ownership,
}

/// Outcome of a registry reload, diffed by full entry identity
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    pub added: Vec<ReplicatedResource>,
    pub removed: Vec<ReplicatedResource>,
}

/// Current set of replicable resource types. The set is replaced wholesale
/// on reload; entries themselves are never mutated.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<ReplicatedResource>,
}

impl ResourceRegistry {
    pub fn new(resources: Vec<ReplicatedResource>) -> Self {
        Self { resources }
    }

    pub fn snapshot(&self) -> Vec<ReplicatedResource> {
        self.resources.clone()
    }

    /// Swap in a new table and report what changed. Identity is the whole
    /// (type, gate, ownership) triple, so a changed gate or ownership for
    /// the same type shows up as remove+add.
    pub fn reload(&mut self, next: Vec<ReplicatedResource>) -> RegistryDiff {
        let removed = self
            .resources
            .iter()
            .filter(|r| !next.contains(r))
            .cloned()
            .collect();
        let added = next
            .iter()
            .filter(|r| !self.resources.contains(r))
            .cloned()
            .collect();
        self.resources = next;
        RegistryDiff { added, removed }
    }
}

/// Built-in replication table used when no RESOURCES_FILE is configured
pub fn default_resources() -> Vec<ReplicatedResource> {
    vec![
        ReplicatedResource {
            resource: ResourceType::new(
                "sharing.geeko.me",
                "v1alpha1",
                "resourcerequests",
                "ResourceRequest",
            ),
            peering_phase: PeeringPhase::Authenticated,
            ownership: Ownership::Shared,
        },
        ReplicatedResource {
            resource: ResourceType::new(
                "sharing.geeko.me",
                "v1alpha1",
                "resourceoffers",
                "ResourceOffer",
            ),
            peering_phase: PeeringPhase::Incoming,
            ownership: Ownership::Shared,
        },
        ReplicatedResource {
            resource: ResourceType::new(
                "net.geeko.me",
                "v1alpha1",
                "networkconfigs",
                "NetworkConfig",
            ),
            peering_phase: PeeringPhase::Established,
            ownership: Ownership::Shared,
        },
    ]
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    resource: ResourceType,
    peering_phase: String,
    ownership: String,
}

/// Load the replication table from a YAML file.
///
/// Malformed entries fail closed: an unknown gate keeps the entry but pins
/// it to the never-enabling `None` gate, an unknown ownership drops the
/// entry entirely. Neither aborts the load.
pub fn load_from_file(path: &Path) -> Result<Vec<ReplicatedResource>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        PeersyncError::RegistryError(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_resources(&raw)
}

fn parse_resources(raw: &str) -> Result<Vec<ReplicatedResource>> {
    let entries: Vec<RawEntry> = serde_yaml::from_str(raw)
        .map_err(|e| PeersyncError::RegistryError(format!("invalid replication table: {}", e)))?;

    let mut resources = Vec::with_capacity(entries.len());
    for entry in entries {
        let peering_phase = match PeeringPhase::parse(&entry.peering_phase) {
            Some(p) => p,
            None => {
                warn!(
                    "Unknown peering phase gate '{}' for {}, replication disabled for this entry",
                    entry.peering_phase,
                    entry.resource.id()
                );
                PeeringPhase::None
            }
        };
        let ownership = match entry.ownership.as_str() {
            "Local" => Ownership::Local,
            "Shared" => Ownership::Shared,
            other => {
                warn!(
                    "Unknown ownership '{}' for {}, skipping entry",
                    other,
                    entry.resource.id()
                );
                continue;
            }
        };
        resources.push(ReplicatedResource {
            resource: entry.resource,
            peering_phase,
            ownership,
        });
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_config(gate: PeeringPhase, ownership: Ownership) -> ReplicatedResource {
        ReplicatedResource {
            resource: ResourceType::new(
                "net.geeko.me",
                "v1alpha1",
                "networkconfigs",
                "NetworkConfig",
            ),
            peering_phase: gate,
            ownership,
        }
    }

    fn resource_offer() -> ReplicatedResource {
        ReplicatedResource {
            resource: ResourceType::new(
                "sharing.geeko.me",
                "v1alpha1",
                "resourceoffers",
                "ResourceOffer",
            ),
            peering_phase: PeeringPhase::Incoming,
            ownership: Ownership::Shared,
        }
    }

    #[test]
    fn test_resource_type_id() {
        let rt = ResourceType::new("net.geeko.me", "v1alpha1", "networkconfigs", "NetworkConfig");
        assert_eq!(rt.id(), "net.geeko.me/v1alpha1/networkconfigs");
    }

    #[test]
    fn test_api_resource_grouped() {
        let ar = ResourceType::new("net.geeko.me", "v1alpha1", "networkconfigs", "NetworkConfig")
            .api_resource();
        assert_eq!(ar.api_version, "net.geeko.me/v1alpha1");
        assert_eq!(ar.plural, "networkconfigs");
        assert_eq!(ar.kind, "NetworkConfig");
    }

    #[test]
    fn test_api_resource_core_group() {
        let ar = ResourceType::new("", "v1", "configmaps", "ConfigMap").api_resource();
        assert_eq!(ar.api_version, "v1");
    }

    #[test]
    fn test_reload_diff() {
        let mut registry = ResourceRegistry::new(vec![
            network_config(PeeringPhase::Established, Ownership::Shared),
            resource_offer(),
        ]);

        let next = vec![network_config(PeeringPhase::Established, Ownership::Shared)];
        let diff = registry.reload(next.clone());

        assert_eq!(diff.removed, vec![resource_offer()]);
        assert!(diff.added.is_empty());
        assert_eq!(registry.snapshot(), next);
    }

    #[test]
    fn test_reload_unchanged_is_empty_diff() {
        let current = vec![network_config(PeeringPhase::Established, Ownership::Shared)];
        let mut registry = ResourceRegistry::new(current.clone());
        let diff = registry.reload(current);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_reload_ownership_change_is_remove_plus_add() {
        let mut registry =
            ResourceRegistry::new(vec![network_config(PeeringPhase::Established, Ownership::Shared)]);

        let diff = registry.reload(vec![network_config(
            PeeringPhase::Established,
            Ownership::Local,
        )]);

        assert_eq!(
            diff.removed,
            vec![network_config(PeeringPhase::Established, Ownership::Shared)]
        );
        assert_eq!(
            diff.added,
            vec![network_config(PeeringPhase::Established, Ownership::Local)]
        );
    }

    #[test]
    fn test_parse_resources() {
        let raw = r#"
- resource:
    group: net.geeko.me
    version: v1alpha1
    resource: networkconfigs
    kind: NetworkConfig
  peeringPhase: Established
  ownership: Shared
"#;
        let resources = parse_resources(raw).unwrap();
        assert_eq!(
            resources,
            vec![network_config(PeeringPhase::Established, Ownership::Shared)]
        );
    }

    #[test]
    fn test_parse_unknown_gate_fails_closed() {
        let raw = r#"
- resource:
    group: net.geeko.me
    version: v1alpha1
    resource: networkconfigs
    kind: NetworkConfig
  peeringPhase: Sideways
  ownership: Shared
"#;
        let resources = parse_resources(raw).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].peering_phase, PeeringPhase::None);
    }

    #[test]
    fn test_parse_unknown_ownership_skips_entry() {
        let raw = r#"
- resource:
    group: net.geeko.me
    version: v1alpha1
    resource: networkconfigs
    kind: NetworkConfig
  peeringPhase: Established
  ownership: Borrowed
"#;
        let resources = parse_resources(raw).unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml_is_error() {
        assert!(parse_resources("not: [valid").is_err());
    }

    #[test]
    fn test_default_resources_have_distinct_types() {
        let defaults = default_resources();
        let mut ids: Vec<String> = defaults.iter().map(|r| r.resource.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), defaults.len());
    }
}
