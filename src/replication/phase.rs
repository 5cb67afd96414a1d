// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Peering phases and the per-cluster phase store.
//!
//! The same enum serves two roles: the current phase of a peering
//! relationship, and the minimum-phase gate a replicated resource declares.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeeringPhase {
    /// No peering relationship
    None,
    /// Gate only: replication is always active
    Any,
    /// Credentials exchanged, no join in either direction yet
    Authenticated,
    /// The remote cluster consumes resources from the home cluster
    Incoming,
    /// The home cluster consumes resources from the remote cluster
    Outgoing,
    /// Both directions joined
    Bidirectional,
    /// Gate only: at least one direction joined
    Established,
}

impl PeeringPhase {
    /// Derive the phase from a foreign cluster's join flags
    pub fn from_join_status(incoming_joined: bool, outgoing_joined: bool) -> Self {
        match (incoming_joined, outgoing_joined) {
            (true, true) => PeeringPhase::Bidirectional,
            (true, false) => PeeringPhase::Incoming,
            (false, true) => PeeringPhase::Outgoing,
            (false, false) => PeeringPhase::None,
        }
    }

    /// Parse a gate value from the replication table. Returns `None` for
    /// unknown strings so callers can fail closed.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "None" => Some(PeeringPhase::None),
            "Any" => Some(PeeringPhase::Any),
            "Authenticated" => Some(PeeringPhase::Authenticated),
            "Incoming" => Some(PeeringPhase::Incoming),
            "Outgoing" => Some(PeeringPhase::Outgoing),
            "Bidirectional" => Some(PeeringPhase::Bidirectional),
            "Established" => Some(PeeringPhase::Established),
            _ => None,
        }
    }
}

impl fmt::Display for PeeringPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether a resource gated at `gate` replicates toward a cluster currently
/// in `phase`. Bidirectional satisfies every gate Incoming or Outgoing alone
/// satisfies.
pub fn is_replication_enabled(phase: PeeringPhase, gate: PeeringPhase) -> bool {
    match gate {
        PeeringPhase::None => false,
        PeeringPhase::Any => true,
        PeeringPhase::Authenticated => phase != PeeringPhase::None,
        PeeringPhase::Incoming => {
            matches!(phase, PeeringPhase::Bidirectional | PeeringPhase::Incoming)
        }
        PeeringPhase::Outgoing => {
            matches!(phase, PeeringPhase::Bidirectional | PeeringPhase::Outgoing)
        }
        PeeringPhase::Established => matches!(
            phase,
            PeeringPhase::Bidirectional | PeeringPhase::Incoming | PeeringPhase::Outgoing
        ),
        PeeringPhase::Bidirectional => phase == PeeringPhase::Bidirectional,
    }
}

/// Current peering phase per remote cluster, behind a dedicated lock.
/// Unknown clusters read as `None`; the foreign-cluster reconciler is the
/// only writer.
#[derive(Default)]
pub struct PhaseStore {
    phases: RwLock<HashMap<String, PeeringPhase>>,
}

impl PhaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, cluster_id: &str) -> PeeringPhase {
        self.phases
            .read()
            .await
            .get(cluster_id)
            .copied()
            .unwrap_or(PeeringPhase::None)
    }

    pub async fn set(&self, cluster_id: &str, phase: PeeringPhase) {
        self.phases
            .write()
            .await
            .insert(cluster_id.to_string(), phase);
    }

    pub async fn remove(&self, cluster_id: &str) {
        self.phases.write().await.remove(cluster_id);
    }
}
