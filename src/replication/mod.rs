// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The multi-cluster resource replication engine.

pub mod engine;
pub mod handlers;
pub mod namespaces;
pub mod phase;
pub mod registry;
pub mod watchers;

pub use engine::ReplicationEngine;
pub use namespaces::NamespaceTranslator;
pub use phase::{is_replication_enabled, PeeringPhase, PhaseStore};
pub use registry::{Ownership, ReplicatedResource, ResourceRegistry, ResourceType};
