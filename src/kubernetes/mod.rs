// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, peer client creation, namespace
//! management, and untyped object reconciliation.

pub mod client;
pub mod crd;
pub mod namespaces;
pub mod objects;

pub use client::create_peer_client;
pub use crd::wait_for_foreign_cluster_crd;
pub use namespaces::ensure_namespace_exists;
