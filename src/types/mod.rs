// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types consumed by the replication engine.

pub mod foreign_cluster;

pub use foreign_cluster::ForeignCluster;
