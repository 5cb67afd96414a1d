// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeersyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Conflict retries exhausted for {0}")]
    ConflictRetriesExhausted(String),

    #[error("Malformed object: {0}")]
    MalformedObject(String),

    #[error("Namespace creation failed: {0}")]
    NamespaceError(String),

    #[error("Invalid replication table: {0}")]
    RegistryError(String),
}

pub type Result<T> = std::result::Result<T, PeersyncError>;
