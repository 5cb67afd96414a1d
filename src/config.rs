// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of the home cluster, stamped as origin on every replicated copy
    pub cluster_id: String,
    /// How often the foreign-cluster reconciler re-evaluates watcher eligibility
    pub resync_period_secs: u64,
    /// Optional YAML file overriding the built-in replication table
    pub resources_file: Option<PathBuf>,
    pub testing_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let cluster_id =
            env::var("CLUSTER_ID").context("CLUSTER_ID environment variable not set")?;
        let resync_period_secs: u64 = env::var("RESYNC_PERIOD_SECS")
            .unwrap_or("30".to_string())
            .parse()
            .unwrap_or(30);
        let resources_file = env::var("RESOURCES_FILE").ok().map(PathBuf::from);
        // For testing, uses the KUBECONFIG env var to create peer clients instead of fetching kubeconfig from secrets
        let testing_mode: bool = env::var("TESTING_MODE")
            .unwrap_or("false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(Config {
            cluster_id,
            resync_period_secs,
            resources_file,
            testing_mode,
        })
    }
}
