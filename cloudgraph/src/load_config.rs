//! `load_config` module: reads the YAML run configuration and injects the
//! store password from the environment.
//!
//! The YAML file carries no secrets. The password comes from
//! [`PASSWORD_ENV`] (a `.env` file is loaded by `main` beforehand) and is
//! only demanded once a real store connection is made, so `--dry-run` runs
//! need neither a `store:` section nor credentials.
//!
//! # Errors
//! All errors are `anyhow::Error` with the offending path in the message, and
//! are surfaced at the CLI boundary.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use cloudgraph_core::{IngestConfig, StoreConfig};
use serde::Deserialize;
use tracing::{error, info, warn};

/// Environment variable holding the graph store password.
pub const PASSWORD_ENV: &str = "CLOUDGRAPH_STORE_PASSWORD";

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl CliConfig {
    /// Store settings for a live connection: `store:` present and password set.
    pub fn require_store(&self) -> Result<&StoreConfig> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| anyhow!("config has no `store` section"))?;
        if store.password.is_empty() {
            return Err(anyhow!(
                "no graph store password: set {PASSWORD_ENV} in the environment or .env"
            ));
        }
        Ok(store)
    }
}

/// Loads a static YAML config file (no secrets) and injects the password from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let mut config: CliConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML {:?}: {e}", path_ref)
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    if let Some(store) = config.store.as_mut() {
        match env::var(PASSWORD_ENV) {
            Ok(password) => store.password = password,
            Err(_) if store.password.is_empty() => {
                warn!(env = PASSWORD_ENV, "Graph store password not set in environment");
            }
            Err(_) => {}
        }
        store.trace_loaded();
    }
    config.ingest.trace_loaded();

    Ok(config)
}
