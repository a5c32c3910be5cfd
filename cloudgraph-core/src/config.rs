use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_DATABASE: &str = "neo4j";
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;

/// Where the graph store lives and how to authenticate (basic auth).
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base HTTP URI, e.g. `http://localhost:7474`.
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, with = "optional_secs")]
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.uri)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl StoreConfig {
    pub fn trace_loaded(&self) {
        info!(
            uri = %self.uri,
            database = %self.database,
            username = %self.username,
            "Loaded StoreConfig"
        );
        debug!(?self, "StoreConfig loaded (full debug)");
    }
}

/// Run-level knobs for one ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Upper bound on file tasks running at once (and so on concurrent store requests).
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
    /// Deadline for the whole run, reconciliation included.
    #[serde(default, with = "optional_secs")]
    pub timeout: Option<Duration>,
    /// Only ingest these labels. Empty means every registered label.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            timeout: None,
            labels: Vec::new(),
        }
    }
}

impl IngestConfig {
    pub fn trace_loaded(&self) {
        info!(
            max_concurrent_files = self.max_concurrent_files,
            timeout = ?self.timeout,
            labels_count = self.labels.len(),
            "Loaded IngestConfig"
        );
        debug!(?self, "IngestConfig loaded (full debug)");
    }
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_max_concurrent_files() -> usize {
    DEFAULT_MAX_CONCURRENT_FILES
}

/// `Option<Duration>` as whole seconds.
mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
