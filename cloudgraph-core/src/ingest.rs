//! High-level pipeline: orchestrates stage → stream → reconcile for one bundle.
//!
//! [`ingest`] runs a whole import:
//!   - Checks the label filter and store connectivity before touching the bundle
//!   - Stages the zip bundle into a private temp directory
//!   - Spawns one task per recognised entity file, at most
//!     `max_concurrent_files` running at once
//!   - Waits for every task, then merges duplicate identities
//!   - Releases the staging directory
//!
//! # Failure model
//! Record-level problems are counted in each [`FileReport`]. A file task that
//! fails or panics is recorded in [`IngestReport::failed_files`] and the other
//! tasks carry on. Everything in [`IngestError`] is terminal.
//!
//! # Interruption
//! The caller's [`CancellationToken`] and the optional `timeout` both stop the
//! run. In-flight tasks are cancelled and drained before the single terminal
//! error is returned; reconciliation never starts on a partial import.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::archive::{self, StagedBundle};
use crate::config::IngestConfig;
use crate::contract::{GraphStore, ReconcileSummary};
use crate::error::{IngestError, StreamError};
use crate::model::Label;
use crate::reconcile::reconcile;
use crate::registry::{RegistryEntry, SchemaRegistry};
use crate::stream::{process_file, FileReport};
use crate::upsert::GraphUpsertClient;

/// A file whose task did not produce a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub label: Label,
    pub error: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    pub failed_files: Vec<FailedFile>,
    /// Top-level staged entries that matched no registered label, or were filtered out.
    pub ignored_files: Vec<PathBuf>,
    pub reconciliation: ReconcileSummary,
}

impl IngestReport {
    pub fn records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }

    pub fn nodes_upserted(&self) -> usize {
        self.files.iter().map(|f| f.nodes_upserted).sum()
    }

    pub fn relationships_upserted(&self) -> usize {
        self.files.iter().map(|f| f.relationships_upserted).sum()
    }

    pub fn parse_errors(&self) -> usize {
        self.files.iter().map(|f| f.parse_errors).sum()
    }

    pub fn derive_errors(&self) -> usize {
        self.files.iter().map(|f| f.derive_errors).sum()
    }

    pub fn upsert_errors(&self) -> usize {
        self.files.iter().map(|f| f.upsert_errors).sum()
    }

    /// True when every file was processed and every record landed.
    pub fn is_clean(&self) -> bool {
        self.failed_files.is_empty()
            && self.parse_errors() == 0
            && self.derive_errors() == 0
            && self.upsert_errors() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    after: Duration,
}

/// Resolves when the run must stop, yielding the terminal error.
async fn stopped(cancel: &CancellationToken, deadline: Option<Deadline>) -> IngestError {
    let expired = async {
        match deadline {
            Some(d) => {
                tokio::time::sleep_until(d.at).await;
                d.after
            }
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => IngestError::Cancelled,
        after = expired => IngestError::TimedOut(after),
    }
}

/// Run `fut` unless the run is stopped first. The future is dropped on stop.
async fn guarded<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Deadline>,
) -> Result<F::Output, IngestError> {
    tokio::select! {
        biased;
        err = stopped(cancel, deadline) => Err(err),
        out = fut => Ok(out),
    }
}

/// Ingest the bundle at `bundle` into `store`.
pub async fn ingest<S>(
    config: &IngestConfig,
    registry: Arc<SchemaRegistry>,
    store: Arc<S>,
    bundle: &Path,
    cancel: CancellationToken,
) -> Result<IngestReport, IngestError>
where
    S: GraphStore + ?Sized + 'static,
{
    info!(bundle = %bundle.display(), "[INGEST] Starting ingestion");
    let deadline = config.timeout.map(|after| Deadline {
        at: Instant::now() + after,
        after,
    });

    let selected = select_labels(&registry, &config.labels)?;

    guarded(store.verify_connectivity(), &cancel, deadline)
        .await?
        .map_err(|e| {
            error!(error = %e, "[INGEST][ERROR] Graph store is unreachable");
            IngestError::Connectivity(e)
        })?;
    info!("[INGEST] Graph store reachable");

    let staged = archive::stage(bundle)?;
    let (work, ignored_files) = match plan(&registry, &staged, &selected) {
        Ok(planned) => planned,
        Err(e) => {
            release(staged);
            return Err(e);
        }
    };
    info!(
        files = work.len(),
        ignored = ignored_files.len(),
        max_concurrent_files = config.max_concurrent_files.max(1),
        "[INGEST] Planned file tasks"
    );

    let (files, failed_files) = match run_tasks(config, work, &store, &cancel, deadline).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "[INGEST] Run interrupted, file tasks drained");
            release(staged);
            return Err(e);
        }
    };

    let reconciled = guarded(reconcile(store.as_ref()), &cancel, deadline).await;
    release(staged);
    let reconciliation = reconciled?.map_err(IngestError::Reconciliation)?;

    let report = IngestReport {
        files,
        failed_files,
        ignored_files,
        reconciliation,
    };
    info!(
        files = report.files.len(),
        failed_files = report.failed_files.len(),
        records = report.records(),
        nodes = report.nodes_upserted(),
        relationships = report.relationships_upserted(),
        "[INGEST] Ingestion complete"
    );
    Ok(report)
}

/// Labels to ingest. An empty filter selects every registered label.
fn select_labels(
    registry: &SchemaRegistry,
    filter: &[String],
) -> Result<BTreeSet<Label>, IngestError> {
    if filter.is_empty() {
        return Ok(registry.entries().map(|e| e.label).collect());
    }
    filter
        .iter()
        .map(|name| registry.resolve(name).map(|e| e.label))
        .collect::<Result<_, _>>()
        .map_err(|e| {
            error!(error = %e, "[INGEST][ERROR] Invalid label filter");
            IngestError::Registry(e)
        })
}

/// Match top-level staged files against the registry, in name order.
fn plan(
    registry: &SchemaRegistry,
    staged: &StagedBundle,
    selected: &BTreeSet<Label>,
) -> Result<(Vec<(PathBuf, RegistryEntry)>, Vec<PathBuf>), IngestError> {
    let staging_error = |source| IngestError::Staging {
        path: staged.path().to_path_buf(),
        source,
    };
    let mut paths = std::fs::read_dir(staged.path())
        .map_err(staging_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(staging_error)?;
    paths.sort();

    let mut work = Vec::new();
    let mut ignored = Vec::new();
    for path in paths {
        let entry = if path.is_file() {
            registry.match_file(&path)
        } else {
            None
        };
        match entry {
            Some(entry) if selected.contains(&entry.label) => work.push((path, *entry)),
            Some(entry) => {
                debug!(path = %path.display(), label = %entry.label, "[INGEST] Label not selected, skipping file");
                ignored.push(path);
            }
            None => {
                warn!(path = %path.display(), "[INGEST] No registered label for bundle entry, ignoring");
                ignored.push(path);
            }
        }
    }
    Ok((work, ignored))
}

async fn run_tasks<S>(
    config: &IngestConfig,
    work: Vec<(PathBuf, RegistryEntry)>,
    store: &Arc<S>,
    cancel: &CancellationToken,
    deadline: Option<Deadline>,
) -> Result<(Vec<FileReport>, Vec<FailedFile>), IngestError>
where
    S: GraphStore + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_files.max(1)));
    let tasks_cancel = cancel.child_token();
    let client = GraphUpsertClient::new(Arc::clone(store));

    let handles = work.into_iter().map(|(path, entry)| {
        let semaphore = Arc::clone(&semaphore);
        let task_cancel = tasks_cancel.clone();
        let client = client.clone();
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = task_cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return Err(StreamError::Cancelled(task_path));
            };
            process_file(&task_path, &entry, &client, &task_cancel).await
        });
        async move { (path, entry.label, handle.await) }
    });
    let mut joined = std::pin::pin!(join_all(handles));

    let mut stop: Option<IngestError> = None;
    let results = loop {
        tokio::select! {
            biased;
            results = &mut joined => break results,
            err = stopped(cancel, deadline), if stop.is_none() => {
                tasks_cancel.cancel();
                stop = Some(err);
            }
        }
    };
    if let Some(err) = stop {
        return Err(err);
    }

    let mut files = Vec::new();
    let mut failed = Vec::new();
    for (path, label, result) in results {
        let error = match result {
            Ok(Ok(report)) => {
                files.push(report);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("file task aborted: {e}"),
        };
        error!(path = %path.display(), label = %label, error = %error, "[INGEST][ERROR] File task failed");
        failed.push(FailedFile { path, label, error });
    }
    Ok((files, failed))
}

fn release(staged: StagedBundle) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.release() {
        warn!(path = %path.display(), error = %e, "[INGEST] Failed to remove staging directory");
    }
}
