//! Record stream processor: one entity file, line by line, strictly in order.
//!
//! Reading is plain synchronous I/O; the only suspension points are the store
//! round trips. Bad lines and failed writes are logged and counted, never fatal.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::contract::GraphStore;
use crate::error::{RecordParseError, StreamError};
use crate::model::Label;
use crate::registry::RegistryEntry;
use crate::upsert::GraphUpsertClient;

/// Per-file counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub label: Label,
    pub lines: usize,
    pub blank_lines: usize,
    pub records: usize,
    pub parse_errors: usize,
    pub derive_errors: usize,
    pub upsert_errors: usize,
    pub nodes_upserted: usize,
    pub relationships_upserted: usize,
}

impl FileReport {
    fn new(path: &Path, label: Label) -> Self {
        Self {
            path: path.to_path_buf(),
            label,
            lines: 0,
            blank_lines: 0,
            records: 0,
            parse_errors: 0,
            derive_errors: 0,
            upsert_errors: 0,
            nodes_upserted: 0,
            relationships_upserted: 0,
        }
    }
}

/// Stream `path` through `entry`'s decoder into the store.
///
/// Returns `Err` only when the file cannot be read at all, or on cancellation.
pub async fn process_file<S>(
    path: &Path,
    entry: &RegistryEntry,
    client: &GraphUpsertClient<S>,
    cancel: &CancellationToken,
) -> Result<FileReport, StreamError>
where
    S: GraphStore + ?Sized,
{
    let file = File::open(path).map_err(|source| StreamError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let labels = entry.labels();
    let mut report = FileReport::new(path, entry.label);
    info!(path = %path.display(), label = %entry.label, "[STREAM] Processing entity file");

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled(path.to_path_buf()));
        }
        report.lines += 1;

        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                error!(path = %path.display(), line = line_no, error = %e, "[STREAM] Skipping undecodable line");
                report.parse_errors += 1;
                continue;
            }
            Err(source) => {
                return Err(StreamError::Read {
                    path: path.to_path_buf(),
                    line: line_no,
                    source,
                })
            }
        };
        if line.trim().is_empty() {
            report.blank_lines += 1;
            continue;
        }

        let record = match entry.decode(&line) {
            Ok(record) => record,
            Err(source) => {
                let err = RecordParseError {
                    path: path.to_path_buf(),
                    line: line_no,
                    source,
                };
                error!(error = %err, "[STREAM] Skipping malformed record");
                report.parse_errors += 1;
                continue;
            }
        };
        report.records += 1;

        let relationships = match record.entity.relationships() {
            Ok(relationships) => relationships,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = line_no,
                    identity = %record.identity,
                    error = %e,
                    "[STREAM] Could not derive relationships, writing node only"
                );
                report.derive_errors += 1;
                Vec::new()
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled(path.to_path_buf())),
            result = client.upsert_entity(Some(&record), relationships, &labels) => result,
        };
        match result {
            Ok(outcome) => {
                if outcome.node_merged {
                    report.nodes_upserted += 1;
                }
                report.relationships_upserted += outcome.relationships_merged;
            }
            Err(e) => {
                error!(path = %path.display(), line = line_no, error = %e, "[UPSERT] Record write failed, continuing");
                report.upsert_errors += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        records = report.records,
        parse_errors = report.parse_errors,
        upsert_errors = report.upsert_errors,
        "[STREAM] Finished entity file"
    );
    Ok(report)
}
