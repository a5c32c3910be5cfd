//! Error types for cloudgraph-core.
//!
//! Record-level errors ([`RecordParseError`], [`DeriveError`], [`UpsertError`]) are
//! recovered by the stream processor: logged, counted, and the stream moves on.
//! Run-level errors ([`IngestError`]) abort the whole ingestion.

use std::path::PathBuf;

use crate::model::Label;

/// Failure while staging the input bundle.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open bundle {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle {path} is not a readable archive: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to read archive entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry {name:?} escapes the staging directory")]
    UnsafeEntry { name: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create staging directory: {0}")]
    TempDir(#[source] std::io::Error),
}

/// Why a single line could not be turned into an entity.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{label} record has no identity value")]
    MissingIdentity { label: Label },

    #[error("{label} record does not serialize to a JSON object")]
    NotAnObject { label: Label },
}

/// A line of an entity file that failed to decode.
#[derive(Debug, thiserror::Error)]
#[error("{path}:{line}: {source}")]
pub struct RecordParseError {
    pub path: PathBuf,
    pub line: usize,
    #[source]
    pub source: DecodeError,
}

/// Malformed ARN-like identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArnError {
    #[error("{0:?} does not start with \"arn:\"")]
    NotAnArn(String),

    #[error("{input:?} is missing the {component} component")]
    MissingComponent {
        input: String,
        component: &'static str,
    },

    #[error("{input:?} has an invalid account id {account:?}")]
    InvalidAccountId { input: String, account: String },
}

/// Relationship derivation failed for an otherwise valid record.
#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("cannot derive owning account: {0}")]
    Arn(#[from] ArnError),

    #[error("{label} {identity} has no {field} to relate to")]
    MissingField {
        label: Label,
        identity: String,
        field: &'static str,
    },
}

/// Failure reported by, or while talking to, the graph store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("unexpected store response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A record's write to the store failed.
#[derive(Debug, thiserror::Error)]
pub enum UpsertError {
    #[error("node merge for {label} {identity} failed: {source}")]
    Node {
        label: Label,
        identity: String,
        #[source]
        source: StoreError,
    },

    #[error("relationship batch of {count} failed: {source}")]
    Relationships {
        count: usize,
        #[source]
        source: StoreError,
    },
}

/// Schema registry misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no entity type is registered for label {0:?}")]
    UnknownLabel(String),

    #[error("label {0} is registered twice")]
    DuplicateLabel(Label),

    #[error("file stem {0:?} is registered twice")]
    DuplicateFileStem(&'static str),
}

/// A whole entity file could not be streamed.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path} at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("processing of {0} was cancelled")]
    Cancelled(PathBuf),
}

/// Run-level failure. Any of these stops the ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Registry(#[from] RegistryError),

    #[error("graph store is unreachable: {0}")]
    Connectivity(#[source] StoreError),

    #[error("failed to stage bundle: {0}")]
    Archive(#[from] ArchiveError),

    #[error("failed to enumerate staged files in {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reconciliation failed, graph may be inconsistent: {0}")]
    Reconciliation(#[source] StoreError),

    #[error("ingestion was cancelled")]
    Cancelled,

    #[error("ingestion timed out after {0:?}")]
    TimedOut(std::time::Duration),
}
