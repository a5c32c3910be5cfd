//! # contract: the graph store boundary
//!
//! This module defines the single trait ([`GraphStore`]) the pipeline writes
//! through, plus the summary type returned by reconciliation.
//!
//! ## Interface & Extensibility
//! - Implement [`GraphStore`] for a new backend. [`crate::neo4j::Neo4jHttpStore`]
//!   talks to Neo4j over HTTP, [`crate::memory::InMemoryGraphStore`] keeps the
//!   graph in process.
//! - Every write is an idempotent merge. Concurrent file tasks may touch the same
//!   identities; implementations must make each request atomic, since the
//!   pipeline holds no locks of its own.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests can script store behaviour
//!   (`MockGraphStore`), including failures.

use async_trait::async_trait;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::error::StoreError;
use crate::model::{Properties, RelationshipRow};

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileSummary {
    /// Identity values that were held by more than one node.
    pub groups_merged: u64,
    /// Nodes folded into a survivor and removed.
    pub nodes_removed: u64,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Round trip proving the store is reachable and accepts our credentials.
    async fn verify_connectivity(&self) -> Result<(), StoreError>;

    /// Create-or-update the node identified by its first label and `identity`,
    /// replace its properties, and make sure it carries every label in `labels`.
    async fn merge_node(
        &self,
        labels: &[String],
        identity: &str,
        properties: &Properties,
    ) -> Result<(), StoreError>;

    /// Merge both endpoints of every row by (label, property, value) and the
    /// typed edge between them, in a single request.
    async fn merge_relationship_batch(&self, batch: &[RelationshipRow]) -> Result<(), StoreError>;

    /// Collapse nodes sharing an identity value into one node carrying the
    /// union of their labels, existing property values preferred, edges re-pointed.
    async fn reconcile_duplicate_identities(&self) -> Result<ReconcileSummary, StoreError>;
}
