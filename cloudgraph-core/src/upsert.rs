//! Turns one decoded record into idempotent merges against a [`GraphStore`].
//!
//! At most two round trips per record: one node merge, one relationship batch.

use std::sync::Arc;

use tracing::debug;

use crate::contract::GraphStore;
use crate::error::UpsertError;
use crate::model::{Label, Relationship, RelationshipRow};
use crate::registry::DecodedRecord;

/// What one `upsert_entity` call wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub node_merged: bool,
    pub relationships_merged: usize,
}

pub struct GraphUpsertClient<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for GraphUpsertClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> GraphUpsertClient<S>
where
    S: GraphStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Merge `node` (labelled with all of `labels`, keyed by the first) and then
    /// the batch of `relationships`. A failing node merge skips the batch.
    pub async fn upsert_entity(
        &self,
        node: Option<&DecodedRecord>,
        relationships: Vec<Relationship>,
        labels: &[Label],
    ) -> Result<UpsertOutcome, UpsertError> {
        let mut outcome = UpsertOutcome::default();

        if let Some(record) = node {
            let key_label = labels.first().copied().unwrap_or(record.label);
            let mut label_names = vec![key_label.as_str().to_string()];
            label_names.extend(
                labels
                    .iter()
                    .skip(1)
                    .filter(|l| **l != key_label)
                    .map(|l| l.as_str().to_string()),
            );
            self.store
                .merge_node(&label_names, &record.identity, &record.properties)
                .await
                .map_err(|source| UpsertError::Node {
                    label: key_label,
                    identity: record.identity.clone(),
                    source,
                })?;
            outcome.node_merged = true;
            debug!(label = %key_label, identity = %record.identity, "[UPSERT] Node merged");
        }

        if relationships.is_empty() {
            return Ok(outcome);
        }

        let batch: Vec<RelationshipRow> = relationships
            .into_iter()
            .map(Relationship::into_row)
            .collect();
        let count = batch.len();
        self.store
            .merge_relationship_batch(&batch)
            .await
            .map_err(|source| UpsertError::Relationships { count, source })?;
        outcome.relationships_merged = count;
        debug!(count, "[UPSERT] Relationship batch merged");

        Ok(outcome)
    }
}
