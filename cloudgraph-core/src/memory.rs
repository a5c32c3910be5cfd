//! In-process [`GraphStore`] with the same merge semantics as the Neo4j store.
//!
//! Each trait call takes the graph lock once, so every request is atomic with
//! respect to concurrent file tasks, like a store-side transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{GraphStore, ReconcileSummary};
use crate::error::StoreError;
use crate::model::{Properties, RelationshipRow, IDENTITY_PROPERTY};

type Handle = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub labels: BTreeSet<String>,
    pub properties: Properties,
}

impl StoredNode {
    pub fn identity(&self) -> Option<&str> {
        self.properties.get(IDENTITY_PROPERTY).and_then(Value::as_str)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredRelationship {
    source: Handle,
    target: Handle,
    relationship_type: String,
    properties: Properties,
}

#[derive(Debug, Default)]
struct Graph {
    next_handle: Handle,
    nodes: BTreeMap<Handle, StoredNode>,
    relationships: Vec<StoredRelationship>,
}

impl Graph {
    fn find(&self, label: &str, property: &str, value: &str) -> Option<Handle> {
        self.nodes
            .iter()
            .find(|(_, node)| {
                node.has_label(label)
                    && node.properties.get(property).and_then(Value::as_str) == Some(value)
            })
            .map(|(handle, _)| *handle)
    }

    fn create(&mut self, label: &str, property: &str, value: &str) -> Handle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let mut properties = Properties::new();
        properties.insert(property.to_string(), Value::String(value.to_string()));
        self.nodes.insert(
            handle,
            StoredNode {
                labels: BTreeSet::from([label.to_string()]),
                properties,
            },
        );
        handle
    }

    fn merge_endpoint(&mut self, label: &str, property: &str, value: &str) -> Handle {
        match self.find(label, property, value) {
            Some(handle) => handle,
            None => self.create(label, property, value),
        }
    }

    fn identity_groups(&self) -> Vec<Vec<Handle>> {
        let mut groups: BTreeMap<&str, Vec<Handle>> = BTreeMap::new();
        for (handle, node) in &self.nodes {
            if let Some(identity) = node.identity() {
                groups.entry(identity).or_default().push(*handle);
            }
        }
        groups.into_values().filter(|g| g.len() > 1).collect()
    }

    /// Fold `others` into `survivor`: union labels, keep existing property
    /// values, re-point edges.
    fn merge_into(&mut self, survivor: Handle, others: &[Handle]) {
        for other in others {
            let Some(node) = self.nodes.remove(other) else {
                continue;
            };
            if let Some(target) = self.nodes.get_mut(&survivor) {
                target.labels.extend(node.labels);
                for (key, value) in node.properties {
                    target.properties.entry(key).or_insert(value);
                }
            }
            for rel in &mut self.relationships {
                if rel.source == *other {
                    rel.source = survivor;
                }
                if rel.target == *other {
                    rel.target = survivor;
                }
            }
        }
    }

    /// Collapse edges that became parallel duplicates after re-pointing.
    fn collapse_parallel_edges(&mut self) {
        let mut kept: Vec<StoredRelationship> = Vec::with_capacity(self.relationships.len());
        for rel in self.relationships.drain(..) {
            match kept.iter_mut().find(|k| {
                k.source == rel.source
                    && k.target == rel.target
                    && k.relationship_type == rel.relationship_type
            }) {
                Some(existing) => {
                    for (key, value) in rel.properties {
                        existing.properties.entry(key).or_insert(value);
                    }
                }
                None => kept.push(rel),
            }
        }
        self.relationships = kept;
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    graph: Mutex<Graph>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node_count(&self) -> usize {
        self.graph().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph().relationships.len()
    }

    pub fn relationship_count_of_type(&self, relationship_type: &str) -> usize {
        self.graph()
            .relationships
            .iter()
            .filter(|r| r.relationship_type == relationship_type)
            .count()
    }

    /// Every node, of any label, whose identity is `identity`.
    pub fn nodes_with_identity(&self, identity: &str) -> Vec<StoredNode> {
        self.graph()
            .nodes
            .values()
            .filter(|n| n.identity() == Some(identity))
            .cloned()
            .collect()
    }

    pub fn nodes_with_label(&self, label: &str) -> Vec<StoredNode> {
        self.graph()
            .nodes
            .values()
            .filter(|n| n.has_label(label))
            .cloned()
            .collect()
    }

    /// Properties of the `relationship_type` edge between two identities, if present.
    pub fn relationship(
        &self,
        source_identity: &str,
        relationship_type: &str,
        target_identity: &str,
    ) -> Option<Properties> {
        let graph = self.graph();
        let identity_of = |h: &Handle| graph.nodes.get(h).and_then(StoredNode::identity);
        graph
            .relationships
            .iter()
            .find(|r| {
                r.relationship_type == relationship_type
                    && identity_of(&r.source) == Some(source_identity)
                    && identity_of(&r.target) == Some(target_identity)
            })
            .map(|r| r.properties.clone())
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn verify_connectivity(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn merge_node(
        &self,
        labels: &[String],
        identity: &str,
        properties: &Properties,
    ) -> Result<(), StoreError> {
        let key_label = labels
            .first()
            .ok_or_else(|| StoreError::InvalidRequest("node merge requires at least one label".into()))?;
        let mut graph = self.graph();
        let handle = graph.merge_endpoint(key_label, IDENTITY_PROPERTY, identity);
        if let Some(node) = graph.nodes.get_mut(&handle) {
            node.properties = properties.clone();
            node.properties.insert(
                IDENTITY_PROPERTY.to_string(),
                Value::String(identity.to_string()),
            );
            node.labels.extend(labels.iter().cloned());
        }
        Ok(())
    }

    async fn merge_relationship_batch(&self, batch: &[RelationshipRow]) -> Result<(), StoreError> {
        let mut graph = self.graph();
        for row in batch {
            let source = graph.merge_endpoint(&row.source_label, &row.source_property, &row.source_value);
            let target = graph.merge_endpoint(&row.target_label, &row.target_property, &row.target_value);
            let existing = graph.relationships.iter_mut().find(|r| {
                r.source == source && r.target == target && r.relationship_type == row.relationship_type
            });
            match existing {
                Some(rel) => rel.properties = row.properties.clone(),
                None => graph.relationships.push(StoredRelationship {
                    source,
                    target,
                    relationship_type: row.relationship_type.clone(),
                    properties: row.properties.clone(),
                }),
            }
        }
        Ok(())
    }

    async fn reconcile_duplicate_identities(&self) -> Result<ReconcileSummary, StoreError> {
        let mut graph = self.graph();
        let mut summary = ReconcileSummary::default();
        for group in graph.identity_groups() {
            let (survivor, others) = group.split_first().map(|(s, o)| (*s, o.to_vec())).unwrap_or_default();
            graph.merge_into(survivor, &others);
            summary.groups_merged += 1;
            summary.nodes_removed += others.len() as u64;
        }
        if summary.groups_merged > 0 {
            graph.collapse_parallel_edges();
        }
        Ok(summary)
    }
}
