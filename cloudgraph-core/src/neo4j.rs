//! Neo4j graph store over the transactional HTTP API.
//!
//! Every operation is a single `POST {uri}/db/{database}/tx/commit`, so each
//! request runs in its own auto-committed transaction. Neo4j reports Cypher
//! failures inside a `200 OK` body, so the `errors` array is always checked.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::contract::{GraphStore, ReconcileSummary};
use crate::error::StoreError;
use crate::model::{Properties, RelationshipRow, IDENTITY_PROPERTY};

#[derive(Debug, Serialize)]
struct Statement {
    statement: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: &'a [Statement],
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    code: String,
    message: String,
}

pub struct Neo4jHttpStore {
    client: reqwest::Client,
    commit_url: String,
    username: String,
    password: String,
}

impl Neo4jHttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let commit_url = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        info!(url = %commit_url, username = %config.username, "Initialized Neo4jHttpStore");
        Ok(Self {
            client,
            commit_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn commit(&self, statements: &[Statement]) -> Result<Vec<StatementResult>, StoreError> {
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&CommitRequest { statements })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, url = %self.commit_url, "Neo4j returned an error status");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: CommitResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if let Some(err) = body.errors.into_iter().next() {
            return Err(StoreError::Query {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.results)
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn verify_connectivity(&self) -> Result<(), StoreError> {
        let statement = Statement {
            statement: "RETURN 1".to_string(),
            parameters: json!({}),
        };
        self.commit(std::slice::from_ref(&statement)).await?;
        info!(url = %self.commit_url, "Neo4j connectivity verified");
        Ok(())
    }

    async fn merge_node(
        &self,
        labels: &[String],
        identity: &str,
        properties: &Properties,
    ) -> Result<(), StoreError> {
        let statement = Statement {
            statement: node_merge_cypher(labels)?,
            parameters: json!({ "identity": identity, "properties": properties }),
        };
        self.commit(std::slice::from_ref(&statement)).await?;
        Ok(())
    }

    async fn merge_relationship_batch(&self, batch: &[RelationshipRow]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let statements = relationship_batch_statements(batch)?;
        debug!(rows = batch.len(), statements = statements.len(), "Merging relationship batch");
        self.commit(&statements).await?;
        Ok(())
    }

    async fn reconcile_duplicate_identities(&self) -> Result<ReconcileSummary, StoreError> {
        let statement = Statement {
            statement: reconcile_cypher(),
            parameters: json!({}),
        };
        let results = self.commit(std::slice::from_ref(&statement)).await?;
        let row = results
            .into_iter()
            .next()
            .and_then(|r| r.data.into_iter().next())
            .map(|r| r.row)
            .unwrap_or_default();
        let count = |i: usize| row.get(i).and_then(Value::as_u64).unwrap_or(0);
        Ok(ReconcileSummary {
            groups_merged: count(0),
            nodes_removed: count(1),
        })
    }
}

/// Backtick-quoted Cypher identifier.
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn label_list(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| escape_identifier(l))
        .collect::<Vec<_>>()
        .join(":")
}

fn node_merge_cypher(labels: &[String]) -> Result<String, StoreError> {
    let key_label = labels
        .first()
        .ok_or_else(|| StoreError::InvalidRequest("node merge requires at least one label".into()))?;
    let id = escape_identifier(IDENTITY_PROPERTY);
    Ok(format!(
        "MERGE (n:{key} {{{id}: $identity}})\nSET n = $properties, n.{id} = $identity\nSET n:{all}",
        key = escape_identifier(key_label),
        all = label_list(labels),
    ))
}

/// One `UNWIND` statement per distinct (labels, properties, type) shape,
/// since labels and relationship types cannot be parameterised.
fn relationship_batch_statements(batch: &[RelationshipRow]) -> Result<Vec<Statement>, StoreError> {
    let mut groups: BTreeMap<(&str, &str, &str, &str, &str), Vec<&RelationshipRow>> =
        BTreeMap::new();
    for row in batch {
        groups
            .entry((
                row.source_label.as_str(),
                row.source_property.as_str(),
                row.target_label.as_str(),
                row.target_property.as_str(),
                row.relationship_type.as_str(),
            ))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((source_label, source_property, target_label, target_property, rel_type), rows)| {
            let statement = format!(
                "UNWIND $rows AS row\n\
                 MERGE (s:{sl} {{{sp}: row.sourceValue}})\n\
                 MERGE (t:{tl} {{{tp}: row.targetValue}})\n\
                 MERGE (s)-[r:{rt}]->(t)\n\
                 SET r = row.properties",
                sl = escape_identifier(source_label),
                sp = escape_identifier(source_property),
                tl = escape_identifier(target_label),
                tp = escape_identifier(target_property),
                rt = escape_identifier(rel_type),
            );
            let rows = serde_json::to_value(rows)
                .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
            Ok(Statement {
                statement,
                parameters: json!({ "rows": rows }),
            })
        })
        .collect()
}

fn reconcile_cypher() -> String {
    let id = escape_identifier(IDENTITY_PROPERTY);
    format!(
        "MATCH (n) WHERE n.{id} IS NOT NULL\n\
         WITH n.{id} AS identity, collect(n) AS nodes\n\
         WHERE size(nodes) > 1\n\
         WITH nodes, size(nodes) - 1 AS removed\n\
         CALL apoc.refactor.mergeNodes(nodes, {{properties: \"discard\", mergeRels: true}}) YIELD node\n\
         RETURN count(node) AS groups, coalesce(sum(removed), 0) AS removed"
    )
}
