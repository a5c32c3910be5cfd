use std::sync::Arc;

use cloudgraph_core::contract::MockGraphStore;
use cloudgraph_core::error::{StoreError, UpsertError};
use cloudgraph_core::model::{Label, Relationship, RelationshipType};
use cloudgraph_core::registry::SchemaRegistry;
use cloudgraph_core::upsert::GraphUpsertClient;

const GROUP_LINE: &str = r#"{"id":"AGPADEVS","arn":"arn:aws:iam::111111111111:group/devs","groupName":"devs","members":["AIDAALICE","AIDABOB"]}"#;

#[tokio::test]
async fn test_node_then_one_batch_for_all_relationships() {
    let registry = SchemaRegistry::standard().unwrap();
    let entry = registry.get(Label::Group).unwrap();
    let record = entry.decode(GROUP_LINE).unwrap();
    let relationships = record.entity.relationships().unwrap();
    assert_eq!(relationships.len(), 3);

    let mut store = MockGraphStore::new();
    store
        .expect_merge_node()
        .withf(|labels, identity, properties| {
            labels.len() == 2
                && labels[0] == "Group"
                && labels[1] == "Principal"
                && identity == "AGPADEVS"
                && !properties.contains_key("members")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    store
        .expect_merge_relationship_batch()
        .withf(|batch| {
            batch.len() == 3
                && batch
                    .iter()
                    .all(|row| row.source_property == "id" && row.target_property == "id")
        })
        .times(1)
        .returning(|_| Ok(()));

    let client = GraphUpsertClient::new(Arc::new(store));
    let outcome = client
        .upsert_entity(Some(&record), relationships, &entry.labels())
        .await
        .unwrap();

    assert!(outcome.node_merged);
    assert_eq!(outcome.relationships_merged, 3);
}

#[tokio::test]
async fn test_failed_node_merge_skips_relationships() {
    let registry = SchemaRegistry::standard().unwrap();
    let entry = registry.get(Label::Group).unwrap();
    let record = entry.decode(GROUP_LINE).unwrap();
    let relationships = record.entity.relationships().unwrap();

    let mut store = MockGraphStore::new();
    store
        .expect_merge_node()
        .times(1)
        .returning(|_, _, _| Err(StoreError::Decode("closed".into())));
    store.expect_merge_relationship_batch().times(0);

    let client = GraphUpsertClient::new(Arc::new(store));
    let result = client
        .upsert_entity(Some(&record), relationships, &entry.labels())
        .await;

    match result {
        Err(UpsertError::Node {
            label, identity, ..
        }) => {
            assert_eq!(label, Label::Group);
            assert_eq!(identity, "AGPADEVS");
        }
        other => panic!("expected node merge failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_relationships_without_node() {
    let mut store = MockGraphStore::new();
    store.expect_merge_node().times(0);
    store
        .expect_merge_relationship_batch()
        .withf(|batch| {
            batch.len() == 1
                && batch[0].relationship_type == "Trusts"
                && batch[0].source_label == "Role"
                && batch[0].target_value == "222222222222"
        })
        .times(1)
        .returning(|_| Ok(()));

    let client = GraphUpsertClient::new(Arc::new(store));
    let relationships = vec![Relationship::new(
        Label::Role,
        "AROAADMIN",
        RelationshipType::Trusts,
        Label::Account,
        "222222222222",
    )];
    let outcome = client
        .upsert_entity(None, relationships, &[])
        .await
        .unwrap();

    assert!(!outcome.node_merged);
    assert_eq!(outcome.relationships_merged, 1);
}

#[tokio::test]
async fn test_failed_batch_reports_its_size() {
    let mut store = MockGraphStore::new();
    store
        .expect_merge_relationship_batch()
        .returning(|_| Err(StoreError::Status {
            status: 503,
            body: "unavailable".into(),
        }));

    let client = GraphUpsertClient::new(Arc::new(store));
    let relationships = vec![
        Relationship::new(Label::User, "u1", RelationshipType::Owns, Label::Application, "app"),
        Relationship::new(Label::User, "u2", RelationshipType::Owns, Label::Application, "app"),
    ];
    let result = client.upsert_entity(None, relationships, &[]).await;

    assert!(matches!(
        result,
        Err(UpsertError::Relationships { count: 2, .. })
    ));
}
