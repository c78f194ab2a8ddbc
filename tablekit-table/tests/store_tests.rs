use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tablekit_model::{
    table_entity, DynamicEntity, ETag, EntityKeys, FixedValueSanitizer, PropertyValue,
    SanitizableKeys,
};
use tablekit_table::{
    ClientStats, ComparisonOp, Filter, InMemoryTableClient, OperationKind, TableConfig,
    TableStore,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
struct Item {
    keys: EntityKeys,
    etag: Option<ETag>,
    id: Uuid,
    quantity: i32,
}

table_entity!(Item {
    keys: keys,
    etag: etag,
    properties {
        "Id" => id,
        "Quantity" => quantity,
    }
});

impl Item {
    fn new(pk: &str, rk: &str) -> Self {
        Self {
            keys: EntityKeys::new(pk, rk),
            id: Uuid::new_v4(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Plain {
    pk: String,
    rk: String,
    note: String,
}

table_entity!(Plain {
    partition_key: pk,
    row_key: rk,
    properties {
        "Note" => note,
    }
});

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup(config: TableConfig) -> (Arc<InMemoryTableClient>, TableStore) {
    init_tracing();
    let client = Arc::new(InMemoryTableClient::from_config(&config));
    let store = TableStore::new(client.clone(), config).unwrap();
    store.create_table_if_not_exists().await.unwrap();
    (client, store)
}

async fn default_setup() -> (Arc<InMemoryTableClient>, TableStore) {
    setup(TableConfig::new("items")).await
}

// ── Construction ────────────────────────────────────────────────

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = TableConfig {
        max_batch_size: 500,
        ..TableConfig::new("items")
    };
    let client = Arc::new(InMemoryTableClient::new("items"));
    assert!(TableStore::new(client, config).is_err());
}

#[tokio::test]
async fn table_lifecycle() {
    let (_client, store) = default_setup().await;
    assert!(!store.create_table_if_not_exists().await.unwrap());
    assert!(store.delete_table_if_exists().await.unwrap());
    assert!(!store.delete_table_if_exists().await.unwrap());

    let err = store
        .insert_or_replace_one(&mut Item::new("p", "r"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ── Empty input ─────────────────────────────────────────────────

#[tokio::test]
async fn empty_writes_return_none_without_requests() {
    let (client, store) = default_setup().await;

    assert!(store.insert(&mut Vec::<Item>::new()).await.unwrap().is_none());
    assert!(store
        .insert_or_replace(&mut Vec::<Item>::new())
        .await
        .unwrap()
        .is_none());
    assert!(store.delete(&mut Vec::<Item>::new()).await.unwrap().is_none());

    assert_eq!(client.stats(), ClientStats::default());
}

// ── Batching ────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_insert_and_query_across_pages() {
    let (client, store) = default_setup().await;
    let mut items: Vec<Item> = (0..1250).map(|i| Item::new("bulk", &format!("{i:05}"))).collect();

    let results = store.insert(&mut items).await.unwrap().unwrap();
    assert_eq!(results.len(), 1250);
    assert_eq!(client.stats().batch_calls, 13);

    let found: Vec<Item> = store.query_by_partition("bulk").await.unwrap();
    assert_eq!(found.len(), 1250);
    assert_eq!(client.stats().query_calls, 2);

    let expected: HashMap<String, Uuid> = items
        .iter()
        .map(|i| (i.keys.row_key().to_string(), i.id))
        .collect();
    let actual: HashMap<String, Uuid> = found
        .iter()
        .map(|i| (i.keys.row_key().to_string(), i.id))
        .collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn batches_follow_partition_groups() {
    let (client, store) = setup(TableConfig {
        max_batch_size: 10,
        ..TableConfig::new("items")
    })
    .await;

    let mut items: Vec<Item> = (0..25)
        .map(|i| Item::new(if i % 2 == 0 { "even" } else { "odd" }, &i.to_string()))
        .collect();
    let results = store.insert_or_replace(&mut items).await.unwrap().unwrap();

    // even: 13 -> 10 + 3, odd: 12 -> 10 + 2
    assert_eq!(client.stats().batch_calls, 4);
    let partitions: Vec<&str> = results.iter().map(|r| r.partition_key.as_str()).collect();
    assert!(partitions[..13].iter().all(|pk| *pk == "even"));
    assert!(partitions[13..].iter().all(|pk| *pk == "odd"));
    assert!(results.iter().all(|r| r.kind == OperationKind::InsertOrReplace));
}

#[tokio::test]
async fn insert_merges_into_existing_entities() {
    let (client, store) = default_setup().await;
    let mut raw = vec![DynamicEntity::new("p", "r")
        .with_property("Color", "red")
        .with_property("Size", 4)];
    store.insert_or_replace(&mut raw).await.unwrap();

    let mut patch = vec![DynamicEntity::new("p", "r").with_property("Color", "blue")];
    store.insert(&mut patch).await.unwrap();

    let stored = client.get("p", "r").await.unwrap();
    assert_eq!(stored.get("Color").and_then(|v| v.as_str()), Some("blue"));
    assert!(stored.contains("Size"));

    store.insert_or_replace(&mut patch).await.unwrap();
    assert!(!client.get("p", "r").await.unwrap().contains("Size"));
}

#[tokio::test]
async fn committed_batches_are_not_rolled_back() {
    let (client, store) = default_setup().await;
    let mut raw = vec![
        DynamicEntity::new("good", "1"),
        DynamicEntity::new("good", "2"),
        DynamicEntity::new("bad#", "1"),
        DynamicEntity::new("later", "1"),
    ];

    let err = store.insert(&mut raw).await.unwrap_err();
    assert_eq!(err.service_error().unwrap().status, 400);

    assert_eq!(client.len().await, 2);
    assert!(client.get("later", "1").await.is_none());
    assert_eq!(client.stats().batch_calls, 2);
}

// ── Sanitization ────────────────────────────────────────────────

#[tokio::test]
async fn sanitizing_write_keeps_shadow_keys() {
    let (client, store) = default_setup().await;
    let mut item = Item::new("#partition#", "%row%");

    store.insert_or_replace_one(&mut item).await.unwrap();

    let stored = client.get("partition", "row").await.unwrap();
    assert_eq!(stored.partition_key(), "partition");
    assert_eq!(stored.row_key(), "row");

    assert_eq!(item.keys.partition_key(), "partition");
    assert_eq!(item.keys.row_key(), "row");
    assert_eq!(item.keys.unsanitized_partition_key(), "#partition#");
    assert_eq!(item.keys.unsanitized_row_key(), "%row%");
}

#[tokio::test]
async fn bulk_writes_sanitize_every_entity() {
    let (client, store) = default_setup().await;
    let mut items = vec![Item::new("a/b", "1?"), Item::new("a/b", "2\\")];

    store.insert(&mut items).await.unwrap();

    assert!(client.get("ab", "1").await.is_some());
    assert!(client.get("ab", "2").await.is_some());
    assert!(items.iter().all(|i| i.keys.is_sanitized()));
}

#[tokio::test]
async fn delete_sanitizes_keys_like_writes() {
    let (client, store) = default_setup().await;
    store.insert(&mut [Item::new("#p#", "%r%")]).await.unwrap();
    assert_eq!(client.len().await, 1);

    let mut fresh = [Item::new("#p#", "%r%")];
    let results = store.delete(&mut fresh).await.unwrap().unwrap();

    assert_eq!(results[0].partition_key, "p");
    assert_eq!(results[0].row_key, "r");
    assert!(client.is_empty().await);
    assert_eq!(fresh[0].keys.unsanitized_partition_key(), "#p#");
}

#[tokio::test]
async fn injected_sanitizer_is_used() {
    let (client, store) = default_setup().await;
    let store = store.with_sanitizer(FixedValueSanitizer::new("fixed"));

    store
        .insert_or_replace_one(&mut Item::new("#p", "#r"))
        .await
        .unwrap();
    assert!(client.get("fixed", "fixed").await.is_some());
}

#[tokio::test]
async fn unsanitizable_entities_surface_service_rejection() {
    let (client, store) = default_setup().await;

    let mut plain = Plain {
        pk: "#p".into(),
        rk: "r".into(),
        note: String::new(),
    };
    let err = store.insert_or_replace_one(&mut plain).await.unwrap_err();
    assert_eq!(err.service_error().unwrap().code, "InvalidInput");
    assert_eq!(plain.pk, "#p");

    let mut raw = vec![DynamicEntity::new("p", "%r")];
    assert!(store.insert_or_replace(&mut raw).await.is_err());
    assert!(client.is_empty().await);
}

// ── Conditional updates ─────────────────────────────────────────

#[tokio::test]
async fn replace_honors_etags() {
    let (_client, store) = default_setup().await;
    let mut item = Item::new("p", "r");
    item.quantity = 1;
    store.insert_or_replace_one(&mut item).await.unwrap();

    let mut current: Item = store
        .query_by_partition_and_row(Some("p"), Some("r"))
        .await
        .unwrap()
        .unwrap();
    assert!(current.etag.is_some());

    current.quantity = 2;
    let result = store.replace(&mut current).await.unwrap();
    assert_eq!(result.kind, OperationKind::Replace);

    // `current` still carries the ETag it was read with.
    current.quantity = 3;
    let err = store.merge(&mut current).await.unwrap_err();
    assert!(err.is_precondition_failed());

    let stored: Item = store
        .query_by_partition_and_row(Some("p"), Some("r"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 2);
}

#[tokio::test]
async fn replace_of_missing_entity_is_not_found() {
    let (_client, store) = default_setup().await;
    let err = store.replace(&mut Item::new("p", "r")).await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Deletes ─────────────────────────────────────────────────────

#[tokio::test]
async fn delete_by_partition_of_absent_partition_is_a_noop() {
    let (client, store) = default_setup().await;

    assert_eq!(store.delete_by_partition(None).await.unwrap(), 0);
    assert_eq!(client.stats().query_calls, 0);

    assert_eq!(store.delete_by_partition(Some("nothing")).await.unwrap(), 0);
    assert_eq!(client.stats().batch_calls, 0);
}

#[tokio::test]
async fn delete_by_partition_removes_only_that_partition() {
    let (client, store) = default_setup().await;
    let mut items: Vec<Item> = (0..150).map(|i| Item::new("gone", &i.to_string())).collect();
    items.push(Item::new("kept", "0"));
    store.insert(&mut items).await.unwrap();

    assert_eq!(store.delete_by_partition(Some("gone")).await.unwrap(), 150);
    assert_eq!(client.len().await, 1);
    assert!(client.get("kept", "0").await.is_some());
}

#[tokio::test]
async fn delete_by_row_spans_partitions() {
    let (client, store) = default_setup().await;
    let mut items = vec![
        Item::new("a", "shared"),
        Item::new("b", "shared"),
        Item::new("c", "shared"),
        Item::new("a", "other"),
    ];
    store.insert(&mut items).await.unwrap();
    let before = client.stats();

    assert_eq!(store.delete_by_row(Some("shared")).await.unwrap(), 3);
    assert_eq!(store.delete_by_row(None).await.unwrap(), 0);

    let after = client.stats();
    assert_eq!(after.single_calls - before.single_calls, 3);
    assert_eq!(after.batch_calls, before.batch_calls);
    assert_eq!(client.len().await, 1);
}

#[tokio::test]
async fn delete_entities_in_batches() {
    let (client, store) = default_setup().await;
    let mut items: Vec<Item> = (0..5).map(|i| Item::new("p", &i.to_string())).collect();
    store.insert(&mut items).await.unwrap();

    let results = store.delete(&mut items[..3]).await.unwrap().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.kind == OperationKind::Delete && r.etag.is_none()));
    assert_eq!(client.len().await, 2);
}

// ── Queries ─────────────────────────────────────────────────────

#[tokio::test]
async fn point_query_with_missing_keys_issues_no_request() {
    let (client, store) = default_setup().await;

    let none: Option<Item> = store.query_by_partition_and_row(None, None).await.unwrap();
    assert!(none.is_none());
    let none: Option<Item> = store.query_by_partition_and_row(Some("p"), None).await.unwrap();
    assert!(none.is_none());
    assert_eq!(client.stats().query_calls, 0);

    let missing: Option<Item> = store
        .query_by_partition_and_row(Some("p"), Some("r"))
        .await
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(client.stats().query_calls, 1);
}

#[tokio::test]
async fn query_by_row_and_filter() {
    let (_client, store) = default_setup().await;
    let mut items: Vec<Item> = (0..6)
        .map(|i| {
            let mut item = Item::new(&format!("p{}", i % 3), if i < 3 { "first" } else { "second" });
            item.quantity = i;
            item
        })
        .collect();
    store.insert(&mut items).await.unwrap();

    let firsts: Vec<Item> = store.query_by_row("first").await.unwrap();
    let partitions: Vec<&str> = firsts.iter().map(|i| i.keys.partition_key()).collect();
    assert_eq!(partitions, vec!["p0", "p1", "p2"]);

    let large: Vec<Item> = store
        .query(&Filter::condition("Quantity", ComparisonOp::Ge, 4))
        .await
        .unwrap();
    let mut quantities: Vec<i32> = large.iter().map(|i| i.quantity).collect();
    quantities.sort_unstable();
    assert_eq!(quantities, vec![4, 5]);
}

#[tokio::test]
async fn raw_query_exposes_service_metadata() {
    let (_client, store) = default_setup().await;
    let mut raw = vec![DynamicEntity::new("p", "r").with_property("Flag", true)];
    store.insert(&mut raw).await.unwrap();

    let found = store.query_raw(&Filter::partition_key_eq("p")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].partition_key, "p");
    assert!(found[0].etag.is_some());
    assert!(found[0].timestamp.is_some());
    assert_eq!(found[0].get("Flag"), Some(&PropertyValue::Boolean(true)));
}
