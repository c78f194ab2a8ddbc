//! In-memory table service.
//!
//! Emulates the service behavior the store relies on: key validation,
//! atomic single-partition batches, ETag preconditions, key-ordered results
//! and paged queries. Useful for tests and local development.

use crate::client::{
    ContinuationToken, OperationKind, OperationResult, QuerySegment, TableClient, TableOperation,
};
use crate::config::{TableConfig, DEFAULT_PAGE_SIZE};
use crate::error::{ServiceError, TableError, TableResult};
use crate::filter::Filter;
use crate::partition::MAX_BATCH_SIZE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tablekit_model::sanitize::contains_forbidden_key_chars;
use tablekit_types::{ETag, PropertyBag};
use tokio::sync::RwLock;

type EntityKey = (String, String);

/// Number of requests each kind of call has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub single_calls: usize,
    pub batch_calls: usize,
    pub query_calls: usize,
}

#[derive(Debug, Clone)]
struct StoredEntity {
    properties: PropertyBag,
    etag: ETag,
    timestamp: DateTime<Utc>,
}

impl StoredEntity {
    fn to_bag(&self, key: &EntityKey) -> PropertyBag {
        let mut bag = PropertyBag::with_keys(key.0.clone(), key.1.clone());
        bag.set_timestamp(self.timestamp);
        bag.set_etag(&self.etag);
        for (name, value) in self.properties.iter() {
            bag.insert(name, value.clone());
        }
        bag
    }
}

#[derive(Debug, Default)]
struct TableState {
    exists: bool,
    entities: BTreeMap<EntityKey, StoredEntity>,
    version: u64,
}

impl TableState {
    fn next_etag(&mut self) -> ETag {
        self.version += 1;
        ETag::new(format!("W/\"{}\"", self.version))
    }

    fn apply(&mut self, operation: TableOperation) -> Result<OperationResult, ServiceError> {
        let kind = operation.kind();
        let key = (operation.partition_key(), operation.row_key());
        validate_key(&key)?;

        match operation {
            TableOperation::Insert(bag) => {
                if self.entities.contains_key(&key) {
                    return Err(ServiceError::new(
                        409,
                        "EntityAlreadyExists",
                        format!("entity ({}, {}) already exists", key.0, key.1),
                    ));
                }
                self.store(key, user_properties(&bag), kind)
            }
            TableOperation::InsertOrReplace(bag) => self.store(key, user_properties(&bag), kind),
            TableOperation::InsertOrMerge(bag) => {
                let merged = self.merged_properties(&key, &bag);
                self.store(key, merged, kind)
            }
            TableOperation::Replace { entity, etag } => {
                self.check_precondition(&key, &etag)?;
                self.store(key, user_properties(&entity), kind)
            }
            TableOperation::Merge { entity, etag } => {
                self.check_precondition(&key, &etag)?;
                let merged = self.merged_properties(&key, &entity);
                self.store(key, merged, kind)
            }
            TableOperation::Delete { etag, .. } => {
                self.check_precondition(&key, &etag)?;
                self.entities.remove(&key);
                Ok(OperationResult {
                    kind,
                    partition_key: key.0,
                    row_key: key.1,
                    etag: None,
                    timestamp: None,
                })
            }
        }
    }

    fn store(
        &mut self,
        key: EntityKey,
        properties: PropertyBag,
        kind: OperationKind,
    ) -> Result<OperationResult, ServiceError> {
        let etag = self.next_etag();
        let timestamp = Utc::now();
        self.entities.insert(
            key.clone(),
            StoredEntity {
                properties,
                etag: etag.clone(),
                timestamp,
            },
        );
        Ok(OperationResult {
            kind,
            partition_key: key.0,
            row_key: key.1,
            etag: Some(etag),
            timestamp: Some(timestamp),
        })
    }

    fn restore(&mut self, undo: Vec<(EntityKey, Option<StoredEntity>)>, version: u64) {
        for (key, prior) in undo {
            match prior {
                Some(stored) => {
                    self.entities.insert(key, stored);
                }
                None => {
                    self.entities.remove(&key);
                }
            }
        }
        self.version = version;
    }

    fn merged_properties(&self, key: &EntityKey, bag: &PropertyBag) -> PropertyBag {
        let mut merged = self
            .entities
            .get(key)
            .map(|stored| stored.properties.clone())
            .unwrap_or_default();
        for (name, value) in bag.user_properties() {
            merged.insert(name, value.clone());
        }
        merged
    }

    fn check_precondition(&self, key: &EntityKey, etag: &ETag) -> Result<(), ServiceError> {
        let stored = self.entities.get(key).ok_or_else(|| {
            ServiceError::new(
                404,
                "ResourceNotFound",
                format!("entity ({}, {}) does not exist", key.0, key.1),
            )
        })?;
        if !etag.matches(&stored.etag) {
            return Err(ServiceError::new(
                412,
                "UpdateConditionNotSatisfied",
                format!("etag {etag} does not match {}", stored.etag),
            ));
        }
        Ok(())
    }
}

fn user_properties(bag: &PropertyBag) -> PropertyBag {
    bag.user_properties().map(|(n, v)| (n, v.clone())).collect()
}

fn validate_key(key: &EntityKey) -> Result<(), ServiceError> {
    if contains_forbidden_key_chars(&key.0) || contains_forbidden_key_chars(&key.1) {
        return Err(ServiceError::new(
            400,
            "InvalidInput",
            format!("key ({}, {}) contains a disallowed character", key.0, key.1),
        ));
    }
    Ok(())
}

fn table_not_found(name: &str) -> TableError {
    ServiceError::new(404, "TableNotFound", format!("table {name} does not exist")).into()
}

/// An in-process table service holding one table.
///
/// The table does not exist until [`TableClient::create_if_not_exists`] is
/// called, matching the real service.
#[derive(Debug)]
pub struct InMemoryTableClient {
    table_name: String,
    page_size: usize,
    state: RwLock<TableState>,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl InMemoryTableClient {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: RwLock::new(TableState::default()),
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &TableConfig) -> Self {
        Self::new(config.table_name.clone()).with_page_size(config.page_size)
    }

    /// Overrides the number of entities served per query segment.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            single_calls: self.single_calls.load(Ordering::Relaxed),
            batch_calls: self.batch_calls.load(Ordering::Relaxed),
            query_calls: self.query_calls.load(Ordering::Relaxed),
        }
    }

    /// Number of stored entities.
    pub async fn len(&self) -> usize {
        self.state.read().await.entities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Reads a stored entity directly, bypassing request accounting.
    pub async fn get(&self, partition_key: &str, row_key: &str) -> Option<PropertyBag> {
        let key = (partition_key.to_string(), row_key.to_string());
        let state = self.state.read().await;
        state.entities.get(&key).map(|stored| stored.to_bag(&key))
    }

    fn parse_token(token: &ContinuationToken) -> TableResult<EntityKey> {
        serde_json::from_str(token.as_str()).map_err(|_| {
            ServiceError::new(400, "InvalidInput", "malformed continuation token").into()
        })
    }

    fn make_token(key: &EntityKey) -> TableResult<ContinuationToken> {
        Ok(ContinuationToken::new(serde_json::to_string(key)?))
    }
}

#[async_trait]
impl TableClient for InMemoryTableClient {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn create_if_not_exists(&self) -> TableResult<bool> {
        let mut state = self.state.write().await;
        let created = !state.exists;
        state.exists = true;
        Ok(created)
    }

    async fn delete_if_exists(&self) -> TableResult<bool> {
        let mut state = self.state.write().await;
        let existed = state.exists;
        state.exists = false;
        state.entities.clear();
        Ok(existed)
    }

    async fn execute(&self, operation: TableOperation) -> TableResult<OperationResult> {
        self.single_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write().await;
        if !state.exists {
            return Err(table_not_found(&self.table_name));
        }
        Ok(state.apply(operation)?)
    }

    async fn execute_batch(
        &self,
        operations: Vec<TableOperation>,
    ) -> TableResult<Vec<OperationResult>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);

        if operations.is_empty() {
            return Err(ServiceError::new(400, "InvalidInput", "batch contains no operations").into());
        }
        if operations.len() > MAX_BATCH_SIZE {
            return Err(ServiceError::new(
                400,
                "InvalidInput",
                format!("batch of {} exceeds {MAX_BATCH_SIZE} operations", operations.len()),
            )
            .into());
        }
        let partition_key = operations[0].partition_key();
        let mut rows = HashSet::new();
        for (i, op) in operations.iter().enumerate() {
            if op.partition_key() != partition_key {
                return Err(ServiceError::new(
                    400,
                    "CommandsInBatchActOnDifferentPartitions",
                    format!("{i}: operation targets a different partition"),
                )
                .into());
            }
            if !rows.insert(op.row_key()) {
                return Err(ServiceError::new(
                    400,
                    "InvalidDuplicateRow",
                    format!("{i}: row {} appears twice in the batch", op.row_key()),
                )
                .into());
            }
        }

        let mut state = self.state.write().await;
        if !state.exists {
            return Err(table_not_found(&self.table_name));
        }

        // Prior values of the rows this batch touches, restored on failure.
        let undo: Vec<(EntityKey, Option<StoredEntity>)> = operations
            .iter()
            .map(|op| {
                let key = (op.partition_key(), op.row_key());
                let prior = state.entities.get(&key).cloned();
                (key, prior)
            })
            .collect();
        let version = state.version;

        let mut results = Vec::with_capacity(operations.len());
        for (i, op) in operations.into_iter().enumerate() {
            match state.apply(op) {
                Ok(result) => results.push(result),
                Err(mut e) => {
                    state.restore(undo, version);
                    e.message = format!("{i}: {}", e.message);
                    return Err(e.into());
                }
            }
        }
        Ok(results)
    }

    async fn query_segmented(
        &self,
        filter: &Filter,
        continuation: Option<ContinuationToken>,
    ) -> TableResult<QuerySegment> {
        self.query_calls.fetch_add(1, Ordering::Relaxed);
        let start = continuation.as_ref().map(Self::parse_token).transpose()?;

        let state = self.state.read().await;
        if !state.exists {
            return Err(table_not_found(&self.table_name));
        }

        let pinned = filter.pinned_partition_key();
        let mut lower = pinned
            .map(|pk| (pk.to_string(), String::new()))
            .unwrap_or_default();
        if let Some(start) = start {
            lower = lower.max(start);
        }

        let mut matching = state
            .entities
            .range(lower..)
            .take_while(|(key, _)| pinned.is_none_or(|pk| key.0 == pk))
            .map(|(key, stored)| stored.to_bag(key))
            .filter(|bag| filter.matches(bag));

        let entities: Vec<PropertyBag> = matching.by_ref().take(self.page_size).collect();
        let continuation = match matching.next() {
            Some(next) => Some(Self::make_token(&(next.partition_key(), next.row_key()))?),
            None => None,
        };

        Ok(QuerySegment {
            entities,
            continuation,
        })
    }
}
