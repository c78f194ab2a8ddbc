//! Table service client abstraction.
//!
//! [`TableClient`] is the outward seam of this crate: everything that talks
//! to the network (wire format, authentication, retries) lives behind it.
//! [`InMemoryTableClient`](crate::memory::InMemoryTableClient) is the
//! bundled implementation.

use crate::error::TableResult;
use crate::filter::Filter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tablekit_types::{ETag, PropertyBag};

/// What a single operation does to the target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    InsertOrReplace,
    InsertOrMerge,
    Replace,
    Merge,
    Delete,
}

/// A single entity operation, executed alone or inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    /// Fails with a conflict if the entity exists.
    Insert(PropertyBag),
    /// Upsert, replacing all stored properties.
    InsertOrReplace(PropertyBag),
    /// Upsert, merging properties into the stored entity.
    InsertOrMerge(PropertyBag),
    /// Replaces an existing entity whose ETag matches.
    Replace { entity: PropertyBag, etag: ETag },
    /// Merges into an existing entity whose ETag matches.
    Merge { entity: PropertyBag, etag: ETag },
    Delete {
        partition_key: String,
        row_key: String,
        etag: ETag,
    },
}

impl TableOperation {
    /// Builds a delete for the entity described by `bag`, conditional on its
    /// ETag when it carries one.
    pub fn delete_entity(bag: &PropertyBag) -> Self {
        TableOperation::Delete {
            partition_key: bag.partition_key(),
            row_key: bag.row_key(),
            etag: bag.etag().unwrap_or_else(ETag::any),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            TableOperation::Insert(_) => OperationKind::Insert,
            TableOperation::InsertOrReplace(_) => OperationKind::InsertOrReplace,
            TableOperation::InsertOrMerge(_) => OperationKind::InsertOrMerge,
            TableOperation::Replace { .. } => OperationKind::Replace,
            TableOperation::Merge { .. } => OperationKind::Merge,
            TableOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn partition_key(&self) -> String {
        match self {
            TableOperation::Insert(bag)
            | TableOperation::InsertOrReplace(bag)
            | TableOperation::InsertOrMerge(bag)
            | TableOperation::Replace { entity: bag, .. }
            | TableOperation::Merge { entity: bag, .. } => bag.partition_key(),
            TableOperation::Delete { partition_key, .. } => partition_key.clone(),
        }
    }

    pub fn row_key(&self) -> String {
        match self {
            TableOperation::Insert(bag)
            | TableOperation::InsertOrReplace(bag)
            | TableOperation::InsertOrMerge(bag)
            | TableOperation::Replace { entity: bag, .. }
            | TableOperation::Merge { entity: bag, .. } => bag.row_key(),
            TableOperation::Delete { row_key, .. } => row_key.clone(),
        }
    }
}

/// Outcome of one successfully executed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub kind: OperationKind,
    pub partition_key: String,
    pub row_key: String,
    /// The new ETag after a write; `None` after a delete.
    pub etag: Option<ETag>,
    /// Service write time; `None` after a delete.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Opaque cursor pointing at the next page of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QuerySegment {
    pub entities: Vec<PropertyBag>,
    /// Present when more results remain.
    pub continuation: Option<ContinuationToken>,
}

/// Abstract table service interface, bound to one table.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Name of the table this client targets.
    fn table_name(&self) -> &str;

    /// Creates the table. Returns false if it already existed.
    async fn create_if_not_exists(&self) -> TableResult<bool>;

    /// Deletes the table and all its entities. Returns false if it did not
    /// exist.
    async fn delete_if_exists(&self) -> TableResult<bool>;

    /// Executes one operation on its own.
    async fn execute(&self, operation: TableOperation) -> TableResult<OperationResult>;

    /// Executes a same-partition group of operations as one atomic
    /// transaction. Results are returned in operation order.
    async fn execute_batch(
        &self,
        operations: Vec<TableOperation>,
    ) -> TableResult<Vec<OperationResult>>;

    /// Fetches one page of entities matching `filter`, starting at
    /// `continuation` when given.
    async fn query_segmented(
        &self,
        filter: &Filter,
        continuation: Option<ContinuationToken>,
    ) -> TableResult<QuerySegment>;
}
