//! The table operation facade.
//!
//! [`TableStore`] turns entity-level calls into the requests a
//! [`TableClient`] understands. Bulk writes are grouped with
//! [`BatchPartitioner`] and issued one batch at a time, in partitioner order.
//! Each batch is atomic on the service side; a failing batch aborts the call,
//! and batches already committed stay committed.

use crate::client::{OperationResult, TableClient, TableOperation};
use crate::config::TableConfig;
use crate::error::TableResult;
use crate::filter::Filter;
use crate::partition::BatchPartitioner;
use std::sync::Arc;
use tablekit_model::codec;
use tablekit_model::{DefaultSanitizer, DynamicEntity, SanitizationStrategy, TableEntity};
use tablekit_types::{ETag, PropertyBag};
use tracing::{debug, info, warn};

/// Entity-level operations over one table.
pub struct TableStore {
    client: Arc<dyn TableClient>,
    config: TableConfig,
    partitioner: BatchPartitioner,
    sanitizer: Arc<dyn SanitizationStrategy>,
}

impl TableStore {
    /// Creates a store over `client`, sanitizing keys with [`DefaultSanitizer`].
    pub fn new(client: Arc<dyn TableClient>, config: TableConfig) -> TableResult<Self> {
        config.validate()?;
        let partitioner = BatchPartitioner::with_max_batch_size(config.max_batch_size)?;
        Ok(Self {
            client,
            config,
            partitioner,
            sanitizer: Arc::new(DefaultSanitizer),
        })
    }

    /// Replaces the key sanitization strategy used on writes and deletes.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: impl SanitizationStrategy + 'static) -> Self {
        self.sanitizer = Arc::new(sanitizer);
        self
    }

    pub fn client(&self) -> &Arc<dyn TableClient> {
        &self.client
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub async fn create_table_if_not_exists(&self) -> TableResult<bool> {
        let created = self.client.create_if_not_exists().await?;
        if created {
            info!("Created table {}", self.client.table_name());
        }
        Ok(created)
    }

    pub async fn delete_table_if_exists(&self) -> TableResult<bool> {
        let deleted = self.client.delete_if_exists().await?;
        if deleted {
            info!("Deleted table {}", self.client.table_name());
        }
        Ok(deleted)
    }

    /// Upserts one entity with a single request.
    pub async fn insert_or_replace_one<E: TableEntity>(
        &self,
        entity: &mut E,
    ) -> TableResult<OperationResult> {
        let bag = codec::prepare_for_write(entity, self.sanitizer.as_ref());
        self.execute_one(TableOperation::InsertOrReplace(bag)).await
    }

    /// Upserts entities, replacing stored properties, one batch per
    /// partition chunk.
    ///
    /// Returns `None` when `entities` is empty.
    pub async fn insert_or_replace<E: TableEntity>(
        &self,
        entities: &mut [E],
    ) -> TableResult<Option<Vec<OperationResult>>> {
        let bags = self.prepare_all(entities);
        self.execute_batches(bags, TableOperation::InsertOrReplace)
            .await
    }

    /// Upserts entities, merging into stored properties, one batch per
    /// partition chunk.
    ///
    /// Returns `None` when `entities` is empty.
    pub async fn insert<E: TableEntity>(
        &self,
        entities: &mut [E],
    ) -> TableResult<Option<Vec<OperationResult>>> {
        let bags = self.prepare_all(entities);
        self.execute_batches(bags, TableOperation::InsertOrMerge)
            .await
    }

    /// Replaces an existing entity. Conditional on the entity's ETag when it
    /// carries one.
    pub async fn replace<E: TableEntity>(&self, entity: &mut E) -> TableResult<OperationResult> {
        let bag = codec::prepare_for_write(entity, self.sanitizer.as_ref());
        let etag = bag.etag().unwrap_or_else(ETag::any);
        self.execute_one(TableOperation::Replace { entity: bag, etag })
            .await
    }

    /// Merges into an existing entity. Conditional on the entity's ETag when
    /// it carries one.
    pub async fn merge<E: TableEntity>(&self, entity: &mut E) -> TableResult<OperationResult> {
        let bag = codec::prepare_for_write(entity, self.sanitizer.as_ref());
        let etag = bag.etag().unwrap_or_else(ETag::any);
        self.execute_one(TableOperation::Merge { entity: bag, etag })
            .await
    }

    /// Deletes entities, one batch per partition chunk. Keys are sanitized
    /// the same way as on writes, so an entity built with the raw keys it
    /// was inserted with addresses the stored row.
    ///
    /// Returns `None` when `entities` is empty.
    pub async fn delete<E: TableEntity>(
        &self,
        entities: &mut [E],
    ) -> TableResult<Option<Vec<OperationResult>>> {
        let bags = self.prepare_all(entities);
        self.execute_batches(bags, |bag| TableOperation::delete_entity(&bag))
            .await
    }

    /// Deletes every entity in a partition. Returns the number deleted.
    ///
    /// A missing key or an empty partition is a no-op.
    pub async fn delete_by_partition(&self, partition_key: Option<&str>) -> TableResult<usize> {
        let Some(partition_key) = partition_key else {
            return Ok(0);
        };
        let mut entities = self
            .query_raw(&Filter::partition_key_eq(partition_key))
            .await?;
        let deleted = self.delete(&mut entities).await?.map_or(0, |r| r.len());
        if deleted > 0 {
            info!(
                "Deleted {} entities from partition {} of {}",
                deleted,
                partition_key,
                self.client.table_name()
            );
        }
        Ok(deleted)
    }

    /// Deletes every entity with `row_key`, across all partitions. Returns
    /// the number deleted.
    ///
    /// Matches may span partitions, so each one is deleted with its own
    /// request, in query order.
    pub async fn delete_by_row(&self, row_key: Option<&str>) -> TableResult<usize> {
        let Some(row_key) = row_key else {
            return Ok(0);
        };
        let entities = self.query_bags(&Filter::row_key_eq(row_key)).await?;
        for bag in &entities {
            self.execute_one(TableOperation::delete_entity(bag)).await?;
        }
        if !entities.is_empty() {
            info!(
                "Deleted {} entities with row key {} from {}",
                entities.len(),
                row_key,
                self.client.table_name()
            );
        }
        Ok(entities.len())
    }

    /// Looks up one entity by its full key.
    ///
    /// Returns `None` without querying when either key is missing.
    pub async fn query_by_partition_and_row<T: TableEntity>(
        &self,
        partition_key: Option<&str>,
        row_key: Option<&str>,
    ) -> TableResult<Option<T>> {
        let (Some(partition_key), Some(row_key)) = (partition_key, row_key) else {
            return Ok(None);
        };
        let bags = self
            .query_bags(&Filter::key_eq(partition_key, row_key))
            .await?;
        Ok(bags.first().map(codec::from_property_bag))
    }

    pub async fn query_by_partition<T: TableEntity>(
        &self,
        partition_key: &str,
    ) -> TableResult<Vec<T>> {
        self.query(&Filter::partition_key_eq(partition_key)).await
    }

    /// Cross-partition lookup by row key. Scans the whole table.
    pub async fn query_by_row<T: TableEntity>(&self, row_key: &str) -> TableResult<Vec<T>> {
        self.query(&Filter::row_key_eq(row_key)).await
    }

    /// Runs `filter` to completion, following continuation tokens.
    pub async fn query<T: TableEntity>(&self, filter: &Filter) -> TableResult<Vec<T>> {
        let bags = self.query_bags(filter).await?;
        Ok(bags.iter().map(codec::from_property_bag).collect())
    }

    /// Like [`query`](Self::query), returning loosely typed entities that keep
    /// the service ETag and Timestamp.
    pub async fn query_raw(&self, filter: &Filter) -> TableResult<Vec<DynamicEntity>> {
        let bags = self.query_bags(filter).await?;
        Ok(bags.into_iter().map(codec::from_raw_result).collect())
    }

    fn prepare_all<E: TableEntity>(&self, entities: &mut [E]) -> Vec<PropertyBag> {
        entities
            .iter_mut()
            .map(|entity| codec::prepare_for_write(entity, self.sanitizer.as_ref()))
            .collect()
    }

    async fn execute_one(&self, operation: TableOperation) -> TableResult<OperationResult> {
        let kind = operation.kind();
        self.client.execute(operation).await.inspect_err(|e| {
            warn!("{:?} on {} rejected: {}", kind, self.client.table_name(), e);
        })
    }

    async fn execute_batches<F>(
        &self,
        bags: Vec<PropertyBag>,
        make_operation: F,
    ) -> TableResult<Option<Vec<OperationResult>>>
    where
        F: Fn(PropertyBag) -> TableOperation,
    {
        if bags.is_empty() {
            return Ok(None);
        }

        let total = bags.len();
        let batches = self.partitioner.partition(bags);
        let count = batches.len();
        let mut results = Vec::with_capacity(total);

        for (index, batch) in batches.into_iter().enumerate() {
            let partition_key = batch.partition_key().to_string();
            let operations: Vec<TableOperation> =
                batch.into_items().into_iter().map(&make_operation).collect();
            debug!(
                "Executing batch {}/{} of {} operations on partition {}",
                index + 1,
                count,
                operations.len(),
                partition_key
            );
            let outcome = self.client.execute_batch(operations).await.inspect_err(|e| {
                warn!(
                    "Batch {}/{} on partition {} of {} rejected: {}",
                    index + 1,
                    count,
                    partition_key,
                    self.client.table_name(),
                    e
                );
            })?;
            results.extend(outcome);
        }

        debug!("Committed {} operations in {} batches", total, count);
        Ok(Some(results))
    }

    async fn query_bags(&self, filter: &Filter) -> TableResult<Vec<PropertyBag>> {
        let mut entities = Vec::new();
        let mut continuation = None;
        loop {
            let segment = self
                .client
                .query_segmented(filter, continuation)
                .await
                .inspect_err(|e| {
                    warn!("Query {} on {} rejected: {}", filter, self.client.table_name(), e);
                })?;
            debug!(
                "Fetched segment of {} entities for {}",
                segment.entities.len(),
                filter
            );
            entities.extend(segment.entities);
            match segment.continuation {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }
        Ok(entities)
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("table", &self.client.table_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
