//! Batched, partition-aware operations over a cloud table service.
//!
//! This crate provides:
//! - [`TableStore`], the entity-level facade: upserts, deletes and paged
//!   queries driven through a [`TableClient`]
//! - [`BatchPartitioner`], which cuts entity sequences into same-partition
//!   batches of at most [`MAX_BATCH_SIZE`] operations
//! - [`Filter`], query predicates rendered as OData filter text
//! - [`InMemoryTableClient`], an in-process service for tests and local use
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablekit_model::DynamicEntity;
//! use tablekit_table::{InMemoryTableClient, TableConfig, TableStore};
//!
//! # async fn example() -> tablekit_table::TableResult<()> {
//! let config = TableConfig::new("devices");
//! let client = Arc::new(InMemoryTableClient::from_config(&config));
//! let store = TableStore::new(client, config)?;
//! store.create_table_if_not_exists().await?;
//!
//! let mut rows = vec![DynamicEntity::new("site-1", "dev-1").with_property("Online", true)];
//! store.insert_or_replace(&mut rows).await?;
//!
//! let found: Vec<DynamicEntity> = store.query_by_partition("site-1").await?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod memory;
pub mod partition;
mod store;

pub use client::{
    ContinuationToken, OperationKind, OperationResult, QuerySegment, TableClient, TableOperation,
};
pub use config::TableConfig;
pub use error::{ServiceError, TableError, TableResult};
pub use filter::{ComparisonOp, Filter};
pub use memory::{ClientStats, InMemoryTableClient};
pub use partition::{Batch, BatchPartitioner, PartitionKeyed, MAX_BATCH_SIZE};
pub use store::TableStore;
