//! Grouping of entities into partition-consistent batches.
//!
//! The service commits a batch atomically only when every operation in it
//! targets the same partition, and never accepts more than
//! [`MAX_BATCH_SIZE`] operations per batch. [`BatchPartitioner`] groups its
//! input by partition key in order of first appearance, keeps the input
//! order inside each group, and cuts each group into consecutive chunks.

use crate::error::{TableError, TableResult};
use std::borrow::Cow;
use std::collections::HashMap;
use tablekit_types::PropertyBag;

/// Largest batch the service accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Anything that knows which partition it belongs to.
pub trait PartitionKeyed {
    fn partition_key(&self) -> Cow<'_, str>;
}

impl PartitionKeyed for PropertyBag {
    fn partition_key(&self) -> Cow<'_, str> {
        Cow::Owned(PropertyBag::partition_key(self))
    }
}

/// Items sharing one partition key, at most one batch's worth.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    partition_key: String,
    items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Splits entity sequences into [`Batch`]es.
#[derive(Debug, Clone, Copy)]
pub struct BatchPartitioner {
    max_batch_size: usize,
}

impl Default for BatchPartitioner {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl BatchPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a smaller batch size than the service maximum.
    pub fn with_max_batch_size(max_batch_size: usize) -> TableResult<Self> {
        if max_batch_size == 0 || max_batch_size > MAX_BATCH_SIZE {
            return Err(TableError::InvalidArgument(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {max_batch_size}"
            )));
        }
        Ok(Self { max_batch_size })
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn partition<T: PartitionKeyed>(&self, items: Vec<T>) -> Vec<Batch<T>> {
        self.partition_by(items, |item| item.partition_key().into_owned())
    }

    /// Partitions using an explicit key function.
    pub fn partition_by<T, F>(&self, items: Vec<T>, mut key: F) -> Vec<Batch<T>>
    where
        F: FnMut(&T) -> String,
    {
        let mut groups: Vec<(String, Vec<T>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for item in items {
            let pk = key(&item);
            match index.get(&pk) {
                Some(&slot) => groups[slot].1.push(item),
                None => {
                    index.insert(pk.clone(), groups.len());
                    groups.push((pk, vec![item]));
                }
            }
        }

        let mut batches = Vec::new();
        for (partition_key, group) in groups {
            let mut rest = group.into_iter().peekable();
            while rest.peek().is_some() {
                let items: Vec<T> = rest.by_ref().take(self.max_batch_size).collect();
                batches.push(Batch {
                    partition_key: partition_key.clone(),
                    items,
                });
            }
        }
        batches
    }
}
