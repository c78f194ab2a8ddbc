use crate::sanitize::SanitizationStrategy;
use serde::{Deserialize, Serialize};

/// Capability of an entity whose partition and row keys can be sanitized
/// in place.
///
/// After [`sanitize_keys`](SanitizableKeys::sanitize_keys) the key accessors
/// return the stored (sanitized) values while the `unsanitized_*` accessors
/// keep reporting what the caller originally assigned.
pub trait SanitizableKeys {
    fn partition_key(&self) -> &str;

    fn row_key(&self) -> &str;

    /// The partition key as assigned before any sanitization.
    fn unsanitized_partition_key(&self) -> &str;

    /// The row key as assigned before any sanitization.
    fn unsanitized_row_key(&self) -> &str;

    /// Sanitizes both keys with `strategy`.
    /// Returns false if both keys were already clean.
    fn sanitize_keys(&mut self, strategy: &dyn SanitizationStrategy) -> bool;
}

/// Partition and row key pair with shadow copies of the pre-sanitization
/// values.
///
/// Records embed this instead of two plain `String` keys to become
/// sanitizable. The shadow values are never written to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKeys {
    partition_key: String,
    row_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unsanitized_partition_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unsanitized_row_key: Option<String>,
}

impl EntityKeys {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            unsanitized_partition_key: None,
            unsanitized_row_key: None,
        }
    }

    /// Assigns a new partition key, discarding any earlier shadow value.
    pub fn set_partition_key(&mut self, partition_key: impl Into<String>) {
        self.partition_key = partition_key.into();
        self.unsanitized_partition_key = None;
    }

    /// Assigns a new row key, discarding any earlier shadow value.
    pub fn set_row_key(&mut self, row_key: impl Into<String>) {
        self.row_key = row_key.into();
        self.unsanitized_row_key = None;
    }

    /// Returns true once sanitization has changed at least one key.
    pub fn is_sanitized(&self) -> bool {
        self.unsanitized_partition_key.is_some() || self.unsanitized_row_key.is_some()
    }
}

impl SanitizableKeys for EntityKeys {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }

    fn unsanitized_partition_key(&self) -> &str {
        self.unsanitized_partition_key
            .as_deref()
            .unwrap_or(&self.partition_key)
    }

    fn unsanitized_row_key(&self) -> &str {
        self.unsanitized_row_key.as_deref().unwrap_or(&self.row_key)
    }

    fn sanitize_keys(&mut self, strategy: &dyn SanitizationStrategy) -> bool {
        let partition_key = strategy.sanitize(&self.partition_key);
        let row_key = strategy.sanitize(&self.row_key);
        let mut changed = false;

        if partition_key != self.partition_key {
            let original = std::mem::replace(&mut self.partition_key, partition_key);
            self.unsanitized_partition_key.get_or_insert(original);
            changed = true;
        }
        if row_key != self.row_key {
            let original = std::mem::replace(&mut self.row_key, row_key);
            self.unsanitized_row_key.get_or_insert(original);
            changed = true;
        }
        changed
    }
}
