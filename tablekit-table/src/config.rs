use crate::error::{TableError, TableResult};
use crate::partition::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};

/// Maximum number of entities the service returns per query segment.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Configuration for a [`TableStore`](crate::TableStore) and the in-memory
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Name of the table entities are stored in.
    pub table_name: String,
    /// Maximum entities per batch. Capped by the service at 100.
    pub max_batch_size: usize,
    /// Entities per query segment served by the in-memory service.
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: "entities".to_string(),
            max_batch_size: MAX_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableConfig {
    /// Creates a default configuration for `table_name`.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> TableResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TableResult<()> {
        if self.table_name.is_empty() {
            return Err(TableError::InvalidArgument("table name must not be empty".into()));
        }
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(TableError::InvalidArgument(format!(
                "max batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.max_batch_size
            )));
        }
        if self.page_size == 0 {
            return Err(TableError::InvalidArgument("page size must be positive".into()));
        }
        Ok(())
    }
}
