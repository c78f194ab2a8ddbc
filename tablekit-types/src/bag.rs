//! The generic property-bag representation of a table entity.

use crate::{ETag, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Reserved name of the partition key property.
pub const PARTITION_KEY: &str = "PartitionKey";
/// Reserved name of the row key property.
pub const ROW_KEY: &str = "RowKey";
/// Reserved name of the service-assigned write time.
pub const TIMESTAMP: &str = "Timestamp";
/// Reserved name of the concurrency token.
pub const ETAG: &str = "ETag";

/// All reserved property names, in canonical order.
pub const RESERVED_PROPERTIES: [&str; 4] = [PARTITION_KEY, ROW_KEY, TIMESTAMP, ETAG];

/// Returns true if `name` is one of the reserved property names.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

/// An insertion-ordered map from property name to typed value.
///
/// Every entity shape converts to and from this type. Names are
/// case-sensitive. Inserting an existing name replaces its value without
/// moving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: Vec<(String, PropertyValue)>,
}

// Entries go through `insert` so a repeated name keeps its first position
// and its last value.
impl<'de> Deserialize<'de> for PropertyBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(String, PropertyValue)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag holding only the two key properties.
    #[must_use]
    pub fn with_keys(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        let mut bag = Self::new();
        bag.set_keys(partition_key, row_key);
        bag
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a property, preserving the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterates all properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterates the properties that are not reserved names.
    pub fn user_properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.iter().filter(|(n, _)| !is_reserved(n))
    }

    /// Returns the partition key coerced to its string representation, or
    /// `""` when absent.
    #[must_use]
    pub fn partition_key(&self) -> String {
        self.get(PARTITION_KEY).map(ToString::to_string).unwrap_or_default()
    }

    /// Returns the row key coerced to its string representation, or `""`
    /// when absent.
    #[must_use]
    pub fn row_key(&self) -> String {
        self.get(ROW_KEY).map(ToString::to_string).unwrap_or_default()
    }

    /// Returns the concurrency token, if the bag carries one.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.get(ETAG).map(|v| ETag::new(v.to_string()))
    }

    /// Returns the service write time, if the bag carries one.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self.get(TIMESTAMP) {
            Some(PropertyValue::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn set_keys(&mut self, partition_key: impl Into<String>, row_key: impl Into<String>) {
        self.insert(PARTITION_KEY, partition_key.into());
        self.insert(ROW_KEY, row_key.into());
    }

    pub fn set_etag(&mut self, etag: &ETag) {
        self.insert(ETAG, etag.as_str());
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.insert(TIMESTAMP, timestamp);
    }

    /// Rewrites the key properties as strings, defaulting absent keys to
    /// `""`, and moves the reserved properties to the front in canonical
    /// order.
    pub fn normalize_keys(&mut self) {
        let partition_key = self.partition_key();
        let row_key = self.row_key();
        let etag = self.remove(ETAG);
        let timestamp = self.remove(TIMESTAMP);
        self.remove(PARTITION_KEY);
        self.remove(ROW_KEY);

        let mut head = vec![
            (PARTITION_KEY.to_string(), PropertyValue::String(partition_key)),
            (ROW_KEY.to_string(), PropertyValue::String(row_key)),
        ];
        if let Some(ts) = timestamp {
            head.push((TIMESTAMP.to_string(), ts));
        }
        if let Some(etag) = etag {
            head.push((ETAG.to_string(), etag));
        }
        head.append(&mut self.entries);
        self.entries = head;
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> Extend<(K, V)> for PropertyBag {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for PropertyBag {
    type Item = (String, PropertyValue);
    type IntoIter = std::vec::IntoIter<(String, PropertyValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
