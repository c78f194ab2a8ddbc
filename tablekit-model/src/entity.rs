use crate::keys::SanitizableKeys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tablekit_types::{ETag, PropertyBag, PropertyValue};

/// Anything that can be stored as a table entity.
///
/// Implemented by strongly typed records (usually through
/// [`table_entity!`](crate::table_entity)) and by [`DynamicEntity`].
pub trait TableEntity: Sized + Send + Sync {
    /// Converts the entity into its property-bag form, including the key
    /// properties and, when known, the ETag and Timestamp.
    fn to_property_bag(&self) -> PropertyBag;

    /// Rebuilds an entity from a property bag. Unknown properties are
    /// dropped; properties the bag lacks keep their default values.
    fn from_property_bag(bag: &PropertyBag) -> Self;

    /// Runtime capability query for key sanitization.
    ///
    /// Returns `None` for entities whose keys must be written verbatim.
    fn sanitizable_keys_mut(&mut self) -> Option<&mut dyn SanitizableKeys> {
        None
    }
}

/// A loosely typed entity: key pair, service metadata and an ordered bag of
/// user properties.
///
/// This is also the shape raw query results are returned in. Its keys are
/// never sanitized on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicEntity {
    pub partition_key: String,
    pub row_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<ETag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: PropertyBag,
}

impl DynamicEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Default::default()
        }
    }

    /// Builder-style property setter.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// Looks up a user property.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Sets a user property. Reserved names are routed to the matching
    /// field instead of the bag.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            tablekit_types::PARTITION_KEY => self.partition_key = value.to_string(),
            tablekit_types::ROW_KEY => self.row_key = value.to_string(),
            tablekit_types::ETAG => self.etag = Some(ETag::new(value.to_string())),
            tablekit_types::TIMESTAMP => {
                if let PropertyValue::DateTime(ts) = value {
                    self.timestamp = Some(ts);
                }
            }
            _ => {
                self.properties.insert(name, value);
            }
        }
    }
}

impl TableEntity for DynamicEntity {
    fn to_property_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::with_keys(self.partition_key.clone(), self.row_key.clone());
        if let Some(ts) = self.timestamp {
            bag.set_timestamp(ts);
        }
        if let Some(etag) = &self.etag {
            bag.set_etag(etag);
        }
        for (name, value) in self.properties.user_properties() {
            bag.insert(name, value.clone());
        }
        bag
    }

    fn from_property_bag(bag: &PropertyBag) -> Self {
        Self {
            partition_key: bag.partition_key(),
            row_key: bag.row_key(),
            etag: bag.etag(),
            timestamp: bag.timestamp(),
            properties: bag
                .user_properties()
                .map(|(n, v)| (n, v.clone()))
                .collect(),
        }
    }
}
