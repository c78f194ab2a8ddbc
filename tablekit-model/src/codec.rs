//! Conversions between entity shapes and [`PropertyBag`].
//!
//! Every write normalizes through [`prepare_for_write`], which sanitizes the
//! keys of entities that expose [`SanitizableKeys`](crate::SanitizableKeys)
//! and leaves everything else untouched. Raw maps are written verbatim, so
//! callers must clean their keys themselves or the service rejects the write.

use crate::entity::{DynamicEntity, TableEntity};
use crate::sanitize::SanitizationStrategy;
use tablekit_types::{FromProperty, IntoProperty, PropertyBag};
use tracing::debug;

/// Converts an entity into a property bag with string keys in front.
pub fn to_property_bag<E: TableEntity>(entity: &E) -> PropertyBag {
    let mut bag = entity.to_property_bag();
    bag.normalize_keys();
    bag
}

/// Rebuilds a typed entity from a property bag.
pub fn from_property_bag<T: TableEntity>(bag: &PropertyBag) -> T {
    T::from_property_bag(bag)
}

/// Converts a bag returned by the service into a [`DynamicEntity`], which
/// always exposes PartitionKey, RowKey, ETag and Timestamp next to the user
/// properties.
pub fn from_raw_result(bag: PropertyBag) -> DynamicEntity {
    DynamicEntity::from_property_bag(&bag)
}

/// Sanitizes the entity's keys when it supports it, then converts it.
pub fn prepare_for_write<E: TableEntity>(
    entity: &mut E,
    strategy: &dyn SanitizationStrategy,
) -> PropertyBag {
    if let Some(keys) = entity.sanitizable_keys_mut() {
        if keys.sanitize_keys(strategy) {
            debug!(
                partition_key = keys.partition_key(),
                row_key = keys.row_key(),
                "Sanitized entity keys"
            );
        }
    }
    to_property_bag(entity)
}

/// Writes one registered record field. Used by [`table_entity!`](crate::table_entity).
#[doc(hidden)]
pub fn write_field<T: IntoProperty + ?Sized>(bag: &mut PropertyBag, name: &str, value: &T) {
    if let Some(value) = value.to_property() {
        bag.insert(name, value);
    }
}

/// Reads one registered record field, keeping the current value when the
/// property is missing or has an incompatible type.
#[doc(hidden)]
pub fn read_field<T: FromProperty>(bag: &PropertyBag, name: &str, slot: &mut T) {
    if let Some(value) = bag.get(name).and_then(T::from_property) {
        *slot = value;
    }
}
