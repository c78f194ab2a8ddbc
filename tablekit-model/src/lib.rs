//! Entity model for tablekit.
//!
//! An entity can reach the table layer in three shapes:
//! - a strongly typed record implementing [`TableEntity`], usually through the
//!   [`table_entity!`] field-registration macro
//! - a [`DynamicEntity`], a loosely typed key pair plus ordered property map
//! - a record whose keys live in [`EntityKeys`], which additionally exposes
//!   the [`SanitizableKeys`] capability
//!
//! [`codec`] normalizes all of them to [`PropertyBag`] and back, and
//! [`sanitize`] holds the key sanitization policies.

pub mod codec;
mod entity;
mod keys;
mod record;
pub mod sanitize;

pub use entity::{DynamicEntity, TableEntity};
pub use keys::{EntityKeys, SanitizableKeys};
pub use sanitize::{DefaultSanitizer, FixedValueSanitizer, SanitizationStrategy};
pub use tablekit_types::{ETag, PropertyBag, PropertyValue};
