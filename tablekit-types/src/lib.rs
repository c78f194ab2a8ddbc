//! Core type definitions for tablekit.
//!
//! This crate defines the storage-agnostic types shared by the entity model
//! and the table layer:
//! - [`PropertyValue`]: a dynamically typed table property
//! - [`PropertyBag`]: the insertion-ordered property map every entity shape
//!   converts to and from
//! - [`ETag`]: the service-assigned optimistic concurrency token
//!
//! Conversions between Rust field types and [`PropertyValue`] go through the
//! [`IntoProperty`] and [`FromProperty`] traits.

mod bag;
mod etag;
mod value;

pub use bag::{
    is_reserved, PropertyBag, ETAG, PARTITION_KEY, RESERVED_PROPERTIES, ROW_KEY, TIMESTAMP,
};
pub use etag::ETag;
pub use value::{FromProperty, IntoProperty, PropertyValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument was absent or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
