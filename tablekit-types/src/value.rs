//! Dynamically typed property values and their Rust conversions.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// A single typed property value as stored by the table service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Boolean(bool),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
}

impl PropertyValue {
    /// Returns the service type name of this value (e.g. `Edm.String`).
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "Edm.String",
            Self::Int32(_) => "Edm.Int32",
            Self::Int64(_) => "Edm.Int64",
            Self::Double(_) => "Edm.Double",
            Self::Boolean(_) => "Edm.Boolean",
            Self::Binary(_) => "Edm.Binary",
            Self::DateTime(_) => "Edm.DateTime",
            Self::Guid(_) => "Edm.Guid",
        }
    }

    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as an OData filter literal.
    #[must_use]
    pub fn to_filter_literal(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => format!("{v}L"),
            Self::Double(v) => format!("{v:?}"),
            Self::Boolean(v) => v.to_string(),
            Self::Binary(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("X'{hex}'")
            }
            Self::DateTime(dt) => {
                format!("datetime'{}'", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Guid(g) => format!("guid'{g}'"),
        }
    }

    /// Orders two values the way the service compares them in filters.
    ///
    /// Numeric values compare across widths; values of unrelated types are
    /// incomparable.
    #[must_use]
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Binary(a), Self::Binary(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Guid(a), Self::Guid(b)) => Some(a.cmp(b)),
            (Self::Int32(a), Self::Int32(b)) => Some(a.cmp(b)),
            (Self::Int32(a), Self::Int64(b)) => Some(i64::from(*a).cmp(b)),
            (Self::Int64(a), Self::Int32(b)) => Some(a.cmp(&i64::from(*b))),
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

/// String representation used when a value is coerced into a partition or
/// row key.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Binary(bytes) => f.write_str(&BASE64.encode(bytes)),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Guid(g) => write!(f, "{g}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Uuid> for PropertyValue {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

/// Converts a record field into a property value.
///
/// Returning `None` omits the property from the bag, which is how optional
/// fields that are unset are written.
pub trait IntoProperty {
    fn to_property(&self) -> Option<PropertyValue>;
}

/// Reads a record field back out of a property value.
///
/// Returns `None` when the stored type cannot represent `Self`; the caller
/// then keeps the field's default.
pub trait FromProperty: Sized {
    fn from_property(value: &PropertyValue) -> Option<Self>;
}

impl<T: IntoProperty + ?Sized> IntoProperty for &T {
    fn to_property(&self) -> Option<PropertyValue> {
        (**self).to_property()
    }
}

impl<T: IntoProperty> IntoProperty for Option<T> {
    fn to_property(&self) -> Option<PropertyValue> {
        self.as_ref().and_then(IntoProperty::to_property)
    }
}

impl<T: FromProperty> FromProperty for Option<T> {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        T::from_property(value).map(Some)
    }
}

impl IntoProperty for PropertyValue {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(self.clone())
    }
}

impl FromProperty for PropertyValue {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl IntoProperty for str {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.to_string()))
    }
}

impl IntoProperty for String {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.clone()))
    }
}

impl FromProperty for String {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl IntoProperty for bool {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Boolean(*self))
    }
}

impl FromProperty for bool {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl IntoProperty for i32 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Int32(*self))
    }
}

impl FromProperty for i32 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int32(v) => Some(*v),
            _ => None,
        }
    }
}

impl IntoProperty for i64 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Int64(*self))
    }
}

impl FromProperty for i64 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl IntoProperty for f64 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Double(*self))
    }
}

impl FromProperty for f64 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        value.as_f64()
    }
}

impl IntoProperty for Vec<u8> {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Binary(self.clone()))
    }
}

impl FromProperty for Vec<u8> {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Binary(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }
}

impl IntoProperty for DateTime<Utc> {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::DateTime(*self))
    }
}

impl FromProperty for DateTime<Utc> {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl IntoProperty for Uuid {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Guid(*self))
    }
}

impl FromProperty for Uuid {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Guid(g) => Some(*g),
            _ => None,
        }
    }
}
