//! Query filters over table properties.

use std::fmt;
use tablekit_types::{PropertyBag, PropertyValue, PARTITION_KEY, ROW_KEY};

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Ne => "ne",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Ge => "ge",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Le => "le",
        }
    }
}

/// A filter expression evaluated by the service against each entity.
///
/// Renders as OData filter text through `Display`, e.g.
/// `(PartitionKey eq 'p') and (RowKey eq 'r')`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition {
        property: String,
        op: ComparisonOp,
        value: PropertyValue,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn condition(
        property: impl Into<String>,
        op: ComparisonOp,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Filter::Condition {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// `property eq value`.
    pub fn property_eq(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::condition(property, ComparisonOp::Eq, value)
    }

    pub fn partition_key_eq(partition_key: impl Into<String>) -> Self {
        Self::property_eq(PARTITION_KEY, partition_key.into())
    }

    pub fn row_key_eq(row_key: impl Into<String>) -> Self {
        Self::property_eq(ROW_KEY, row_key.into())
    }

    /// Matches exactly one entity by its full key.
    pub fn key_eq(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self::partition_key_eq(partition_key).and(Self::row_key_eq(row_key))
    }

    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    /// Returns the partition key if the filter pins every match to a single
    /// partition.
    pub fn pinned_partition_key(&self) -> Option<&str> {
        match self {
            Filter::Condition {
                property,
                op: ComparisonOp::Eq,
                value: PropertyValue::String(pk),
            } if property == PARTITION_KEY => Some(pk),
            Filter::And(a, b) => a.pinned_partition_key().or_else(|| b.pinned_partition_key()),
            _ => None,
        }
    }

    /// Evaluates the filter against a property bag.
    ///
    /// A condition on a missing property, or on values of incomparable
    /// types, does not match.
    pub fn matches(&self, bag: &PropertyBag) -> bool {
        match self {
            Filter::Condition { property, op, value } => {
                let Some(actual) = bag.get(property) else {
                    return false;
                };
                let Some(ordering) = actual.compare(value) else {
                    return false;
                };
                match op {
                    ComparisonOp::Eq => ordering.is_eq(),
                    ComparisonOp::Ne => ordering.is_ne(),
                    ComparisonOp::Gt => ordering.is_gt(),
                    ComparisonOp::Ge => ordering.is_ge(),
                    ComparisonOp::Lt => ordering.is_lt(),
                    ComparisonOp::Le => ordering.is_le(),
                }
            }
            Filter::And(a, b) => a.matches(bag) && b.matches(bag),
            Filter::Or(a, b) => a.matches(bag) || b.matches(bag),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Condition { property, op, value } => {
                write!(f, "{} {} {}", property, op.as_str(), value.to_filter_literal())
            }
            Filter::And(a, b) => write!(f, "({a}) and ({b})"),
            Filter::Or(a, b) => write!(f, "({a}) or ({b})"),
        }
    }
}
