// ---- Field-registration macro ----
// Generates a `TableEntity` impl from an explicit list of the fields that map
// to table properties. Fields left out of the list (shadow values, caches)
// never reach the property bag.

/// Implement [`TableEntity`](crate::TableEntity) for a record type.
///
/// The record must implement `Default`. Two key layouts are supported:
///
/// ```
/// use tablekit_model::{table_entity, EntityKeys, ETag};
///
/// // Keys held in an `EntityKeys`: the record becomes sanitizable.
/// #[derive(Debug, Default)]
/// struct Customer {
///     keys: EntityKeys,
///     etag: Option<ETag>,
///     email: String,
///     visits: i32,
/// }
///
/// table_entity!(Customer {
///     keys: keys,
///     etag: etag,
///     properties {
///         "Email" => email,
///         "Visits" => visits,
///     }
/// });
///
/// // Plain `String` key fields: keys are written verbatim.
/// #[derive(Debug, Default)]
/// struct Reading {
///     device: String,
///     sequence: String,
///     value: f64,
/// }
///
/// table_entity!(Reading {
///     partition_key: device,
///     row_key: sequence,
///     properties {
///         "Value" => value,
///     }
/// });
/// ```
///
/// `etag:` (an `Option<ETag>` field) and `timestamp:` (an
/// `Option<DateTime<Utc>>` field) are optional and must appear in that order.
#[macro_export]
macro_rules! table_entity {
    ($ty:ident {
        keys: $keys:ident,
        $(etag: $etag:ident,)?
        $(timestamp: $ts:ident,)?
        properties { $($prop:literal => $field:ident),* $(,)? } $(,)?
    }) => {
        impl $crate::TableEntity for $ty {
            fn to_property_bag(&self) -> $crate::PropertyBag {
                let mut bag = $crate::PropertyBag::with_keys(
                    $crate::SanitizableKeys::partition_key(&self.$keys),
                    $crate::SanitizableKeys::row_key(&self.$keys),
                );
                $crate::__table_entity_write_meta!(self, bag $(, etag: $etag)? $(, timestamp: $ts)?);
                $( $crate::codec::write_field(&mut bag, $prop, &self.$field); )*
                bag
            }

            fn from_property_bag(bag: &$crate::PropertyBag) -> Self {
                let mut entity = <Self as ::core::default::Default>::default();
                entity.$keys = $crate::EntityKeys::new(bag.partition_key(), bag.row_key());
                $( entity.$etag = bag.etag(); )?
                $( entity.$ts = bag.timestamp(); )?
                $( $crate::codec::read_field(bag, $prop, &mut entity.$field); )*
                entity
            }

            fn sanitizable_keys_mut(&mut self) -> Option<&mut dyn $crate::SanitizableKeys> {
                Some(&mut self.$keys)
            }
        }
    };

    ($ty:ident {
        partition_key: $pk:ident,
        row_key: $rk:ident,
        $(etag: $etag:ident,)?
        $(timestamp: $ts:ident,)?
        properties { $($prop:literal => $field:ident),* $(,)? } $(,)?
    }) => {
        impl $crate::TableEntity for $ty {
            fn to_property_bag(&self) -> $crate::PropertyBag {
                let mut bag = $crate::PropertyBag::with_keys(self.$pk.clone(), self.$rk.clone());
                $crate::__table_entity_write_meta!(self, bag $(, etag: $etag)? $(, timestamp: $ts)?);
                $( $crate::codec::write_field(&mut bag, $prop, &self.$field); )*
                bag
            }

            fn from_property_bag(bag: &$crate::PropertyBag) -> Self {
                let mut entity = <Self as ::core::default::Default>::default();
                entity.$pk = bag.partition_key();
                entity.$rk = bag.row_key();
                $( entity.$etag = bag.etag(); )?
                $( entity.$ts = bag.timestamp(); )?
                $( $crate::codec::read_field(bag, $prop, &mut entity.$field); )*
                entity
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __table_entity_write_meta {
    ($self:ident, $bag:ident $(, etag: $etag:ident)? $(, timestamp: $ts:ident)?) => {
        $(
            if let Some(ts) = $self.$ts {
                $bag.set_timestamp(ts);
            }
        )?
        $(
            if let Some(etag) = &$self.$etag {
                $bag.set_etag(etag);
            }
        )?
    };
}
