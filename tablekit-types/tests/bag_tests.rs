use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tablekit_types::{
    is_reserved, ETag, PropertyBag, PropertyValue, ETAG, PARTITION_KEY, ROW_KEY, TIMESTAMP,
};
use uuid::Uuid;

fn names(bag: &PropertyBag) -> Vec<&str> {
    bag.iter().map(|(n, _)| n).collect()
}

// ── Ordering & replacement ───────────────────────────────────────

#[test]
fn preserves_insertion_order() {
    let mut bag = PropertyBag::new();
    bag.insert("Zeta", 1);
    bag.insert("Alpha", 2);
    bag.insert("Mid", 3);
    assert_eq!(names(&bag), vec!["Zeta", "Alpha", "Mid"]);
}

#[test]
fn insert_existing_replaces_in_place() {
    let mut bag = PropertyBag::new();
    bag.insert("A", 1);
    bag.insert("B", 2);
    let previous = bag.insert("A", "changed");
    assert_eq!(previous, Some(PropertyValue::Int32(1)));
    assert_eq!(names(&bag), vec!["A", "B"]);
    assert_eq!(bag.get("A"), Some(&PropertyValue::String("changed".into())));
    assert_eq!(bag.len(), 2);
}

#[test]
fn names_are_case_sensitive() {
    let mut bag = PropertyBag::new();
    bag.insert("name", "lower");
    bag.insert("Name", "upper");
    assert_eq!(bag.len(), 2);
    assert_eq!(bag.get("NAME"), None);
}

#[test]
fn remove_keeps_remaining_order() {
    let bag: PropertyBag = [("A", 1), ("B", 2), ("C", 3)].into_iter().collect();
    let mut bag = bag;
    assert_eq!(bag.remove("B"), Some(PropertyValue::Int32(2)));
    assert_eq!(bag.remove("missing"), None);
    assert_eq!(names(&bag), vec!["A", "C"]);
}

// ── Reserved properties ──────────────────────────────────────────

#[test]
fn reserved_names() {
    for name in [PARTITION_KEY, ROW_KEY, TIMESTAMP, ETAG] {
        assert!(is_reserved(name));
    }
    assert!(!is_reserved("partitionkey"));
    assert!(!is_reserved("Id"));
}

#[test]
fn missing_keys_default_to_empty() {
    let bag = PropertyBag::new();
    assert_eq!(bag.partition_key(), "");
    assert_eq!(bag.row_key(), "");
    assert_eq!(bag.etag(), None);
    assert_eq!(bag.timestamp(), None);
}

#[test]
fn keys_are_coerced_to_strings() {
    let id = Uuid::nil();
    let mut bag = PropertyBag::new();
    bag.insert(PARTITION_KEY, 42);
    bag.insert(ROW_KEY, id);
    assert_eq!(bag.partition_key(), "42");
    assert_eq!(bag.row_key(), "00000000-0000-0000-0000-000000000000");
}

#[test]
fn user_properties_skip_reserved() {
    let mut bag = PropertyBag::with_keys("p", "r");
    bag.insert("Email", "a@b.c");
    bag.set_etag(&ETag::new("W/\"1\""));
    let user: Vec<&str> = bag.user_properties().map(|(n, _)| n).collect();
    assert_eq!(user, vec!["Email"]);
}

#[test]
fn normalize_keys_moves_reserved_to_front() {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut bag = PropertyBag::new();
    bag.insert("Email", "a@b.c");
    bag.insert(ETAG, "W/\"7\"");
    bag.insert(ROW_KEY, 5i64);
    bag.set_timestamp(ts);

    bag.normalize_keys();

    assert_eq!(
        names(&bag),
        vec![PARTITION_KEY, ROW_KEY, TIMESTAMP, ETAG, "Email"]
    );
    assert_eq!(bag.get(PARTITION_KEY), Some(&PropertyValue::String(String::new())));
    assert_eq!(bag.get(ROW_KEY), Some(&PropertyValue::String("5".into())));
    assert_eq!(bag.timestamp(), Some(ts));
    assert_eq!(bag.etag(), Some(ETag::new("W/\"7\"")));
}

// ── Serialization ────────────────────────────────────────────────

#[test]
fn serde_roundtrip_keeps_order_and_types() {
    let mut bag = PropertyBag::with_keys("p", "r");
    bag.insert("Count", 3i64);
    bag.insert("Blob", vec![1u8, 2, 3]);
    bag.insert("Active", true);

    let json = serde_json::to_string(&bag).unwrap();
    let parsed: PropertyBag = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, bag);
    assert_eq!(names(&parsed), names(&bag));
}

#[test]
fn deserializing_repeated_names_keeps_last_value() {
    let mut first = PropertyBag::with_keys("p", "r");
    first.insert("Count", 1);
    first.insert("Color", "red");
    let mut second = PropertyBag::new();
    second.insert("Count", 2);

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    let json = format!("{},{}", a.trim_end_matches(']'), b.trim_start_matches('['));

    let parsed: PropertyBag = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed.get("Count"), Some(&PropertyValue::Int32(2)));
    assert_eq!(names(&parsed), vec!["PartitionKey", "RowKey", "Count", "Color"]);
}

// ── ETag ─────────────────────────────────────────────────────────

#[test]
fn etag_wildcard_matches_anything() {
    let stored = ETag::new("W/\"3\"");
    assert!(ETag::any().is_any());
    assert!(ETag::any().matches(&stored));
    assert!(stored.matches(&stored.clone()));
    assert!(!ETag::new("W/\"2\"").matches(&stored));
}

#[test]
fn etag_display_is_raw_token() {
    let etag: ETag = "W/\"abc\"".parse().unwrap();
    assert_eq!(etag.to_string(), "W/\"abc\"");
    assert_eq!(ETag::any().as_str(), "*");
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    /// Normalizing leaves PartitionKey and RowKey first and keeps the user
    /// properties in their original relative order.
    #[test]
    fn normalize_keeps_user_order(
        user in prop::collection::vec("[A-Z][a-z]{0,6}", 0..12),
        pk in "[a-z0-9]{0,8}",
        rk in "[a-z0-9]{0,8}",
    ) {
        let mut bag = PropertyBag::new();
        for (i, name) in user.iter().enumerate() {
            bag.insert(name.as_str(), i as i64);
        }
        bag.set_keys(pk.as_str(), rk.as_str());
        bag.normalize_keys();

        let all = names(&bag);
        prop_assert_eq!(&all[..2], &[PARTITION_KEY, ROW_KEY][..]);
        prop_assert_eq!(bag.partition_key(), pk);

        let mut expected: Vec<&str> = Vec::new();
        for name in &user {
            if !is_reserved(name) && !expected.contains(&name.as_str()) {
                expected.push(name);
            }
        }
        prop_assert_eq!(all[2..].to_vec(), expected);
    }
}
