//! Integration tests for `MapBuilder` and specialized map storage.

use rstest::rstest;
use xqmap::prelude::*;

fn build(entries: Vec<(Key, Value)>) -> XqMap {
    let mut builder = MapBuilder::new();
    builder.extend(entries);
    builder.finish()
}

// =============================================================================
// Storage Selection
// =============================================================================

#[rstest]
#[case(vec![(Key::from(1), Value::from(10)), (Key::from(2), Value::from(20))], "int-int")]
#[case(vec![(Key::from(1), Value::from("a")), (Key::from(2), Value::from("b"))], "int-value")]
#[case(vec![(Key::from("a"), Value::from(1)), (Key::from("b"), Value::from(2))], "string-int")]
#[case(vec![(Key::from("a"), Value::from("x")), (Key::from("b"), Value::from("y"))], "string-string")]
#[case(vec![(Key::from("a"), Value::from(true)), (Key::from("b"), Value::empty())], "string-value")]
#[case(vec![(Key::from(true), Value::from(1)), (Key::from(false), Value::from(0))], "items")]
fn test_narrowest_storage(#[case] entries: Vec<(Key, Value)>, #[case] expected: &str) {
    let map = build(entries.clone());
    assert_eq!(map.representation(), expected);
    for (key, value) in entries {
        assert_eq!(map.get(&key), value);
    }
}

#[rstest]
fn test_int_int_promotes_to_int_value() {
    let map = build(vec![
        (Key::from(1), Value::from(10)),
        (Key::from(2), Value::from(20)),
        (Key::from(3), Value::from("thirty")),
    ]);
    assert_eq!(map.representation(), "int-value");
    assert_eq!(map.get(&Key::from(1)), Value::from(10));
    assert_eq!(map.get(&Key::from(3)), Value::from("thirty"));
}

#[rstest]
fn test_int_storage_promotes_to_items_on_string_key() {
    let map = build(vec![
        (Key::from(1), Value::from(10)),
        (Key::from(2), Value::from(20)),
        (Key::from("three"), Value::from(30)),
    ]);
    assert_eq!(map.representation(), "items");
    assert_eq!(map.len(), 3);
    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        vec![Key::from(1), Key::from(2), Key::from("three")]
    );
}

#[rstest]
fn test_string_storage_promotes_to_string_value() {
    let map = build(vec![
        (Key::from("a"), Value::from(1)),
        (Key::from("b"), Value::from("two")),
    ]);
    assert_eq!(map.representation(), "string-value");
}

#[rstest]
fn test_integral_double_finds_integer_key() {
    let map = build(vec![
        (Key::from(1), Value::from(10)),
        (Key::from(2), Value::from(20)),
    ]);
    assert_eq!(map.get(&Key::Double(2.0)), Value::from(20));
    assert!(!map.contains(&Key::Double(2.5)));
}

#[rstest]
fn test_untyped_key_finds_string_binding() {
    let map = build(vec![
        (Key::from("a"), Value::from("x")),
        (Key::untyped("b"), Value::from("y")),
    ]);
    assert_eq!(map.get(&Key::from("b")), Value::from("y"));
    assert_eq!(map.get(&Key::untyped("a")), Value::from("x"));
    let stored: Vec<Key> = map.keys().collect();
    assert!(stored[1].is_identical(&Key::untyped("b")));
}

// =============================================================================
// Duplicates
// =============================================================================

#[rstest]
fn test_put_replaces_value_in_place() {
    let map = build(vec![
        (Key::from("a"), Value::from(1)),
        (Key::from("b"), Value::from(2)),
        (Key::from("a"), Value::from(3)),
    ]);
    assert_eq!(map.len(), 2);
    assert_eq!(
        map.iter().collect::<Vec<_>>(),
        vec![
            (Key::from("a"), Value::from(3)),
            (Key::from("b"), Value::from(2)),
        ]
    );
}

#[rstest]
fn test_combine_promotes_storage() {
    let mut builder = MapBuilder::new();
    builder.put(Key::from(1), Value::from(1));
    builder.put(Key::from(2), Value::from(2));
    builder
        .add(Key::from(1), Value::from(5), MergeDuplicates::Combine)
        .unwrap();
    let map = builder.finish();
    assert_eq!(map.representation(), "int-value");
    assert_eq!(
        map.get(&Key::from(1)),
        Value::from_items([Item::from(1), Item::from(5)])
    );
}

#[rstest]
fn test_reject_reports_duplicate() {
    let mut builder = MapBuilder::new();
    builder.put(Key::from("a"), Value::from(1));
    builder.put(Key::from("b"), Value::from(2));
    let error = builder
        .add(Key::untyped("a"), Value::from("x"), MergeDuplicates::Reject)
        .unwrap_err();
    assert_eq!(error, MapError::DuplicateKey { key: Key::from("a") });
    assert_eq!(builder.len(), 2);
}

#[rstest]
fn test_use_first_keeps_existing_binding() {
    let mut builder = MapBuilder::new();
    builder.put(Key::from(1), Value::from(1));
    builder.put(Key::from(2), Value::from(2));
    builder
        .add(Key::from(1), Value::from("ignored"), MergeDuplicates::UseFirst)
        .unwrap();
    let map = builder.finish();
    assert_eq!(map.representation(), "int-int");
    assert_eq!(map.get(&Key::from(1)), Value::from(1));
}

// =============================================================================
// Records
// =============================================================================

#[rstest]
fn test_record_stores_fields_positionally() {
    let shape = RecordShape::new(["name", "age", "city"]).unwrap();
    let mut builder = MapBuilder::record(&shape);
    builder.put(Key::from("age"), Value::from(42));
    builder.put(Key::from("name"), Value::from("Ada"));

    let map = builder.finish();
    assert_eq!(map.representation(), "record");
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&Key::untyped("name")), Value::from("Ada"));
    assert!(!map.contains(&Key::from("city")));
    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        vec![Key::from("name"), Key::from("age")]
    );
}

#[rstest]
fn test_record_promotes_on_unknown_field() {
    let shape = RecordShape::new(["x", "y"]).unwrap();
    let mut builder = MapBuilder::record(&shape);
    builder.put(Key::from("x"), Value::from(1));
    builder.put(Key::from("z"), Value::from(3));
    let map = builder.finish();
    assert_eq!(map.representation(), "string-value");
    assert_eq!(map.get(&Key::from("x")), Value::from(1));
    assert_eq!(map.get(&Key::from("z")), Value::from(3));
}

#[rstest]
fn test_record_promotes_on_non_string_key() {
    let shape = RecordShape::new(["x"]).unwrap();
    let mut builder = MapBuilder::record(&shape);
    builder.put(Key::from("x"), Value::from(1));
    builder.put(Key::from(7), Value::from(7));
    assert_eq!(builder.finish().representation(), "items");
}

#[rstest]
fn test_single_field_record_update_unwraps_to_single() {
    let shape = RecordShape::new(["a"]).unwrap();
    let mut builder = MapBuilder::record(&shape);
    builder.put(Key::from("a"), Value::from(1));
    let map = builder.finish();

    let updated = map.put(Key::from("a"), Value::from(2));
    assert_eq!(updated.representation(), "single");
    assert_eq!(updated.len(), 1);
    assert_eq!(updated.get(&Key::from("a")), Value::from(2));
    assert!(updated.verify().is_ok());
    assert_eq!(map.get(&Key::from("a")), Value::from(1));
}

#[rstest]
fn test_nan_bindings_match_across_representations() {
    let entries = vec![
        (Key::Double(f64::NAN), Value::from(1)),
        (Key::Double(f64::NAN), Value::from(2)),
    ];
    let built = build(entries.clone());
    let folded = entries
        .into_iter()
        .fold(XqMap::new(), |map, (key, value)| map.put(key, value));

    assert_eq!(built.representation(), "items");
    assert_eq!(folded.representation(), "trie");
    for map in [&built, &folded] {
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().count(), map.len());
        assert_eq!(map.to_string(), "map { NaN: 1, NaN: 2 }");
        assert!(map.verify().is_ok());
    }
}

#[rstest]
fn test_record_shape_rejects_duplicate_fields() {
    assert_eq!(
        RecordShape::new(["a", "b", "a"]).unwrap_err(),
        MapError::DuplicateKey { key: Key::from("a") }
    );
}

#[rstest]
fn test_record_shapes_share_layout() {
    let shape = RecordShape::new(["a", "b"]).unwrap();
    assert_eq!(shape.len(), 2);
    assert_eq!(shape.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(shape.clone(), shape);
}

// =============================================================================
// Frozen Specialized Maps
// =============================================================================

#[rstest]
fn test_update_converts_to_trie() {
    let original = build((0..50_i64).map(|n| (Key::from(n), Value::from(n))).collect());
    assert_eq!(original.representation(), "int-int");

    let updated = original.put(Key::from(50), Value::from(50));
    assert_eq!(updated.representation(), "trie");
    assert_eq!(updated.len(), 51);
    assert!(updated.verify().is_ok());
    assert_eq!(
        updated.keys().collect::<Vec<_>>(),
        (0..51_i64).map(Key::from).collect::<Vec<_>>()
    );

    assert_eq!(original.representation(), "int-int");
    assert_eq!(original.len(), 50);
}

#[rstest]
fn test_specialized_and_trie_maps_are_equal() {
    let entries: Vec<(Key, Value)> = (0..20_i64)
        .map(|n| (Key::from(format!("k{n}")), Value::from(n)))
        .collect();
    let built = build(entries.clone());
    let folded = entries
        .into_iter()
        .rev()
        .fold(XqMap::new(), |map, (key, value)| map.put(key, value));
    assert_ne!(built.representation(), folded.representation());
    assert_eq!(built, folded);
    assert_eq!(built.hash32(), folded.hash32());
}

#[rstest]
fn test_remove_from_specialized_map() {
    let map = build(vec![
        (Key::from("a"), Value::from(1)),
        (Key::from("b"), Value::from(2)),
        (Key::from("c"), Value::from(3)),
    ]);
    let removed = map.remove(&Key::from("b"));
    assert_eq!(removed.len(), 2);
    assert_eq!(
        removed.keys().collect::<Vec<_>>(),
        vec![Key::from("a"), Key::from("c")]
    );
    assert_eq!(map.len(), 3);
}

#[rstest]
fn test_merge_of_specialized_maps() {
    let left = build(vec![
        (Key::from(1), Value::from(1)),
        (Key::from(2), Value::from(2)),
    ]);
    let right = build(vec![
        (Key::from("a"), Value::from("x")),
        (Key::from("b"), Value::from("y")),
    ]);
    let merged = left.add_all(&right, MergeDuplicates::Reject).unwrap();
    assert_eq!(merged.len(), 4);
    assert_eq!(
        merged.keys().collect::<Vec<_>>(),
        vec![Key::from(1), Key::from(2), Key::from("a"), Key::from("b")]
    );
}

#[rstest]
fn test_collect_into_map() {
    let map: XqMap = (1..=5_i64)
        .map(|n| (Key::from(n), Value::from(n * n)))
        .collect();
    assert_eq!(map.len(), 5);
    assert_eq!(map.get(&Key::from(4)), Value::from(16));
}
