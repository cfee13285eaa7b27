//! Integration tests for sharing maps across threads.
//!
//! With the `arc` feature enabled, maps and their values are `Send + Sync`
//! and every thread derives independent versions from a shared original.

#![cfg(feature = "arc")]
#![allow(clippy::cast_possible_wrap)]

use rstest::rstest;
use std::sync::Arc;
use std::thread;
use xqmap::prelude::*;

fn int_map(size: i64) -> XqMap {
    (0..size).fold(XqMap::new(), |map, n| map.put(Key::from(n), Value::from(n)))
}

#[rstest]
fn test_cross_thread_structural_sharing() {
    let original = Arc::new(int_map(100));

    let handles: Vec<_> = (0..4_i64)
        .map(|index| {
            let shared = Arc::clone(&original);
            thread::spawn(move || {
                let updated = shared
                    .put(Key::from(1_000 + index), Value::from(index))
                    .remove(&Key::from(index));
                assert_eq!(updated.len(), 100);
                assert_eq!(shared.len(), 100);
                assert!(updated.verify().is_ok());
                updated
            })
        })
        .collect();

    let results: Vec<XqMap> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();

    for (index, map) in results.iter().enumerate() {
        let index = index as i64;
        assert!(map.contains(&Key::from(1_000 + index)));
        assert!(!map.contains(&Key::from(index)));
        assert_eq!(map.keys().last(), Some(Key::from(1_000 + index)));
    }
    assert_eq!(*original, int_map(100));
}

#[rstest]
fn test_key_order_read_concurrently() {
    let map = int_map(500)
        .remove(&Key::from(10))
        .put(Key::from(10), Value::from(10));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let map = map.clone();
            thread::spawn(move || map.keys().collect::<Vec<_>>())
        })
        .collect();

    let expected: Vec<Key> = (0..500_i64)
        .filter(|n| *n != 10)
        .chain([10])
        .map(Key::from)
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("Thread panicked"), expected);
    }
}

#[rstest]
fn test_specialized_map_converts_concurrently() {
    let built: XqMap = (0..200_i64).map(|n| (Key::from(n), Value::from(n))).collect();
    assert_eq!(built.representation(), "int-int");

    let handles: Vec<_> = (0..4_i64)
        .map(|index| {
            let built = built.clone();
            thread::spawn(move || built.put(Key::from(-1 - index), Value::from(index)))
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let map = handle.join().expect("Thread panicked");
        assert_eq!(map.representation(), "trie");
        assert_eq!(map.len(), 201);
        assert_eq!(map.get(&Key::from(-1 - index as i64)), Value::from(index as i64));
    }
    assert_eq!(built.len(), 200);
}

#[rstest]
fn test_merge_results_from_threads() {
    let handles: Vec<_> = (0..4_i64)
        .map(|chunk| {
            thread::spawn(move || {
                (chunk * 100..(chunk + 1) * 100)
                    .fold(XqMap::new(), |map, n| map.put(Key::from(n), Value::from(n)))
            })
        })
        .collect();

    let maps: Vec<XqMap> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();
    let merged = XqMap::merge_all(&maps, MergeDuplicates::Reject).unwrap();

    assert_eq!(merged, int_map(400));
    assert_eq!(
        merged.keys().collect::<Vec<_>>(),
        (0..400_i64).map(Key::from).collect::<Vec<_>>()
    );
}
