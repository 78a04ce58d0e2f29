//! Integration tests for sextant_db.

use std::collections::HashMap;

use rand::prelude::*;
use rand::rngs::StdRng;

use sextant_db::merkle::{keccak256, Node, Trie};
use sextant_db::store::MAX_VALUE_LEN;

fn trie() -> Trie {
    Trie::with_max_chunks(1 << 18).unwrap()
}

/// Derives a fixed-length hash-like key, as callers of an authenticated
/// store typically do.
fn derived_key(index: u64) -> [u8; 32] {
    let mut seed = *b"key-____________________________";
    seed[4..12].copy_from_slice(&index.to_be_bytes());
    keccak256(&seed)
}

#[test]
fn test_seven_key_workflow() {
    let keys = ["001", "010", "011", "100", "101", "110", "111"];
    let values = ["foo01", "foo02", "foo03", "foo04", "foo05", "foo06", "foo07"];

    let mut tr = trie();
    let mut value_buf = [0u8; MAX_VALUE_LEN];
    let mut last_hashes = 0;
    for (key, value) in keys.iter().zip(&values) {
        tr.put(key.as_bytes(), value.as_bytes());
        assert_eq!(
            tr.get(key.as_bytes(), &mut value_buf),
            Some(value.as_bytes())
        );

        let root = tr.hash(&[key.as_bytes()]);
        assert!(root.is_internal());
        assert!(tr.num_hashes() > last_hashes);
        last_hashes = tr.num_hashes();
    }
    assert_eq!(tr.len(), keys.len());

    // Rebuilding the same state reproduces the same root.
    let mut rebuilt = trie();
    for (key, value) in keys.iter().zip(&values) {
        rebuilt.put(key.as_bytes(), value.as_bytes());
    }
    let mut sorted: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
    sorted.sort();
    assert_eq!(rebuilt.hash(&sorted), tr.hash(&sorted));
}

#[test]
fn test_overwrite_reuses_chunks() {
    let mut tr = trie();

    tr.put(b"k", &[b'a'; 100]);
    let f1 = tr.chunk_store().free_count();

    // Same payload size: the free list is untouched.
    tr.put(b"k", &[b'a'; 100]);
    assert_eq!(tr.chunk_store().free_count(), f1);

    // Shrinking by one chunk returns exactly one index.
    tr.put(b"k", b"a");
    assert_eq!(tr.chunk_store().free_count(), f1 + 1);
}

#[test]
fn test_free_list_independent_of_history() {
    // Two tries reaching the same live leaf set through different
    // overwrite histories hold the same number of free chunks.
    let mut direct = trie();
    direct.put(&derived_key(1), &[1u8; 200]);
    direct.put(&derived_key(2), &[2u8; 40]);

    let mut churned = trie();
    churned.put(&derived_key(1), &[9u8; 10]);
    churned.put(&derived_key(2), &[9u8; 255]);
    churned.put(&derived_key(1), &[9u8; 255]);
    churned.put(&derived_key(1), &[1u8; 200]);
    churned.put(&derived_key(2), &[2u8; 40]);

    assert_eq!(
        direct.chunk_store().free_count(),
        churned.chunk_store().free_count()
    );
}

#[test]
fn test_hash_independent_of_insertion_order() {
    let pairs: Vec<([u8; 32], Vec<u8>)> = (0..64)
        .map(|i| (derived_key(i), vec![i as u8; (i % 64) as usize]))
        .collect();

    let mut forward = trie();
    for (key, value) in &pairs {
        forward.put(key, value);
    }
    let mut backward = trie();
    for (key, value) in pairs.iter().rev() {
        backward.put(key, value);
    }

    let mut sorted: Vec<[u8; 32]> = pairs.iter().map(|(k, _)| *k).collect();
    sorted.sort();
    assert_eq!(forward.hash(&sorted), backward.hash(&sorted));
}

#[test]
fn test_batch_hash_equals_sequential_hash() {
    let total = 200;
    let updated = 50;

    let mut batched = trie();
    let mut sequential = trie();
    for i in 0..total {
        let key = derived_key(i);
        batched.put(&key, &key);
        sequential.put(&key, &key);
    }

    let mut all_keys: Vec<[u8; 32]> = (0..total).map(derived_key).collect();
    all_keys.sort();
    let batched_root = batched.hash(&all_keys);
    let mut sequential_root = Node::EMPTY;
    for key in &all_keys {
        sequential_root = sequential.hash(&[key]);
    }
    assert_eq!(batched_root, sequential_root);
    assert!(batched.num_hashes() < sequential.num_hashes());

    // Update a subset and commit it; both strategies agree again.
    let mut subset: Vec<[u8; 32]> = (0..updated).map(|i| derived_key(i * 3)).collect();
    subset.sort();
    for key in &subset {
        batched.put(key, b"updated");
        sequential.put(key, b"updated");
    }
    let batched_root = batched.hash(&subset);
    let mut sequential_root = Node::EMPTY;
    for key in &subset {
        sequential_root = sequential.hash(&[key]);
    }
    assert_eq!(batched_root, sequential_root);

    // A fresh trie holding the final state reproduces the same root.
    let mut fresh = trie();
    for i in 0..total {
        let key = derived_key(i);
        fresh.put(&key, &key);
    }
    for key in &subset {
        fresh.put(key, b"updated");
    }
    assert_eq!(fresh.hash(&all_keys), batched_root);
}

#[test]
fn test_stochastic_workload() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut tr = trie();
    let mut reference: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

    let mut value_buf = [0u8; MAX_VALUE_LEN];
    let mut next_key = 0u64;
    let check_each = 100;

    for op in 0..10_000 {
        if op % 2 == 0 {
            // Insert a fresh key.
            let key = derived_key(next_key);
            next_key += 1;
            let value: Vec<u8> = (0..rng.gen_range(0..=MAX_VALUE_LEN)).map(|_| rng.gen()).collect();

            assert!(tr.get(&key, &mut value_buf).is_none());
            tr.put(&key, &value);
            assert_eq!(tr.get(&key, &mut value_buf), Some(value.as_slice()));
            reference.insert(key.to_vec(), value);
        } else {
            // Overwrite an existing key.
            let key = derived_key(rng.gen_range(0..next_key));
            assert!(tr.get(&key, &mut value_buf).is_some());

            let value: Vec<u8> = (0..rng.gen_range(0..=MAX_VALUE_LEN)).map(|_| rng.gen()).collect();
            tr.put(&key, &value);
            assert_eq!(tr.get(&key, &mut value_buf), Some(value.as_slice()));
            reference.insert(key.to_vec(), value);
        }

        if (op + 1) % check_each == 0 {
            for (key, value) in &reference {
                assert_eq!(tr.get(key, &mut value_buf), Some(value.as_slice()));
            }
        }
    }

    assert_eq!(tr.len(), reference.len());

    // Commit everything and confirm the root is reproducible.
    let mut sorted: Vec<Vec<u8>> = reference.keys().cloned().collect();
    sorted.sort();
    let root = tr.hash(&sorted);
    assert!(root.is_internal());
    assert_eq!(tr.hash(&sorted), root);
}

#[test]
fn test_values_across_many_lengths() {
    let mut tr = trie();
    let mut value_buf = [0u8; MAX_VALUE_LEN];

    for len in 0..=MAX_VALUE_LEN {
        let key = derived_key(len as u64);
        let value = vec![len as u8; len];
        tr.put(&key, &value);
        assert_eq!(tr.get(&key, &mut value_buf), Some(value.as_slice()));
    }

    let mut sorted: Vec<[u8; 32]> = (0..=MAX_VALUE_LEN as u64).map(derived_key).collect();
    sorted.sort();
    assert!(tr.hash(&sorted).is_internal());
}
