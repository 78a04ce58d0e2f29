#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sextant_db::merkle::Trie;
use sextant_db::store::MAX_VALUE_LEN;

#[derive(Arbitrary, Debug)]
struct TrieInput {
    operations: Vec<TrieOp>,
}

#[derive(Arbitrary, Debug)]
enum TrieOp {
    // Fixed-width keys keep the no-prefix-pairs contract trivially
    // satisfied.
    Put { key: [u8; 8], value: Vec<u8> },
    Get { key: [u8; 8] },
    Hash,
}

fuzz_target!(|input: TrieInput| {
    // Limit operations
    if input.operations.len() > 500 {
        return;
    }

    let mut trie = Trie::with_max_chunks(1 << 16).unwrap();
    let mut expected: std::collections::HashMap<[u8; 8], Vec<u8>> =
        std::collections::HashMap::new();
    let mut value_buf = [0u8; MAX_VALUE_LEN];

    for op in input.operations {
        match op {
            TrieOp::Put { key, mut value } => {
                value.truncate(MAX_VALUE_LEN);
                trie.put(&key, &value);
                expected.insert(key, value);
            }
            TrieOp::Get { key } => {
                let result = trie.get(&key, &mut value_buf);
                match expected.get(&key) {
                    Some(value) => assert_eq!(result, Some(value.as_slice())),
                    None => assert!(result.is_none()),
                }
            }
            TrieOp::Hash => {
                let mut keys: Vec<[u8; 8]> = expected.keys().copied().collect();
                keys.sort();
                let root1 = trie.hash(&keys);
                let root2 = trie.hash(&keys);
                // The root is deterministic.
                assert_eq!(root1, root2);
            }
        }
    }

    // Final consistency check
    assert_eq!(trie.len(), expected.len());
    for (key, value) in &expected {
        assert_eq!(trie.get(key, &mut value_buf), Some(value.as_slice()));
    }
});
