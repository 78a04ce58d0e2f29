//! Incremental Merkle root recomputation.
//!
//! Re-hashing after a batch of puts walks each updated key's path from
//! its leaf to the root, recomputing every ancestor from its two
//! children. Keys are processed in lexicographic order, which makes the
//! shared work explicit: every ancestor above the common prefix of two
//! consecutive keys is also an ancestor of the later key, so the earlier
//! key stops there and leaves the recomputation to the later one.

use super::node::{keccak256, Node, MAX_HASH_INPUT};
use super::page::{slot_index, PAGE_DEPTH};
use super::trie::Trie;
use crate::data::{common_prefix_bit_len, PaddedKey};

impl Trie {
    /// Recomputes the Merkle root over a batch of updated keys and
    /// returns it.
    ///
    /// `sorted_keys` must be strictly ascending lexicographically, and
    /// every key must currently be present in the trie. An empty batch
    /// returns the root unchanged.
    pub fn hash<K: AsRef<[u8]>>(&mut self, sorted_keys: &[K]) -> Node {
        for i in 0..sorted_keys.len() {
            let key = sorted_keys[i].as_ref();
            // Ancestors above the common prefix with the next key are
            // left to that key's pass.
            let hash_from = if i + 1 < sorted_keys.len() {
                let next = sorted_keys[i + 1].as_ref();
                debug_assert!(key < next, "keys must be sorted and distinct");
                common_prefix_bit_len(key, next)
            } else {
                0
            };
            self.hash_key(key, hash_from);
        }
        self.root
    }

    /// Re-hashes the ancestors of `key` from its leaf upward, stopping
    /// at bit depth `hash_from` (0 walks all the way to the root).
    fn hash_key(&mut self, key: &[u8], hash_from: usize) {
        let padded = PaddedKey::new(key);
        let bytes = padded.as_bytes();
        let (mut page_idx, mut path_len) = self.lookup(&padded);
        debug_assert!(path_len > 0, "hashed keys must be present in the trie");

        let mut node_idx = slot_index(bytes[page_idx], path_len);
        let mut input = [0u8; 2 * MAX_HASH_INPUT];

        loop {
            // Siblings are adjacent, left at the even index.
            let (left_idx, right_idx) = if node_idx & 1 == 0 {
                (node_idx, node_idx + 1)
            } else {
                (node_idx - 1, node_idx)
            };
            let read_page_len = page_idx;

            // Walk up to the parent position.
            path_len -= 1;

            if hash_from > 0 && PAGE_DEPTH as usize * page_idx + path_len as usize <= hash_from {
                break;
            }

            if path_len == 0 && page_idx > 0 {
                page_idx -= 1;
                path_len = PAGE_DEPTH;
            }
            let at_root = page_idx == 0 && path_len == 0;

            let input_len = {
                let page = self.page(&bytes[..read_page_len]);
                let pos = page.node(left_idx).hash_input(&mut input, &self.store);
                pos + page.node(right_idx).hash_input(&mut input[pos..], &self.store)
            };
            let mut parent = Node::from_bytes(keccak256(&input[..input_len]));
            parent.mark_internal();
            self.metrics.num_hashes += 1;

            if at_root {
                self.root = parent;
                break;
            }

            let parent_idx = slot_index(bytes[page_idx], path_len);
            *self.page_mut(&bytes[..page_idx]).node_mut(parent_idx) = parent;
            node_idx = parent_idx;
        }
    }
}
