//! Trie pages and Merkle root computation.
//!
//! The trie packs a binary radix tree into 4KB pages of 126 node slots
//! and recomputes its Keccak-256 root incrementally over sorted batches
//! of updated keys.

mod hasher;
mod metrics;
mod node;
mod page;
mod trie;

pub use metrics::TrieMetrics;
pub use node::{keccak256, Node, NodeKind, HASH_SIZE, INTERNAL_MSB, MAX_HASH_INPUT};
pub use page::{slot_index, Page, NODES_PER_PAGE, PAGE_DEPTH, PAGE_SIZE};
pub use trie::Trie;
