//! Chunked heap for leaf payloads.
//!
//! Leaf key/value pairs are serialized across fixed 64-byte chunks owned
//! by a [`ChunkStore`]. The store is a pre-sized arena with a LIFO free
//! list; leaf records account for their chunks exactly, so the free list
//! length depends only on the set of live leaves.

mod chunk_store;
mod leaf;

pub use chunk_store::{ChunkIndex, ChunkStore, StoreError, CHUNK_SIZE, DEFAULT_MAX_CHUNKS};
pub use leaf::{LeafRecord, LEAF_MARKER, MAX_LEAF_CHUNKS, MAX_VALUE_LEN};
