//! Paged binary radix trie.
//!
//! The trie maps path prefixes to 4KB pages; descending one page consumes
//! one padded key byte (6 bits). A put resolves a path, mutates exactly
//! one leaf slot (splitting a colliding leaf if necessary) and marks the
//! new interior positions; the root digest is only recomputed by the
//! batch hasher.
//!
//! ## Caller contract
//!
//! The trie is not defensive. Keys must be 1 to 64 bytes, values at most
//! 255 bytes, and no key may be a prefix of another key in the trie;
//! violations are caught by `debug_assert!` where observable and are
//! undefined behavior in release builds.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use super::metrics::TrieMetrics;
use super::node::Node;
use super::page::{slot_index, Page, PAGE_DEPTH};
use crate::data::{PaddedKey, MAX_KEY_LEN};
use crate::store::{ChunkStore, LeafRecord, StoreError, MAX_VALUE_LEN};

/// Type alias for our fast HashMap with FxHash.
///
/// FxHash is safe here: page paths derive from caller keys that are
/// typically already uniformly distributed hashes, and the map is not
/// exposed to adversarial input.
type FastHashMap<K, V> = HashMap<K, V, FxBuildHasher>;

/// Position of a node slot: a page (identified by the length of its path
/// prefix within the operation's padded key) and a slot index inside it.
///
/// Traversal code passes locators instead of holding `&mut` page
/// references across page allocations.
#[derive(Clone, Copy, Debug)]
struct SlotId {
    page_len: usize,
    index: usize,
}

/// An authenticated key-value store over paged node slots.
///
/// The root digest reflects the leaf set only after [`Trie::hash`] has
/// been called for every updated key; puts alone leave it stale by
/// design (batch commit).
pub struct Trie {
    /// Root node; written only by the batch hasher.
    pub(super) root: Node,
    /// Pages keyed by padded path prefix. The empty prefix is the root
    /// page and always exists.
    pub(super) pages: FastHashMap<Vec<u8>, Page>,
    /// Chunk heap owning every leaf payload.
    pub(super) store: ChunkStore,
    /// Operation counters.
    pub(super) metrics: TrieMetrics,
    leaf_count: usize,
}

impl Trie {
    /// Creates an empty trie with the default chunk capacity.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self::with_store(ChunkStore::new()?))
    }

    /// Creates an empty trie with capacity for `max_chunks` payload
    /// chunks.
    pub fn with_max_chunks(max_chunks: u32) -> Result<Self, StoreError> {
        Ok(Self::with_store(ChunkStore::with_max_chunks(max_chunks)?))
    }

    fn with_store(store: ChunkStore) -> Self {
        let mut pages = FastHashMap::default();
        pages.insert(Vec::new(), Page::new());
        Self {
            root: Node::EMPTY,
            pages,
            store,
            metrics: TrieMetrics::new(),
            leaf_count: 0,
        }
    }

    /// Returns the current root node.
    ///
    /// The root is updated by [`Trie::hash`], not by puts.
    pub fn root(&self) -> Node {
        self.root
    }

    /// Returns the number of key-value pairs.
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    /// Returns true if the trie holds no keys.
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Returns the number of allocated pages, including the root page.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the number of Keccak-256 computations performed so far.
    pub fn num_hashes(&self) -> u64 {
        self.metrics.num_hashes
    }

    /// Returns a copy of the operation counters.
    pub fn metrics(&self) -> TrieMetrics {
        self.metrics
    }

    /// Returns the chunk store backing the leaf payloads.
    pub fn chunk_store(&self) -> &ChunkStore {
        &self.store
    }

    /// Looks up a value, copying it into `value_buf` and returning the
    /// written subslice, or `None` if the key is absent.
    ///
    /// # Panics
    /// Panics if `value_buf` is shorter than the stored value.
    pub fn get<'b>(&self, key: &[u8], value_buf: &'b mut [u8]) -> Option<&'b [u8]> {
        let padded = PaddedKey::new(key);
        let (page_idx, path_len) = self.lookup(&padded);
        if path_len == 0 {
            return None;
        }

        let bytes = padded.as_bytes();
        let node = self.page(&bytes[..page_idx]).node(slot_index(bytes[page_idx], path_len));
        if !node.is_leaf() {
            // The path dead-ends in an interior position.
            return None;
        }

        let record = node.leaf_record();
        let mut key_buf = [0u8; MAX_KEY_LEN];
        if record.get_key(&mut key_buf, &self.store) != key {
            return None;
        }
        Some(record.get_value(value_buf, &self.store))
    }

    /// Inserts or updates a key-value pair.
    ///
    /// Key length must be in `1..=64`, value length in `0..=255`. The key
    /// must not be a prefix of, or have as a prefix, any existing key.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
        debug_assert!(value.len() <= MAX_VALUE_LEN);

        let padded = PaddedKey::new(key);
        let bytes = padded.as_bytes();
        let (mut page_idx, mut path_len) = self.lookup(&padded);

        if path_len == 0 {
            // This subtree of the page is vacant.
            let slot = self.get_or_allocate(bytes, &mut page_idx, 0);
            self.write_new_leaf(bytes, slot, key, value);
            return;
        }

        let node_idx = slot_index(bytes[page_idx], path_len);
        let node = *self.page(&bytes[..page_idx]).node(node_idx);

        if !node.is_leaf() {
            // The continuation below the deepest interior position is
            // vacant.
            let slot = self.get_or_allocate(bytes, &mut page_idx, path_len);
            self.write_new_leaf(bytes, slot, key, value);
            return;
        }

        let mut record = node.leaf_record();
        let mut key_buf = [0u8; MAX_KEY_LEN];
        let found_key_len = record.get_key(&mut key_buf, &self.store).len();
        if &key_buf[..found_key_len] == key {
            // In-place update; chunk accounting happens in the record.
            record.put_value(value, &mut self.store);
            self.page_mut(&bytes[..page_idx]).node_mut(node_idx).set_leaf(&record);
            return;
        }

        self.split_leaf(&padded, page_idx, path_len, node, &key_buf[..found_key_len], key, value);
    }

    /// Splits the leaf at `(page_idx, path_len)`: extends the path one bit
    /// at a time, marking interior positions, until the padded new key and
    /// the padded found key diverge, then places both leaves on their
    /// respective sides.
    #[allow(clippy::too_many_arguments)]
    fn split_leaf(
        &mut self,
        padded: &PaddedKey,
        mut page_idx: usize,
        mut path_len: u8,
        node: Node,
        found_key: &[u8],
        key: &[u8],
        value: &[u8],
    ) {
        debug_assert!(
            !key.starts_with(found_key) && !found_key.starts_with(key),
            "keys must not be prefixes of one another"
        );

        let bytes = padded.as_bytes();
        let found_padded = PaddedKey::new(found_key);
        let found_bytes = found_padded.as_bytes();

        // Both keys agree on the path up to here; remember the slot the
        // original leaf occupies.
        let original_page_len = page_idx;
        let original_idx = slot_index(bytes[page_idx], path_len);

        let new_slot;
        loop {
            let slot = self.get_or_allocate(bytes, &mut page_idx, path_len);
            if path_len == PAGE_DEPTH {
                // A fresh page was entered; continue from its top level.
                path_len = 0;
            }
            let bit = 1u8 << (PAGE_DEPTH - path_len - 1);
            if bytes[page_idx] & bit != found_bytes[page_idx] & bit {
                new_slot = slot;
                break;
            }
            self.slot_mut(bytes, slot).mark_internal();
            path_len += 1;
        }

        // The new key's leaf sits on its side of the diverging bit; the
        // found leaf moves to the sibling slot, chunks and all.
        self.write_new_leaf(bytes, new_slot, key, value);
        let copy_slot = self.get_or_allocate(found_bytes, &mut page_idx, path_len);
        *self.slot_mut(found_bytes, copy_slot) = node;

        // The original slot becomes an interior position.
        self.page_mut(&bytes[..original_page_len])
            .node_mut(original_idx)
            .mark_internal();
        self.metrics.leaf_splits += 1;
    }

    /// Walks the page map along the padded key and measures the occupied
    /// path in the final page.
    ///
    /// Returns `(page_idx, path_len)`: the index of the padded byte whose
    /// page the walk ended in, and the longest non-empty path depth along
    /// that byte (0 if the page is vacant along it).
    pub(super) fn lookup(&self, padded: &PaddedKey) -> (usize, u8) {
        let bytes = padded.as_bytes();
        let mut page_idx = 0;
        let mut page = self.page(&[]);

        // Descend while the depth-6 slot continues into a child page.
        while page_idx < bytes.len() - 1 {
            let node = page.node(slot_index(bytes[page_idx], PAGE_DEPTH));
            if node.is_empty() || node.is_leaf() {
                break;
            }
            page_idx += 1;
            page = self.page(&bytes[..page_idx]);
        }

        let bits = if page_idx == bytes.len() - 1 {
            PAGE_DEPTH - padded.partial_bits()
        } else {
            PAGE_DEPTH
        };
        (page_idx, page.non_zero_path_bit_len(bytes[page_idx], bits))
    }

    /// Returns the slot for depth `path_len + 1` along the padded key,
    /// allocating (and descending into) a fresh page when the path is
    /// already at the bottom of the current one.
    fn get_or_allocate(&mut self, padded_bytes: &[u8], page_idx: &mut usize, path_len: u8) -> SlotId {
        if path_len == PAGE_DEPTH {
            *page_idx += 1;
            self.pages.insert(padded_bytes[..*page_idx].to_vec(), Page::new());
            self.metrics.pages_allocated += 1;
            SlotId {
                page_len: *page_idx,
                index: slot_index(padded_bytes[*page_idx], 1),
            }
        } else {
            SlotId {
                page_len: *page_idx,
                index: slot_index(padded_bytes[*page_idx], path_len + 1),
            }
        }
    }

    fn write_new_leaf(&mut self, padded_bytes: &[u8], slot: SlotId, key: &[u8], value: &[u8]) {
        let mut record = LeafRecord::new();
        record.put_key_value(key, value, &mut self.store);
        self.slot_mut(padded_bytes, slot).set_leaf(&record);
        self.leaf_count += 1;
    }

    fn slot_mut(&mut self, padded_bytes: &[u8], slot: SlotId) -> &mut Node {
        self.page_mut(&padded_bytes[..slot.page_len]).node_mut(slot.index)
    }

    pub(super) fn page(&self, path: &[u8]) -> &Page {
        self.pages
            .get(path)
            .expect("an internal depth-6 slot implies its child page exists")
    }

    pub(super) fn page_mut(&mut self, path: &[u8]) -> &mut Page {
        self.pages
            .get_mut(path)
            .expect("an internal depth-6 slot implies its child page exists")
    }
}

impl std::fmt::Debug for Trie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trie")
            .field("leaves", &self.leaf_count)
            .field("pages", &self.pages.len())
            .field("num_hashes", &self.metrics.num_hashes)
            .finish()
    }
}
