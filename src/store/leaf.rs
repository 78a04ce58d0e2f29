//! LeafRecord - the 32-byte leaf payload descriptor.
//!
//! A leaf slot in a trie page holds a packed record locating its key and
//! value in the chunk store:
//!
//! ```text
//! [marker=0x02 | key_len: 1 | value_len: 1 | 7 x chunk index (LE u32) | pad: 1]
//! ```
//!
//! The concatenation `key || value` is treated as one contiguous byte
//! stream packed across the referenced chunks with no per-chunk framing.
//! The record is read from and written to slot bytes explicitly; it is
//! never a pointer overlay.

use super::chunk_store::{ChunkIndex, ChunkStore, CHUNK_SIZE};
use crate::data::MAX_KEY_LEN;

/// Maximum value length in bytes.
pub const MAX_VALUE_LEN: usize = 255;

/// Maximum chunks referenced by one leaf. Bounds the payload at
/// `7 * 64 = 448` bytes, above the `MAX_KEY_LEN + MAX_VALUE_LEN` worst
/// case.
pub const MAX_LEAF_CHUNKS: usize = 7;

/// First byte of a slot holding a leaf record.
pub const LEAF_MARKER: u8 = 0x02;

/// A leaf's key/value location in the chunk store.
///
/// The number of live chunks is not stored; it is derived from the
/// payload length as `ceil((key_len + value_len) / CHUNK_SIZE)`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct LeafRecord {
    key_len: u8,
    value_len: u8,
    chunks: [ChunkIndex; MAX_LEAF_CHUNKS],
}

impl LeafRecord {
    /// Creates an empty record holding no payload and no chunks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a record from leaf slot bytes.
    pub fn read(slot: &[u8; 32]) -> Self {
        debug_assert_eq!(slot[0], LEAF_MARKER);
        let mut chunks = [ChunkIndex::default(); MAX_LEAF_CHUNKS];
        for (i, chunk) in chunks.iter_mut().enumerate() {
            *chunk = ChunkIndex::read(&slot[3 + i * ChunkIndex::SIZE..]);
        }
        Self {
            key_len: slot[1],
            value_len: slot[2],
            chunks,
        }
    }

    /// Writes the record to leaf slot bytes, including the marker.
    pub fn write(&self, slot: &mut [u8; 32]) {
        slot.fill(0);
        slot[0] = LEAF_MARKER;
        slot[1] = self.key_len;
        slot[2] = self.value_len;
        for (i, chunk) in self.chunks.iter().enumerate() {
            chunk.write(&mut slot[3 + i * ChunkIndex::SIZE..3 + (i + 1) * ChunkIndex::SIZE]);
        }
    }

    /// Returns the stored key length.
    pub fn key_len(&self) -> usize {
        self.key_len as usize
    }

    /// Returns the stored value length.
    pub fn value_len(&self) -> usize {
        self.value_len as usize
    }

    /// Returns the number of chunks holding the payload.
    pub fn chunk_count(&self) -> usize {
        (self.key_len() + self.value_len() + CHUNK_SIZE - 1) / CHUNK_SIZE
    }

    /// Stores a key and value, resizing the chunk set exactly.
    pub fn put_key_value(&mut self, key: &[u8], value: &[u8], store: &mut ChunkStore) {
        debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
        debug_assert!(value.len() <= MAX_VALUE_LEN);

        let want = (key.len() + value.len() + CHUNK_SIZE - 1) / CHUNK_SIZE;
        self.alloc_exact(want, store);
        self.key_len = key.len() as u8;
        self.value_len = value.len() as u8;
        self.write_payload(0, key, store);
        self.write_payload(key.len(), value, store);
    }

    /// Replaces the value, keeping the key and resizing the chunk set
    /// exactly.
    pub fn put_value(&mut self, value: &[u8], store: &mut ChunkStore) {
        debug_assert!(value.len() <= MAX_VALUE_LEN);

        let want = (self.key_len() + value.len() + CHUNK_SIZE - 1) / CHUNK_SIZE;
        self.alloc_exact(want, store);
        self.value_len = value.len() as u8;
        self.write_payload(self.key_len(), value, store);
    }

    /// Copies the key into `buf` and returns the written subslice.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than the stored key.
    pub fn get_key<'b>(&self, buf: &'b mut [u8], store: &ChunkStore) -> &'b [u8] {
        self.read_payload(0, &mut buf[..self.key_len()], store);
        &buf[..self.key_len()]
    }

    /// Copies the value into `buf` and returns the written subslice.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than the stored value.
    pub fn get_value<'b>(&self, buf: &'b mut [u8], store: &ChunkStore) -> &'b [u8] {
        self.read_payload(self.key_len(), &mut buf[..self.value_len()], store);
        &buf[..self.value_len()]
    }

    /// Returns every referenced chunk to the store.
    pub fn free(&mut self, store: &mut ChunkStore) {
        self.alloc_exact(0, store);
        self.key_len = 0;
        self.value_len = 0;
    }

    /// Resizes the chunk set to exactly `want` chunks: grows by
    /// allocating, shrinks by freeing the trailing chunks, does nothing
    /// at equal counts.
    fn alloc_exact(&mut self, want: usize, store: &mut ChunkStore) {
        debug_assert!(want <= MAX_LEAF_CHUNKS);
        let current = self.chunk_count();
        for i in current..want {
            self.chunks[i] = store.alloc();
        }
        for i in want..current {
            store.free(self.chunks[i]);
            self.chunks[i] = ChunkIndex::default();
        }
    }

    /// Writes `data` at byte `offset` of the payload stream, straddling
    /// chunk boundaries as needed.
    fn write_payload(&self, offset: usize, data: &[u8], store: &mut ChunkStore) {
        let mut chunk = offset / CHUNK_SIZE;
        let mut within = offset % CHUNK_SIZE;
        let mut pos = 0;
        while pos < data.len() {
            let n = (CHUNK_SIZE - within).min(data.len() - pos);
            store.chunk_mut(self.chunks[chunk])[within..within + n]
                .copy_from_slice(&data[pos..pos + n]);
            pos += n;
            chunk += 1;
            within = 0;
        }
    }

    /// Reads `buf.len()` bytes of the payload stream starting at byte
    /// `offset`.
    fn read_payload(&self, offset: usize, buf: &mut [u8], store: &ChunkStore) {
        let mut chunk = offset / CHUNK_SIZE;
        let mut within = offset % CHUNK_SIZE;
        let mut pos = 0;
        while pos < buf.len() {
            let n = (CHUNK_SIZE - within).min(buf.len() - pos);
            buf[pos..pos + n].copy_from_slice(&store.chunk(self.chunks[chunk])[within..within + n]);
            pos += n;
            chunk += 1;
            within = 0;
        }
    }
}
