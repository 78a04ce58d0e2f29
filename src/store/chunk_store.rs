//! ChunkStore - a pre-sized arena of fixed 64-byte chunks.
//!
//! The arena is an anonymous memory mapping, so creating a store reserves
//! address space without committing physical pages; a chunk costs memory
//! only once it is written. Freed chunks are recycled LIFO.

use std::io;

use memmap2::MmapMut;
use thiserror::Error;

/// Chunk size in bytes.
pub const CHUNK_SIZE: usize = 64;

/// Default number of chunks in a store (16GB of virtual reservation).
pub const DEFAULT_MAX_CHUNKS: u32 = 1 << 28;

/// Chunk store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to map the chunk arena: {0}")]
    Io(#[from] io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Index of a chunk in the store.
///
/// Serialized as 4 little-endian bytes inside leaf records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkIndex(u32);

impl ChunkIndex {
    /// Size of the serialized index in bytes.
    pub const SIZE: usize = std::mem::size_of::<u32>();

    /// Returns the raw value.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns the byte offset of this chunk in the arena.
    #[inline]
    pub const fn byte_offset(&self) -> usize {
        self.0 as usize * CHUNK_SIZE
    }

    /// Reads an index from a byte slice (little-endian).
    pub fn read(data: &[u8]) -> Self {
        ChunkIndex(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Writes the index to a byte slice (little-endian).
    pub fn write(&self, dest: &mut [u8]) {
        dest[..Self::SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl std::fmt::Debug for ChunkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChunkIndex({})", self.0)
    }
}

impl From<u32> for ChunkIndex {
    fn from(value: u32) -> Self {
        ChunkIndex(value)
    }
}

impl From<ChunkIndex> for u32 {
    fn from(idx: ChunkIndex) -> Self {
        idx.0
    }
}

/// A slab allocator of fixed-size chunks.
///
/// The free list is split in two parts: the contiguous range `[0, next)`
/// of never-allocated indices, and a LIFO stack of freed holes. `alloc`
/// pops the hole stack first and otherwise consumes the cursor downward,
/// so a fresh store hands out the highest index first and a freed index
/// is the next one reused.
///
/// There is no reference counting and no validation: callers must not
/// double-free or use an index after freeing it.
pub struct ChunkStore {
    data: MmapMut,
    max_chunks: u32,
    /// Count of never-allocated indices; they occupy `[0, next)`.
    next: u32,
    /// Freed indices, reused LIFO.
    holes: Vec<ChunkIndex>,
}

impl ChunkStore {
    /// Creates a store with [`DEFAULT_MAX_CHUNKS`] chunks.
    pub fn new() -> Result<Self> {
        Self::with_max_chunks(DEFAULT_MAX_CHUNKS)
    }

    /// Creates a store with capacity for `max_chunks` chunks.
    ///
    /// The backing arena is reserved, not committed: this does not touch
    /// `max_chunks * CHUNK_SIZE` bytes of physical memory.
    pub fn with_max_chunks(max_chunks: u32) -> Result<Self> {
        let data = MmapMut::map_anon(max_chunks as usize * CHUNK_SIZE)?;
        Ok(Self {
            data,
            max_chunks,
            next: max_chunks,
            holes: Vec::new(),
        })
    }

    /// Returns the total chunk capacity.
    pub fn max_chunks(&self) -> u32 {
        self.max_chunks
    }

    /// Returns the number of free chunks.
    pub fn free_count(&self) -> usize {
        self.next as usize + self.holes.len()
    }

    /// Allocates a chunk and returns its index.
    ///
    /// # Panics
    /// Panics if the store is exhausted. Running out of chunks is fatal;
    /// there is no recovery path.
    pub fn alloc(&mut self) -> ChunkIndex {
        if let Some(idx) = self.holes.pop() {
            return idx;
        }
        assert!(self.next > 0, "chunk store exhausted");
        self.next -= 1;
        ChunkIndex(self.next)
    }

    /// Returns a chunk to the free list.
    ///
    /// No validation is performed; freeing an index twice corrupts the
    /// free list.
    pub fn free(&mut self, idx: ChunkIndex) {
        self.holes.push(idx);
    }

    /// Returns the 64-byte chunk at `idx`.
    #[inline]
    pub fn chunk(&self, idx: ChunkIndex) -> &[u8] {
        let off = idx.byte_offset();
        &self.data[off..off + CHUNK_SIZE]
    }

    /// Returns the 64-byte chunk at `idx`, mutably.
    #[inline]
    pub fn chunk_mut(&mut self, idx: ChunkIndex) -> &mut [u8] {
        let off = idx.byte_offset();
        &mut self.data[off..off + CHUNK_SIZE]
    }
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("max_chunks", &self.max_chunks)
            .field("free", &self.free_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_highest_first() {
        let mut store = ChunkStore::with_max_chunks(16).unwrap();
        assert_eq!(store.alloc().raw(), 15);
        assert_eq!(store.alloc().raw(), 14);
        assert_eq!(store.free_count(), 14);
    }

    #[test]
    fn test_freed_chunk_reused_lifo() {
        let mut store = ChunkStore::with_max_chunks(16).unwrap();
        let a = store.alloc();
        let b = store.alloc();
        store.free(a);
        store.free(b);
        assert_eq!(store.alloc(), b);
        assert_eq!(store.alloc(), a);
    }

    #[test]
    fn test_chunk_read_write() {
        let mut store = ChunkStore::with_max_chunks(16).unwrap();
        let idx = store.alloc();
        store.chunk_mut(idx)[..5].copy_from_slice(b"hello");
        assert_eq!(&store.chunk(idx)[..5], b"hello");
        assert_eq!(store.chunk(idx).len(), CHUNK_SIZE);
    }

    #[test]
    fn test_lazy_reservation() {
        // A large reservation must not commit memory up front.
        let store = ChunkStore::with_max_chunks(1 << 22).unwrap();
        assert_eq!(store.free_count(), 1 << 22);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_exhaustion_panics() {
        let mut store = ChunkStore::with_max_chunks(2).unwrap();
        store.alloc();
        store.alloc();
        store.alloc();
    }

    #[test]
    fn test_index_read_write() {
        let idx = ChunkIndex::from(0x12345678);
        let mut buf = [0u8; 4];
        idx.write(&mut buf);
        assert_eq!(ChunkIndex::read(&buf), idx);
    }
}
