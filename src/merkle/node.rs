//! Trie node slots.
//!
//! A node slot is a 32-byte block in one of three mutually exclusive
//! states, discriminated by its first byte:
//!
//! - **Empty** - first byte zero: the slot is unused.
//! - **Leaf** - first byte `0x02`: the slot holds a packed [`LeafRecord`].
//! - **Internal** - first byte has the high bit set: the slot holds a
//!   Keccak-256 digest of its two children with the MSB forced on.

use tiny_keccak::{Hasher, Keccak};

use crate::data::MAX_KEY_LEN;
use crate::store::{ChunkStore, LeafRecord, LEAF_MARKER, MAX_VALUE_LEN};

/// Hash size (Keccak-256).
pub const HASH_SIZE: usize = 32;

/// High bit of the first byte, marking an internal node.
pub const INTERNAL_MSB: u8 = 0x80;

/// Maximum hash-input length contributed by one node: a leaf serializes
/// as `[key_len, value_len, key, value]`.
pub const MAX_HASH_INPUT: usize = 2 + MAX_KEY_LEN + MAX_VALUE_LEN;

/// The state of a node slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Unused slot.
    Empty,
    /// Slot holding a leaf record.
    Leaf,
    /// Slot holding a child digest (or marked as a pending interior
    /// position awaiting the next hash pass).
    Internal,
}

/// A 32-byte node slot.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Node([u8; HASH_SIZE]);

impl Node {
    /// The empty node.
    pub const EMPTY: Node = Node([0u8; HASH_SIZE]);

    /// Wraps raw slot bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Node(bytes)
    }

    /// Returns the raw slot bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Returns the slot state.
    pub fn kind(&self) -> NodeKind {
        let first = self.0[0];
        if first & INTERNAL_MSB != 0 {
            NodeKind::Internal
        } else if first == LEAF_MARKER {
            NodeKind::Leaf
        } else {
            NodeKind::Empty
        }
    }

    /// Returns true if the slot is unused.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Returns true if the slot holds a leaf record.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.0[0] == LEAF_MARKER
    }

    /// Returns true if the slot is an internal node.
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.0[0] & INTERNAL_MSB != 0
    }

    /// Forces the MSB on, turning the slot into an internal node. The
    /// digest bytes are left to the next hash pass.
    pub fn mark_internal(&mut self) {
        self.0[0] |= INTERNAL_MSB;
    }

    /// Reads the leaf record stored in this slot.
    pub fn leaf_record(&self) -> LeafRecord {
        LeafRecord::read(&self.0)
    }

    /// Writes a leaf record into this slot.
    pub fn set_leaf(&mut self, record: &LeafRecord) {
        record.write(&mut self.0);
    }

    /// Serializes this node's contribution to its parent's hash input.
    ///
    /// An internal (or empty) node contributes its 32 raw bytes; a leaf
    /// contributes `[key_len, value_len, key, value]`. Returns the number
    /// of bytes written.
    pub fn hash_input(&self, buf: &mut [u8], store: &ChunkStore) -> usize {
        if self.is_leaf() {
            let record = self.leaf_record();
            buf[0] = record.key_len() as u8;
            buf[1] = record.value_len() as u8;
            record.get_key(&mut buf[2..], store);
            record.get_value(&mut buf[2 + record.key_len()..], store);
            2 + record.key_len() + record.value_len()
        } else {
            buf[..HASH_SIZE].copy_from_slice(&self.0);
            HASH_SIZE
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            NodeKind::Empty => write!(f, "Node(empty)"),
            NodeKind::Leaf => write!(f, "Node({:?})", self.leaf_record()),
            NodeKind::Internal => {
                write!(f, "Node(internal ")?;
                for b in &self.0[..4] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "..)")
            }
        }
    }
}

/// Computes the legacy Keccak-256 hash of `data`.
///
/// This is the pre-standardization Keccak padding (Ethereum's
/// `keccak256`), not NIST SHA3-256.
pub fn keccak256(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; HASH_SIZE];
    hasher.finalize(&mut hash);
    hash
}
