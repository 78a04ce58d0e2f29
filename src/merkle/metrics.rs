//! Trie metrics for benchmarking and debugging.

/// Operation counters maintained by a trie.
///
/// A trie is exclusively owned by one caller, so plain counters suffice.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrieMetrics {
    /// Number of Keccak-256 computations performed by hashing.
    pub num_hashes: u64,
    /// Number of pages allocated.
    pub pages_allocated: u64,
    /// Number of leaf splits performed by puts.
    pub leaf_splits: u64,
}

impl TrieMetrics {
    /// Creates a zeroed metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the difference against an earlier snapshot.
    pub fn diff(&self, earlier: &TrieMetrics) -> TrieMetrics {
        TrieMetrics {
            num_hashes: self.num_hashes.saturating_sub(earlier.num_hashes),
            pages_allocated: self.pages_allocated.saturating_sub(earlier.pages_allocated),
            leaf_splits: self.leaf_splits.saturating_sub(earlier.leaf_splits),
        }
    }
}

impl std::fmt::Display for TrieMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Trie metrics:")?;
        writeln!(f, "  Hashes:          {}", self.num_hashes)?;
        writeln!(f, "  Pages allocated: {}", self.pages_allocated)?;
        writeln!(f, "  Leaf splits:     {}", self.leaf_splits)?;
        Ok(())
    }
}
