//! Core data representations for trie navigation.

mod padded_key;

pub use padded_key::{common_prefix_bit_len, PaddedKey, MAX_KEY_LEN, MAX_KEY_LEN_PADDED};
