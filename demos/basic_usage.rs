//! Basic usage of sextant_db: put, get, and batched root hashing.
//!
//! Run with: cargo run --example basic_usage

use sextant_db::merkle::Trie;
use sextant_db::store::MAX_VALUE_LEN;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut trie = Trie::with_max_chunks(1 << 20)?;

    // Point writes. The root is not recomputed here.
    trie.put(b"alice", b"100");
    trie.put(b"carol", b"250");
    trie.put(b"frank", b"775");

    // Point reads copy the value into a caller buffer.
    let mut value_buf = [0u8; MAX_VALUE_LEN];
    let balance = trie.get(b"carol", &mut value_buf).unwrap();
    println!("carol -> {}", String::from_utf8_lossy(balance));

    // Committing a batch recomputes the Merkle root over the updated
    // keys, which must be sorted.
    let root = trie.hash(&[b"alice", b"carol", b"frank"]);
    println!("root: {:02x?}", root.as_bytes());
    println!("keccak invocations: {}", trie.num_hashes());

    // Overwriting and re-committing moves the root.
    trie.put(b"carol", b"0");
    let new_root = trie.hash(&[b"carol"]);
    assert_ne!(root, new_root);
    println!("root after update: {:02x?}", new_root.as_bytes());

    println!("{:?}", trie);
    Ok(())
}
