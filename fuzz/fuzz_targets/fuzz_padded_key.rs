#![no_main]

use libfuzzer_sys::fuzz_target;
use sextant_db::data::{common_prefix_bit_len, PaddedKey, MAX_KEY_LEN};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > MAX_KEY_LEN {
        return;
    }

    let padded = PaddedKey::new(data);

    // Shape invariants.
    assert_eq!(padded.len(), (data.len() * 8 + 5) / 6);
    assert_eq!(padded.partial_bits() as usize, 2 * (data.len() % 3));
    for &b in padded.as_bytes() {
        assert!(b & 0xc0 == 0, "high bits must be zero");
    }

    // The padding regroups the bit stream without reordering: the
    // original key is recoverable.
    let mut recovered = Vec::with_capacity(data.len());
    let mut acc: u32 = 0;
    let mut acc_bits = 0;
    for &p in padded.as_bytes() {
        acc = acc << 6 | p as u32;
        acc_bits += 6;
        if acc_bits >= 8 && recovered.len() < data.len() {
            recovered.push((acc >> (acc_bits - 8)) as u8);
            acc_bits -= 8;
        }
    }
    assert_eq!(recovered, data);

    // A key shares its full bit length with itself.
    assert_eq!(common_prefix_bit_len(data, data), data.len() * 8);
});
