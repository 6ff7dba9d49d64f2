//! MurmurHash2, 32-bit, seeded with the input length.
//!
//! MurmurHash2 was written by Austin Appleby and placed in the public
//! domain. Not cryptographic; hashes are only ever compared within one
//! table instance and are never persisted, so cross-run stability is not
//! part of the contract.

const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// Hash a byte string. Deterministic for identical input within a run.
pub(crate) fn hash_bytes(data: &[u8]) -> u32 {
    let mut h = data.len() as u32;

    // Mix 4 bytes at a time. Little-endian composition on every target;
    // the probe sequence only needs consistency, not a fixed byte order.
    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    // Fold in the 0-3 remaining tail bytes.
    let tail = blocks.remainder();
    if !tail.is_empty() {
        if tail.len() == 3 {
            h ^= u32::from(tail[2]) << 16;
        }
        if tail.len() >= 2 {
            h ^= u32::from(tail[1]) << 8;
        }
        h ^= u32::from(tail[0]);
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;

    h
}
