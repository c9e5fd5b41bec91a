//! Identity hash: the 32-bit key under which a logical name is indexed.
//!
//! One byte at a time: XOR the byte in, multiply by an odd constant, then
//! fold the high bits down with a right shift by 15.  The embedder and the
//! runtime lookup must agree on both constants; changing either one makes
//! every previously built index unreadable.

/// Initial accumulator value.
pub const IDENTITY_SEED: u32 = 0x9747_B28C;
/// Odd multiplier applied after every byte.
pub const IDENTITY_MULTIPLIER: u32 = 0x5BD1_E995;

/// Hash a logical name.  Collisions are possible and are not detected here.
pub fn identity_hash(name: &str) -> u32 {
    identity_hash_bytes(name.as_bytes())
}

pub fn identity_hash_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(IDENTITY_SEED, |mut h, &b| {
        h ^= b as u32;
        h = h.wrapping_mul(IDENTITY_MULTIPLIER);
        h ^ (h >> 15)
    })
}
