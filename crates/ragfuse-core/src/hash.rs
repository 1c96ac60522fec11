//! Stable hashing helpers.
//!
//! `stable_hash` backs every deterministic mock, so it must not depend on
//! process-random state the way `std::collections::hash_map::DefaultHasher` does.

use std::hash::Hasher;
use twox_hash::XxHash64;

/// 64-bit xxhash of `text` with a fixed seed.
pub fn stable_hash(text: &str) -> u64 {
    stable_hash_seeded(text, 0)
}

pub fn stable_hash_seeded(text: &str, seed: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// Chunk identifier derived from the owning document and position.
pub fn chunk_id(doc_id: &str, chunk_index: usize) -> String {
    let key = format!("{doc_id}:{chunk_index}");
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_is_repeatable() {
        assert_eq!(stable_hash("what is rrf"), stable_hash("what is rrf"));
        assert_ne!(stable_hash("a"), stable_hash("b"));
        assert_ne!(stable_hash_seeded("a", 1), stable_hash_seeded("a", 2));
    }

    #[test]
    fn chunk_ids_differ_by_position() {
        assert_ne!(chunk_id("doc", 0), chunk_id("doc", 1));
        assert_eq!(chunk_id("doc", 3).len(), 64);
    }
}
