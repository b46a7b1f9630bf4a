//! Stable digests.
//!
//! - Dedup fingerprints use FNV-1a 64-bit (`"fnv1a64:<16 hex>"`): cheap,
//!   deterministic, and not a security primitive.
//! - The note content hash recorded in debug runs is SHA-256 (`"sha256:<64 hex>"`).

use sha2::{Digest, Sha256};

pub const FNV1A64_PREFIX: &str = "fnv1a64:";
pub const SHA256_PREFIX: &str = "sha256:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn fnv1a64(parts: &[&[u8]]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            // Unit separator keeps ("ab", "c") distinct from ("a", "bc").
            hash ^= 0x1f;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for b in *part {
            hash ^= (*b) as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Dedup fingerprint over (note id, section id, suggestion type, title).
///
/// The title is whitespace-normalized and lower-cased first so cosmetic
/// differences do not defeat dedup.
pub fn suggestion_fingerprint(note_id: &str, section_id: &str, kind: &str, title: &str) -> String {
    let title = crate::text::normalize_whitespace(title).to_lowercase();
    let hash = fnv1a64(&[
        note_id.as_bytes(),
        section_id.as_bytes(),
        kind.as_bytes(),
        title.as_bytes(),
    ]);
    format!("{FNV1A64_PREFIX}{hash:016x}")
}

/// Content hash of a note's raw text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    let mut out = String::with_capacity(SHA256_PREFIX.len() + 64);
    out.push_str(SHA256_PREFIX);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
