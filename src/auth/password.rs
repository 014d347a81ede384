use sha2::{Digest, Sha256};

// Salted SHA-256, kept for compatibility with digests already in storage.
// Not a production password scheme; there is no per-user salt or stretching.

pub fn hash_password(salt: &str, plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(salt: &str, plain: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_password(salt, plain).as_bytes(), stored_hash.as_bytes())
}

/// Equality that inspects every byte regardless of where the first
/// mismatch sits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
