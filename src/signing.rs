//! Payment-backend signature scheme.
//!
//! Both checkout verification and settlement signing use the same
//! construction: base64(SHA-1(key || data || key)). It lives here so the two
//! call sites cannot drift apart.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha1::{Digest, Sha1};

/// Computes the signature over `data` with the shared private key.
pub fn sign(data: &str, key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(key.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Compares the expected signature for `data` against a provided one in
/// constant time.
pub fn matches(data: &str, key: &str, provided: &str) -> bool {
    constant_time_eq(&sign(data, key), provided)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
