//! Content digests for structural-equality checks.
//!
//! Objects and compound properties expose a 16-byte digest over their own
//! directory and their children. The only contract is that structurally
//! equal subtrees produce equal digests; callers use it to verify trees
//! without deep comparison (the layering identity tests rely on this).

use md5::{Digest as _, Md5};

/// 128-bit content digest.
pub type Digest = [u8; 16];

/// Digest of a single byte buffer.
#[inline]
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Incremental digest builder.
///
/// Every update is length-prefixed so that field boundaries cannot alias
/// (`"ab" + "c"` and `"a" + "bc"` digest differently).
pub struct Hasher {
    inner: Md5,
}

impl Hasher {
    /// Start a fresh digest.
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    /// Mix in a byte buffer.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update((data.len() as u64).to_le_bytes());
        self.inner.update(data);
    }

    /// Mix in a string.
    pub fn update_str(&mut self, s: &str) {
        self.update(s.as_bytes());
    }

    /// Mix in an integer.
    pub fn update_u64(&mut self, v: u64) {
        self.inner.update(v.to_le_bytes());
    }

    /// Mix in a finished child digest.
    pub fn update_digest(&mut self, d: &Digest) {
        self.inner.update(d);
    }

    /// Finish and return the digest.
    pub fn finish(self) -> Digest {
        self.inner.finalize().into()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[test]
    fn test_hasher_field_boundaries() {
        let mut a = Hasher::new();
        a.update_str("ab");
        a.update_str("c");
        let mut b = Hasher::new();
        b.update_str("a");
        b.update_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_hasher_matches_itself() {
        let build = || {
            let mut h = Hasher::new();
            h.update_str("name");
            h.update_u64(3);
            h.update(&[1, 2, 3]);
            h.finish()
        };
        assert_eq!(build(), build());
    }
}
