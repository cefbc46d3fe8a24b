use std::fmt;

use sha2::{Digest, Sha256};

const DIGEST_LEN: usize = 32;

/// SHA-256 digest of a byte blob, used as the deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; DIGEST_LEN]);

impl Fingerprint {
    pub fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(DIGEST_LEN * 2);
        for byte in self.0.iter() {
            use std::fmt::Write;
            let _ = write!(&mut hex, "{byte:02x}");
        }
        hex
    }

    /// Parse a 64 character hex string (either case). Returns `None` on any malformed input.
    pub fn from_hex(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() != DIGEST_LEN * 2 || !input.is_ascii() {
            return None;
        }
        let mut digest = [0u8; DIGEST_LEN];
        for (slot, pair) in digest.iter_mut().zip(input.as_bytes().chunks(2)) {
            let text = std::str::from_utf8(pair).ok()?;
            *slot = u8::from_str_radix(text, 16).ok()?;
        }
        Some(Self(digest))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub trait ContentHasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> Fingerprint;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, bytes: &[u8]) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Fingerprint(hasher.finalize().into())
    }
}
