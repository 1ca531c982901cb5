//! Content fingerprinting — SHA-256 identity for the dedup gate
//!
//! The fingerprint is computed over the exact bytes of the artifact, so two
//! uploads of the same content collapse to one identity no matter what they
//! were named or how they were declared.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-addressed identity (SHA-256, lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of raw content
    pub fn identify(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_content_identical_fingerprint() {
        let a = Fingerprint::identify(b"the same bytes");
        let b = Fingerprint::identify(b"the same bytes");
        assert_eq!(a, b, "identical bytes must fingerprint identically");
    }

    #[test]
    fn test_single_byte_change_differs() {
        let a = Fingerprint::identify(b"the same bytes");
        let b = Fingerprint::identify(b"the same byteZ");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_shape() {
        let fp = Fingerprint::identify(b"");
        assert_eq!(fp.as_str().len(), 64);
        // Well-known SHA-256 of the empty input
        assert_eq!(
            fp.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fp.short().len(), 12);
    }
}
