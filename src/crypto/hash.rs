//! Hashing helpers
//!
//! SHA-256 is used for signing messages, authentication keys and the
//! domain separation prefix placed in front of every signed payload.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash of a domain tag, prepended to a payload before signing or hashing
pub fn domain_prefix(tag: &str) -> Vec<u8> {
    sha256(tag.as_bytes())
}

/// Hash over several byte slices, fed in order
pub fn sha256_concat(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_concat_matches_single_buffer() {
        let joined = sha256(b"helloworld");
        let parts = sha256_concat(&[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_domain_prefixes_differ() {
        assert_ne!(domain_prefix("A::One"), domain_prefix("A::Two"));
        assert_eq!(domain_prefix("A::One").len(), 32);
    }
}
