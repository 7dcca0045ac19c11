//! Content hashing utilities using SHA-256
//!
//! This module provides the ContentHash type used as the deduplication key of
//! the attachment cache.

use ghostlog_core::error::GhostlogError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 content hash for content-addressable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash {
    /// The raw digest bytes
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Convert hash to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Create ContentHash from hexadecimal string
    pub fn from_hex(hex_str: &str) -> Result<Self, GhostlogError> {
        let bytes = hex::decode(hex_str).map_err(|e| GhostlogError::InvalidHash {
            reason: format!("invalid hex: {}", e),
        })?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| GhostlogError::InvalidHash {
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = GhostlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Compute SHA-256 hash of content
pub fn compute_hash(content: &[u8]) -> ContentHash {
    ContentHash::new(Sha256::digest(content).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_invalid_length() {
        assert!(ContentHash::from_hex(&"ab".repeat(16)).is_err());
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::from_hex("not hex").is_err());
    }

    #[test]
    fn test_compute_hash_known_digest() {
        let content = b"hello world";
        let hash = compute_hash(content);

        assert_eq!(
            hash.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(hash, compute_hash(content));
        assert_ne!(hash, compute_hash(b"hello world!"));
    }

    #[test]
    fn test_parse_from_str() {
        let hash = compute_hash(b"abc");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }
}
