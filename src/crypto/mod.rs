//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing and domain separation
//! - ECDSA key management (secp256k1)
//! - Authentication key derivation

pub mod hash;
pub mod keys;

pub use hash::{domain_prefix, sha256, sha256_concat, sha256_hex};
pub use keys::{
    authentication_key, sign_message, verify_signature, KeyError, KeyPair,
    SECP256K1_SCHEME,
};
