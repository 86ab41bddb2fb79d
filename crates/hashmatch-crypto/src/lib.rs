//! hashmatch-crypto: keyed pseudonymization of identifiers
//!
//! ```text
//! KeyProvider ──resolve()──▶ SecretKey ──▶ Hasher
//!   ├── ExplicitKey   (caller-supplied string, no side effects)
//!   └── FileKeyStore  (load raw bytes, or generate 32 random bytes and persist)
//!
//! Hasher::digest(identifier) = hex(HMAC-SHA256(key, utf8(identifier)))
//! ```
//!
//! The digest is a pure function of (key, identifier): the same pair always
//! yields the same 64-char lowercase hex string, and different keys yield
//! unrelated digests.

pub mod hasher;
pub mod keys;

pub use hasher::{digest, digest_bytes, verify, Hasher};
pub use keys::{ExplicitKey, FileKeyStore, KeyProvider, KeyResolver, SecretKey};

/// Size of an internally generated key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;
