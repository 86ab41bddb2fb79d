//! HMAC-SHA256 identifier hashing
//!
//! The digest is deterministic (same key + identifier = same digest) so that
//! two hashed lists produced under one key can be compared by plain equality.

use hashmatch_core::{Digest, HashmatchError, HashmatchResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::keys::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Compute `hex(HMAC-SHA256(key, identifier))`.
pub fn digest(key: &SecretKey, identifier: &str) -> Digest {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(identifier.as_bytes());
    let bytes: [u8; 32] = mac.finalize().into_bytes().into();
    Digest::from_bytes(bytes)
}

/// Hash a raw record value, rejecting bytes that are not valid UTF-8.
///
/// Invalid input is an error rather than a lossy digest.
pub fn digest_bytes(key: &SecretKey, raw: &[u8]) -> HashmatchResult<Digest> {
    let identifier = std::str::from_utf8(raw).map_err(|e| {
        HashmatchError::Encoding(format!("identifier is not valid UTF-8: {e}"))
    })?;
    Ok(digest(key, identifier))
}

/// Check whether `candidate` is the digest of `identifier` under `key`.
///
/// The candidate is parsed like any digest read from a file (case-folded,
/// trimmed); the comparison itself runs in constant time.
pub fn verify(key: &SecretKey, identifier: &str, candidate: &str) -> bool {
    let Some(candidate) = Digest::parse(candidate) else {
        return false;
    };
    let computed = digest(key, identifier);
    computed
        .as_str()
        .as_bytes()
        .ct_eq(candidate.as_str().as_bytes())
        .into()
}

/// A resolved key bound for per-record hashing.
#[derive(Debug, Clone)]
pub struct Hasher {
    key: SecretKey,
}

impl Hasher {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    pub fn digest(&self, identifier: &str) -> Digest {
        digest(&self.key, identifier)
    }

    pub fn digest_bytes(&self, raw: &[u8]) -> HashmatchResult<Digest> {
        digest_bytes(&self.key, raw)
    }

    pub fn verify(&self, identifier: &str, candidate: &str) -> bool {
        verify(&self.key, identifier, candidate)
    }

    pub fn fingerprint(&self) -> String {
        self.key.fingerprint()
    }
}
