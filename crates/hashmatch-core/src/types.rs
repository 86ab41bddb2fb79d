use std::fmt;

/// Length of a rendered HMAC-SHA256 digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// A keyed digest of one identifier, always 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Hex-encode a raw 32-byte MAC output.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a digest read back from a record stream.
    ///
    /// Surrounding whitespace is ignored and uppercase hex is folded to
    /// lowercase. Returns `None` for anything that is not 64 hex chars.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.len() != DIGEST_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "b613679a0814d9ec772f95d778c35fc5ff1697c493715653c6c712144292c5ad";

    #[test]
    fn test_from_bytes_is_lowercase_hex() {
        let d = Digest::from_bytes([0xABu8; 32]);
        assert_eq!(d.as_str().len(), DIGEST_HEX_LEN);
        assert!(d.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_parse_accepts_valid() {
        let d = Digest::parse(SAMPLE).unwrap();
        assert_eq!(d.as_str(), SAMPLE);
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let upper = format!("  {}\t", SAMPLE.to_uppercase());
        assert_eq!(Digest::parse(&upper).unwrap().as_str(), SAMPLE);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(Digest::parse(&SAMPLE[..63]).is_none());
        assert!(Digest::parse(&format!("{SAMPLE}0")).is_none());
        assert!(Digest::parse("").is_none());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = format!("{}z", &SAMPLE[..63]);
        assert!(Digest::parse(&bad).is_none());
    }
}
