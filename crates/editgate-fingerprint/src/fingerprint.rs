//! Fingerprint value type
//!
//! Provides [`Fingerprint`], a strongly-typed 32-byte BLAKE3 digest of a
//! file's exact bytes, used as the optimistic-concurrency token throughout
//! editgate.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Length of a fingerprint in bytes
pub const FINGERPRINT_LEN: usize = 32;

/// A 32-byte content fingerprint (BLAKE3)
///
/// Two reads of an unchanged file produce the same fingerprint; any byte-level
/// change produces a different one. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Create a fingerprint from raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Create fingerprint from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintParseError> {
        let arr: [u8; FINGERPRINT_LEN] =
            bytes
                .try_into()
                .map_err(|_| FingerprintParseError::InvalidLength {
                    expected: FINGERPRINT_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Fingerprint an in-memory buffer
    #[inline]
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars), for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Self::new(*hash.as_bytes())
    }
}

impl AsRef<[u8; FINGERPRINT_LEN]> for Fingerprint {
    fn as_ref(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

// Lowercase hex string on the wire
impl serde::Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a fingerprint supplied by a caller
#[derive(Debug, thiserror::Error)]
pub enum FingerprintParseError {
    /// Invalid digest length
    #[error("invalid fingerprint length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("fingerprint is not valid hex: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn of_bytes_is_deterministic() {
        let h1 = Fingerprint::of_bytes(b"line 1\nline 2\n");
        let h2 = Fingerprint::of_bytes(b"line 1\nline 2\n");
        assert_eq!(h1, h2);
    }

    #[test]
    fn single_byte_change_changes_fingerprint() {
        let h1 = Fingerprint::of_bytes(b"line 1\nline 2\n");
        let h2 = Fingerprint::of_bytes(b"line 1\nline 3\n");
        assert_ne!(h1, h2);
    }

    #[test]
    fn trailing_newline_is_significant() {
        assert_ne!(Fingerprint::of_bytes(b"a"), Fingerprint::of_bytes(b"a\n"));
    }

    #[test]
    fn display_and_parse() {
        let fp = Fingerprint::of_bytes(b"test");
        let s = fp.to_string();
        assert_eq!(s.len(), 64);
        let parsed: Fingerprint = s.parse().unwrap();
        assert_eq!(fp, parsed);
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let fp = Fingerprint::of_bytes(b"test");
        let parsed: Fingerprint = format!("  {fp}\n").parse().unwrap();
        assert_eq!(fp, parsed);
    }

    #[test]
    fn parse_rejects_short_input() {
        let result = "abcd".parse::<Fingerprint>();
        assert!(matches!(
            result,
            Err(FingerprintParseError::InvalidLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn parse_rejects_non_hex() {
        let result = "zz".repeat(32).parse::<Fingerprint>();
        assert!(matches!(result, Err(FingerprintParseError::HexDecode(_))));
    }

    #[test]
    fn short_is_prefix() {
        let fp = Fingerprint::of_bytes(b"test");
        assert_eq!(fp.short().len(), 16);
        assert!(fp.to_string().starts_with(&fp.short()));
    }

    #[test]
    fn serde_json_uses_hex() {
        let fp = Fingerprint::of_bytes(b"test");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{fp}\""));
        let decoded: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, decoded);
    }

    #[test]
    fn serde_json_rejects_malformed_hex() {
        assert!(serde_json::from_str::<Fingerprint>("\"abcd\"").is_err());
        assert!(serde_json::from_str::<Fingerprint>("[1, 2, 3]").is_err());
    }

    proptest! {
        #[test]
        fn distinct_inputs_yield_distinct_fingerprints(
            a in proptest::collection::vec(any::<u8>(), 0..256),
            b in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(Fingerprint::of_bytes(&a), Fingerprint::of_bytes(&b));
        }
    }
}
