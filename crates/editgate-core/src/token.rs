//! Proposal tokens
//!
//! A token is the only handle on a pending proposal. Tokens are SHA-256
//! digests of fresh random entropy and the creation timestamp, so they are
//! unguessable and collisions are negligible.

use chrono::{DateTime, Utc};
use rand::RngCore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bytes of random entropy mixed into each token
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Opaque identifier of a pending proposal
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ProposalToken(String);

impl ProposalToken {
    /// Generate a fresh token
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut entropy = [0u8; TOKEN_ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut entropy);

        let mut hasher = Sha256::new();
        hasher.update(entropy);
        hasher.update(now.timestamp().to_le_bytes());
        hasher.update(now.timestamp_subsec_nanos().to_le_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Token text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for logs and messages
    #[inline]
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ProposalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProposalToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProposalToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for ProposalToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
