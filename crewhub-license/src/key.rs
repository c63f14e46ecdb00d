//! License key generation and parsing.
//!
//! Keys use the canonical format: `CCC-XXXX-XXXX-XXXX-XXXX`
//!
//! - `CCC` is the three-letter tier code (`BAS`, `STD`, `PRO`, `ENT`, `ULT`)
//! - each `XXXX` group is four uppercase hex characters drawn from a
//!   SHA-256 digest over the tier code, the recipient identity, the issue
//!   time in milliseconds, and a random 16-byte nonce
//!
//! The generator only ever emits this shape and the parser only ever
//! accepts it; un-prefixed four-group keys are rejected. Keys are stored
//! and compared through their SHA-256 hex hash, never in cleartext
//! equality checks.

use crate::error::{LicenseError, LicenseResult};
use chrono::Utc;
use crewhub_types::Tier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex groups following the tier prefix.
pub const KEY_GROUPS: usize = 4;

/// Characters per hex group.
pub const GROUP_LEN: usize = 4;

/// A canonical, tier-prefixed license key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseKey {
    text: String,
    tier: Tier,
}

impl LicenseKey {
    /// Generates a fresh key for the given tier and recipient.
    ///
    /// The recipient identity (email for purchases, machine id for trials)
    /// is folded into the digest so keys issued in the same millisecond to
    /// different recipients still differ even before the nonce is mixed in.
    #[must_use]
    pub fn generate(tier: Tier, recipient: &str) -> Self {
        let nonce: [u8; 16] = rand::random();

        let mut hasher = Sha256::new();
        hasher.update(tier.code().as_bytes());
        hasher.update(recipient.as_bytes());
        hasher.update(Utc::now().timestamp_millis().to_be_bytes());
        hasher.update(nonce);
        let digest = hex::encode_upper(hasher.finalize());

        let mut text = String::from(tier.code());
        for group in 0..KEY_GROUPS {
            text.push('-');
            text.push_str(&digest[group * GROUP_LEN..(group + 1) * GROUP_LEN]);
        }

        Self { text, tier }
    }

    /// Parses user-supplied key text into its canonical form.
    ///
    /// Input is trimmed and uppercased before validation, so keys survive
    /// copy-paste with surrounding whitespace or lowercased hex.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKeyFormat`] describing the first
    /// structural problem found.
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(LicenseError::InvalidKeyFormat("key is empty".to_string()));
        }

        let parts: Vec<&str> = normalized.split('-').collect();
        if parts.len() == KEY_GROUPS {
            return Err(LicenseError::InvalidKeyFormat(
                "key is missing its tier prefix".to_string(),
            ));
        }
        if parts.len() != KEY_GROUPS + 1 {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "key must have a tier prefix and {KEY_GROUPS} groups, found {} parts",
                parts.len()
            )));
        }

        let tier = Tier::from_code(parts[0])
            .map_err(|e| LicenseError::InvalidKeyFormat(format!("unrecognized tier code: {}", e.0)))?;

        for group in &parts[1..] {
            if group.len() != GROUP_LEN || !group.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(LicenseError::InvalidKeyFormat(format!(
                    "group {group:?} must be {GROUP_LEN} hex characters"
                )));
            }
        }

        Ok(Self {
            text: normalized,
            tier,
        })
    }

    /// Returns the canonical key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the tier encoded in the key prefix.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Returns the SHA-256 hex digest of the canonical key text.
    ///
    /// This is the ledger identity of the key; active licenses are keyed
    /// by it and lookups never compare raw key text.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Returns true if the input parses as a canonical license key.
#[must_use]
pub fn is_valid_format(input: &str) -> bool {
    LicenseKey::parse(input).is_ok()
}
