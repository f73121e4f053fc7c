//! Universal Measurement Identifiers
//!
//! Minted once, when a measurement lock commits. The identifier ties the
//! committed vector to the instant it was locked and carries a random
//! component, so two cycles that commit identical values still get
//! different identifiers.
//!
//! ```text
//! UMI_20250114T093015_3fa9c2e01b7d_9e1f04c2
//! ^^^^ ^^^^^^^^^^^^^^^ ^^^^^^^^^^^^ ^^^^^^^^
//! |    lock instant    content hash random token
//! prefix (UTC)         (sha256, 12) (uuid v4, 8)
//! ```
//!
//! The content hash covers the little-endian bytes of every committed
//! component, so equal vectors always share it.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix of every identifier
pub const UMI_PREFIX: &str = "UMI_";

const HASH_CHARS: usize = 12;
const TOKEN_CHARS: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Opaque identifier of one committed measurement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniversalMeasurementId(String);

impl UniversalMeasurementId {
    /// Mint an identifier for `committed`, locked at `locked_at`
    pub fn mint(committed: &[f64], locked_at: DateTime<Utc>) -> Self {
        let mut hasher = Sha256::new();
        for component in committed {
            hasher.update(component.to_le_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        let token = Uuid::new_v4().simple().to_string();

        Self(format!(
            "{}{}_{}_{}",
            UMI_PREFIX,
            locked_at.format(TIMESTAMP_FORMAT),
            &digest[..HASH_CHARS],
            &token[..TOKEN_CHARS]
        ))
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Content-hash segment
    pub fn content_hash(&self) -> Option<&str> {
        self.0.split('_').nth(2)
    }

    /// Consume into the identifier text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UniversalMeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UniversalMeasurementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
