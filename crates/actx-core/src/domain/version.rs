//! Version records and their content-derived identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::error::{ContextError, Result};

/// SHA-256 digest of a serialized version record, used as its identifier.
///
/// Identifiers are opaque: compare for equality only. They carry no
/// recency ordering (history order comes from parent links).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionId([u8; 32]);

impl VersionId {
    /// Compute the identifier for a serialized version record.
    pub fn compute(record_bytes: &[u8]) -> Self {
        let hash = Sha256::digest(record_bytes);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for log lines and terminal output.
    pub fn short(&self) -> String {
        self.to_hex().chars().take(8).collect()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.short())
    }
}

impl FromStr for VersionId {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| ContextError::VersionNotFound {
            id: s.to_string(),
        })?;
        if bytes.len() != 32 {
            return Err(ContextError::VersionNotFound { id: s.to_string() });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

// Hex in JSON, both in stored records and tool payloads.
impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One immutable version of the context blob.
///
/// The identifier is not stored in the record: it is recomputed as the
/// digest of the record's serialized bytes, so it is a deterministic
/// function of content, parent, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub parent: Option<VersionId>,
    pub branch: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl Version {
    /// Serialize to the canonical byte form the identifier is derived from.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn id(&self) -> Result<VersionId> {
        Ok(VersionId::compute(&self.canonical_bytes()?))
    }

    pub fn summary(&self, id: VersionId) -> VersionSummary {
        VersionSummary {
            id,
            message: self.message.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// History/search row: a version without its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: VersionId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One page of branch history, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub versions: Vec<VersionSummary>,
    pub total_versions: usize,
    pub has_more: bool,
}

/// Point-in-time content fetched by version identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub content: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
