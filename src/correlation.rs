//! # Correlation Identifiers
//!
//! The opaque token that joins a request to its eventual reply across the
//! asynchronous broker boundary. Minted once per request, never reused.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally-unique correlation identifier (128-bit random UUID).
///
/// The sole join key between a submitted work item and its reply. Callers
/// outside the coordinator see it as an opaque string token via `Display`
/// and `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh correlation id
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_minted_ids_are_unique() {
        let ids: HashSet<CorrelationId> = (0..1000).map(|_| CorrelationId::mint()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let id = CorrelationId::mint();
        let token = id.to_string();
        let parsed: CorrelationId = token.parse().expect("token should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_rejects_garbage_tokens() {
        assert!("not-a-correlation-id".parse::<CorrelationId>().is_err());
        assert!("".parse::<CorrelationId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = CorrelationId::mint();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{id}\""));

        let back: CorrelationId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }
}
