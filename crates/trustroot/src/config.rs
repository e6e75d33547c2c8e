//! Configuration.
//!
//! [`TrustConfig`] holds tunables and is read from a JSON file. [`LocalConfig`]
//! records which identities this home holds; it is kept as a JSON document in
//! the home store.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trustroot_core::Id;
use trustroot_x509::KeyType;

use crate::error::{Result, TrustError};

/// What happens to a handshake item that cannot be processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteFailurePolicy {
    /// Push the item back onto its channel unchanged.
    #[default]
    Requeue,
    /// Move the item to `<channel>.dead`.
    DeadLetter,
}

/// Tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Outstanding CSRs a node keeps on its `csrs` channel.
    pub min_csrs: usize,
    /// Policy for invites, registrations and CSRs that fail processing.
    pub invite_failure_policy: InviteFailurePolicy,
    pub ca_expiry_days: u32,
    pub cert_expiry_days: u32,
    pub key_type: KeyType,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            min_csrs: 5,
            invite_failure_policy: InviteFailurePolicy::Requeue,
            ca_expiry_days: 3650,
            cert_expiry_days: 365,
            key_type: KeyType::Ed25519,
        }
    }
}

impl TrustConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TrustError::File {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }
}

/// Organization reference held by an admin home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRef {
    pub id: Id,
    pub name: String,
}

/// Pairing credential a node keeps until its registration completes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPairing {
    pub id: Id,
    pub key: String,
}

impl std::fmt::Debug for PendingPairing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPairing")
            .field("id", &self.id)
            .field("key", &"[redacted]")
            .finish()
    }
}

/// A node identity held by this home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: Id,
    pub org_id: Id,
    /// Present until `complete` has received the organization handshake.
    pub pairing: Option<PendingPairing>,
}

/// Identities held by one home store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub org: Option<OrgRef>,
    pub admin_id: Option<Id>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrustConfig::default();
        assert_eq!(config.min_csrs, 5);
        assert_eq!(config.invite_failure_policy, InviteFailurePolicy::Requeue);
    }

    #[test]
    fn test_partial_json() {
        let config =
            TrustConfig::from_json(r#"{"min_csrs": 2, "invite_failure_policy": "dead_letter"}"#)
                .unwrap();
        assert_eq!(config.min_csrs, 2);
        assert_eq!(config.invite_failure_policy, InviteFailurePolicy::DeadLetter);
        assert_eq!(config.cert_expiry_days, 365);
    }

    #[test]
    fn test_key_type_json() {
        let config = TrustConfig::from_json(r#"{"key_type": "ecdsa-p384"}"#).unwrap();
        assert_eq!(config.key_type, KeyType::EcdsaP384);
        assert!(TrustConfig::from_json(r#"{"min_csrs": "many"}"#).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = TrustConfig::load("/nonexistent/trustroot.json").await.unwrap_err();
        assert!(matches!(err, TrustError::File { .. }));
    }

    #[test]
    fn test_pending_pairing_debug_redacted() {
        let pending = PendingPairing {
            id: Id::generate(),
            key: "topsecret".into(),
        };
        assert!(!format!("{pending:?}").contains("topsecret"));
    }
}
