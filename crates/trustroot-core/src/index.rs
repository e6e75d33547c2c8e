//! The Trust Index: the organization's directory of named resources.
//!
//! The index is one document. Callers read it whole, mutate it in memory and
//! write it back whole; there are no partial-field updates. Persistence and
//! encryption are handled by the caller.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::Id;

/// Resource classes tracked by name in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceClass {
    Admin,
    Node,
    Ca,
    Certificate,
    Csr,
}

impl ResourceClass {
    /// All classes, in index order.
    pub const ALL: [ResourceClass; 5] = [
        ResourceClass::Admin,
        ResourceClass::Node,
        ResourceClass::Ca,
        ResourceClass::Certificate,
        ResourceClass::Csr,
    ];
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceClass::Admin => "admin",
            ResourceClass::Node => "node",
            ResourceClass::Ca => "CA",
            ResourceClass::Certificate => "certificate",
            ResourceClass::Csr => "CSR",
        })
    }
}

/// What a pairing key is allowed to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingPurpose {
    /// Admin invitation (`invite` channel).
    Invite,
    /// Node registration (`registration` channel).
    Registration,
}

/// A pairing key held by the organization until its handshake is consumed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingKeyEntry {
    pub key: String,
    pub purpose: PairingPurpose,
    pub tags: BTreeSet<String>,
}

impl fmt::Debug for PairingKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingKeyEntry")
            .field("key", &"[redacted]")
            .field("purpose", &self.purpose)
            .field("tags", &self.tags)
            .finish()
    }
}

/// The organization's Trust Index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustIndex {
    /// Id of the index document itself.
    pub id: Id,
    /// Owning organization.
    pub org_id: Id,
    names: BTreeMap<ResourceClass, BTreeMap<String, Id>>,
    tags: BTreeMap<Id, BTreeSet<String>>,
    pairing_keys: BTreeMap<Id, PairingKeyEntry>,
}

impl TrustIndex {
    /// Create an empty index for an organization.
    pub fn new(id: Id, org_id: Id) -> Self {
        Self {
            id,
            org_id,
            names: BTreeMap::new(),
            tags: BTreeMap::new(),
            pairing_keys: BTreeMap::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Names
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a name to its id.
    pub fn get(&self, class: ResourceClass, name: &str) -> Result<Id> {
        self.names
            .get(&class)
            .and_then(|names| names.get(name))
            .copied()
            .ok_or_else(|| CoreError::NotFound {
                class,
                name: name.to_string(),
            })
    }

    /// Check whether a name is bound in a class.
    pub fn contains(&self, class: ResourceClass, name: &str) -> bool {
        self.get(class, name).is_ok()
    }

    /// Bind a name to an id.
    ///
    /// Re-adding the same binding is a no-op. Binding a taken name to a
    /// different id fails.
    pub fn add(&mut self, class: ResourceClass, name: &str, id: Id) -> Result<()> {
        let names = self.names.entry(class).or_default();
        match names.get(name) {
            Some(existing) if *existing == id => Ok(()),
            Some(_) => Err(CoreError::DuplicateName {
                class,
                name: name.to_string(),
            }),
            None => {
                names.insert(name.to_string(), id);
                Ok(())
            }
        }
    }

    /// Unbind a name, dropping the id's tags. Returns the removed id.
    pub fn remove(&mut self, class: ResourceClass, name: &str) -> Result<Id> {
        let id = self
            .names
            .get_mut(&class)
            .and_then(|names| names.remove(name))
            .ok_or_else(|| CoreError::NotFound {
                class,
                name: name.to_string(),
            })?;
        self.tags.remove(&id);
        Ok(id)
    }

    /// Ids of every resource in a class, ordered by name.
    pub fn list(&self, class: ResourceClass) -> Vec<Id> {
        self.names
            .get(&class)
            .map(|names| names.values().copied().collect())
            .unwrap_or_default()
    }

    /// `(name, id)` pairs of a class, ordered by name.
    pub fn names(&self, class: ResourceClass) -> Vec<(String, Id)> {
        self.names
            .get(&class)
            .map(|names| names.iter().map(|(n, id)| (n.clone(), *id)).collect())
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tags
    // ─────────────────────────────────────────────────────────────────────────

    /// Add normalized tags to an id. Empty elements are skipped.
    pub fn add_tags<I, S>(&mut self, id: Id, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = self.tags.entry(id).or_default();
        set.extend(
            tags.into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty()),
        );
        if set.is_empty() {
            self.tags.remove(&id);
        }
    }

    /// Remove every tag from an id.
    pub fn clear_tags(&mut self, id: &Id) {
        self.tags.remove(id);
    }

    /// Tags of an id (empty if none).
    pub fn tags(&self, id: &Id) -> BTreeSet<String> {
        self.tags.get(id).cloned().unwrap_or_default()
    }

    /// Names in a class carrying the given tag.
    pub fn find_by_tag(&self, class: ResourceClass, tag: &str) -> Vec<String> {
        self.names(class)
            .into_iter()
            .filter(|(_, id)| self.tags.get(id).map_or(false, |t| t.contains(tag)))
            .map(|(name, _)| name)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pairing keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a pairing key.
    pub fn add_pairing_key<I, S>(&mut self, id: Id, key: &str, purpose: PairingPurpose, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .collect();
        self.pairing_keys.insert(
            id,
            PairingKeyEntry {
                key: key.to_string(),
                purpose,
                tags,
            },
        );
    }

    /// Look up a pairing key by id.
    pub fn get_pairing_key(&self, id: &Id) -> Result<&PairingKeyEntry> {
        self.pairing_keys
            .get(id)
            .ok_or_else(|| CoreError::PairingKeyNotFound(id.to_hex()))
    }

    /// Look up a pairing key by id, requiring a purpose.
    pub fn get_pairing_key_for(&self, id: &Id, purpose: PairingPurpose) -> Result<&PairingKeyEntry> {
        match self.get_pairing_key(id)? {
            entry if entry.purpose == purpose => Ok(entry),
            _ => Err(CoreError::PairingKeyNotFound(id.to_hex())),
        }
    }

    /// Remove a pairing key.
    pub fn remove_pairing_key(&mut self, id: &Id) -> Result<PairingKeyEntry> {
        self.pairing_keys
            .remove(id)
            .ok_or_else(|| CoreError::PairingKeyNotFound(id.to_hex()))
    }

    /// Every pairing key id with its entry.
    pub fn pairing_keys(&self) -> impl Iterator<Item = (&Id, &PairingKeyEntry)> {
        self.pairing_keys.iter()
    }
}
