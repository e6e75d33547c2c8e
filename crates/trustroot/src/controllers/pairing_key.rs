//! Node registration pairing keys.

use std::collections::BTreeSet;

use tracing::info;
use trustroot_core::{Id, PairingPurpose};
use trustroot_seal::{Identity, PairingKey};
use trustroot_store::Backend;

use crate::environment::Environment;
use crate::error::{validation, Result};
use crate::params::resolve_tags;

/// A pairing key as stored in the index.
#[derive(Debug, Clone)]
pub struct PairingKeyInfo {
    pub key: PairingKey,
    pub purpose: PairingPurpose,
    pub tags: BTreeSet<String>,
}

pub struct PairingKeys<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> PairingKeys<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Issue a registration key. Nodes registering with it get `tags`.
    pub async fn new_key(&self, tags: Option<&str>) -> Result<PairingKey> {
        let ctx = self.env.admin_context().await?;
        let pairing = PairingKey::generate();
        let (id, secret) = (pairing.id, pairing.secret().to_string());
        let tags = resolve_tags(tags, "");
        self.env
            .update_index(&ctx, move |index| {
                index.add_pairing_key(id, &secret, PairingPurpose::Registration, tags);
                Ok(())
            })
            .await?;
        info!(org = %ctx.org.id(), pairing_key = %id, "issued pairing key");
        Ok(pairing)
    }

    /// Outstanding pairing keys of every purpose, without secrets.
    pub async fn list(&self) -> Result<Vec<(Id, PairingPurpose, BTreeSet<String>)>> {
        let ctx = self.env.admin_context().await?;
        let index = self.env.load_index(&ctx).await?;
        Ok(index
            .pairing_keys()
            .map(|(id, entry)| (*id, entry.purpose, entry.tags.clone()))
            .collect())
    }

    pub async fn show(&self, id: &Id) -> Result<PairingKeyInfo> {
        let ctx = self.env.admin_context().await?;
        let index = self.env.load_index(&ctx).await?;
        let entry = index.get_pairing_key(id)?;
        Ok(PairingKeyInfo {
            key: PairingKey::new(*id, entry.key.clone()),
            purpose: entry.purpose,
            tags: entry.tags.clone(),
        })
    }

    pub async fn delete(&self, id: &Id, confirm: bool) -> Result<()> {
        if !confirm {
            return Err(validation(format!("deleting pairing key {id} requires confirmation")));
        }
        let ctx = self.env.admin_context().await?;
        let id = *id;
        self.env
            .update_index(&ctx, move |index| Ok(index.remove_pairing_key(&id).map(|_| ())?))
            .await?;
        info!(org = %ctx.org.id(), pairing_key = %id, "deleted pairing key");
        Ok(())
    }
}
