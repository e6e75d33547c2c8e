//! The environment: store handles, configuration and the loaded identities
//! a controller call works with.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use trustroot_core::{from_cbor, to_cbor, CoreError, Id, ResourceClass, TrustIndex};
use trustroot_seal::{
    Container, Entity, EntityKind, Identity, PrivateIdentity, PublicEntity,
};
use trustroot_store::Backend;

use crate::config::{LocalConfig, NodeRef, TrustConfig};
use crate::controllers::{
    Admins, CaController, Certificates, Csrs, Nodes, Orgs, PairingKeys,
};
use crate::error::{Result, TrustError};
use crate::resource::Resource;

/// Label of the organization's index document, derived from the org id.
const INDEX_LABEL: &str = "index";
/// Label of the local configuration slot in a home store.
const LOCAL_CONFIG_LABEL: &str = "local-config";

/// Id of the index document owned by `owner`.
pub fn index_id(owner: &Id) -> Id {
    Id::derive(owner, INDEX_LABEL)
}

/// Identities loaded for an organization-side call.
pub struct AdminContext {
    pub org: Entity,
    pub admin: Entity,
}

/// Identities loaded for a node-side call.
pub struct NodeContext {
    pub name: String,
    pub node: Entity,
    pub node_ref: NodeRef,
    /// Known once the registration handshake has completed.
    pub org: Option<PublicEntity>,
}

impl NodeContext {
    /// The organization identity, required for certificate delivery.
    pub fn org(&self) -> Result<&PublicEntity> {
        self.org.as_ref().ok_or_else(|| {
            TrustError::NotConfigured(format!(
                "node '{}' has not completed registration",
                self.name
            ))
        })
    }
}

/// Store handles and configuration.
///
/// `api` is the store shared between parties: public identities, encrypted
/// objects and queues. `home` is private to this operator and holds its own
/// private identities and [`LocalConfig`].
pub struct Environment<B: Backend> {
    api: Arc<B>,
    home: Arc<B>,
    config: TrustConfig,
}

impl<B: Backend> Clone for Environment<B> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            home: Arc::clone(&self.home),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend> Environment<B> {
    pub fn new(api: Arc<B>, home: Arc<B>, config: TrustConfig) -> Self {
        Self { api, home, config }
    }

    /// Same stores, different configuration.
    pub fn with_config(&self, config: TrustConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn api(&self) -> &B {
        &self.api
    }

    pub fn home(&self) -> &B {
        &self.home
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Controllers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn orgs(&self) -> Orgs<'_, B> {
        Orgs::new(self)
    }

    pub fn admins(&self) -> Admins<'_, B> {
        Admins::new(self)
    }

    pub fn nodes(&self) -> Nodes<'_, B> {
        Nodes::new(self)
    }

    pub fn cas(&self) -> CaController<'_, B> {
        CaController::new(self)
    }

    pub fn certificates(&self) -> Certificates<'_, B> {
        Certificates::new(self)
    }

    pub fn csrs(&self) -> Csrs<'_, B> {
        Csrs::new(self)
    }

    pub fn pairing_keys(&self) -> PairingKeys<'_, B> {
        PairingKeys::new(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local configuration
    // ─────────────────────────────────────────────────────────────────────────

    fn local_config_slot() -> Id {
        Id::derive(&Id::ZERO, LOCAL_CONFIG_LABEL)
    }

    /// Identities held by this home. Empty if nothing was saved yet.
    pub async fn local_config(&self) -> Result<LocalConfig> {
        match self
            .home
            .get_private(&Id::ZERO, &Self::local_config_slot())
            .await
        {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.is_not_found() => Ok(LocalConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn save_local_config(&self, config: &LocalConfig) -> Result<()> {
        let json = serde_json::to_vec(config)?;
        self.home
            .send_private(&Id::ZERO, &Self::local_config_slot(), &json)
            .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the admin and the organization it can decrypt.
    pub async fn admin_context(&self) -> Result<AdminContext> {
        let local = self.local_config().await?;
        let org_ref = local
            .org
            .ok_or_else(|| TrustError::NotConfigured("no organization in this home".into()))?;
        let admin_id = local
            .admin_id
            .ok_or_else(|| TrustError::NotConfigured("no admin in this home".into()))?;

        let admin = self.load_private_entity(&admin_id, EntityKind::Admin).await?;
        let org_public = match self.home.get_public(&org_ref.id, &org_ref.id).await {
            Ok(bytes) => PublicEntity::load(&bytes)?,
            Err(err) if err.is_not_found() => {
                return Err(TrustError::NotConfigured(format!(
                    "admin '{}' has not completed joining {}",
                    admin.name(),
                    org_ref.name
                )))
            }
            Err(err) => return Err(err.into()),
        };

        let container = Container::from_bytes(&self.api.get_private(&org_ref.id, &org_ref.id).await?)?;
        let org = Entity::load(&admin.open_from(&container, &org_public)?)?;
        if org.id() != org_ref.id {
            return Err(TrustError::OrganizationMismatch {
                expected: org_ref.id,
                found: org.id(),
            });
        }

        debug!(org = %org.id(), admin = %admin.id(), "loaded admin context");
        Ok(AdminContext { org, admin })
    }

    /// Load a node identity held by this home.
    pub async fn node_context(&self, name: &str) -> Result<NodeContext> {
        let local = self.local_config().await?;
        let node_ref = local
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| TrustError::NotConfigured(format!("no node '{name}' in this home")))?;

        let node = self.load_private_entity(&node_ref.id, EntityKind::Node).await?;
        let org = match self.home.get_public(&node_ref.org_id, &node_ref.org_id).await {
            Ok(bytes) => Some(PublicEntity::load(&bytes)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        Ok(NodeContext {
            name: name.to_string(),
            node,
            node_ref,
            org,
        })
    }

    async fn load_private_entity(&self, id: &Id, kind: EntityKind) -> Result<Entity> {
        let entity = Entity::load(&self.home.get_private(id, id).await?)?;
        expect_kind(kind, entity.kind())?;
        Ok(entity)
    }

    /// Save a private entity to home and publish its public half.
    pub(crate) async fn keep_entity(&self, entity: &Entity) -> Result<()> {
        self.home
            .send_private(&entity.id(), &entity.id(), &entity.dump()?)
            .await?;
        self.api
            .send_public(&entity.id(), &entity.id(), &entity.dump_public()?)
            .await?;
        Ok(())
    }

    /// Fetch a public entity from the shared store.
    pub(crate) async fn fetch_public(&self, owner: &Id, id: &Id) -> Result<PublicEntity> {
        Ok(PublicEntity::load(&self.api.get_public(owner, id).await?)?)
    }

    /// Encrypt the organization's private document for every admin in
    /// `index` and store it.
    pub(crate) async fn broadcast_org(&self, org: &Entity, index: &TrustIndex) -> Result<()> {
        let mut admins = Vec::new();
        for id in index.list(ResourceClass::Admin) {
            admins.push(self.fetch_public(&id, &id).await?);
        }
        let bytes = {
            let recipients: Vec<&dyn Identity> =
                admins.iter().map(|a| a as &dyn Identity).collect();
            org.encrypt_then_sign(&org.dump()?, &recipients)?.to_bytes()?
        };
        self.api.send_private(&org.id(), &org.id(), &bytes).await?;
        debug!(org = %org.id(), admins = admins.len(), "broadcast organization");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Index
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the organization's index.
    pub async fn load_index(&self, ctx: &AdminContext) -> Result<TrustIndex> {
        self.load_object(&ctx.org, &index_id(&ctx.org.id())).await
    }

    pub(crate) async fn save_index(&self, owner: &Entity, index: &TrustIndex) -> Result<()> {
        self.save_object(owner, &index.id, index).await
    }

    /// Load the index, apply `f` and save the result.
    ///
    /// Nothing is written when `f` fails; the in-memory copy is dropped.
    pub async fn update_index<F, T>(&self, ctx: &AdminContext, f: F) -> Result<T>
    where
        F: FnOnce(&mut TrustIndex) -> Result<T> + Send,
        T: Send,
    {
        let mut index = self.load_index(ctx).await?;
        let value = f(&mut index)?;
        self.save_index(&ctx.org, &index).await?;
        Ok(value)
    }

    /// Read a node's own index of CSRs and certificates.
    pub async fn load_node_index(&self, ctx: &NodeContext) -> Result<TrustIndex> {
        let id = index_id(&ctx.node.id());
        match self.load_object(&ctx.node, &id).await {
            Err(err) if err.is_store_not_found() => Ok(TrustIndex::new(id, ctx.node_ref.org_id)),
            other => other,
        }
    }

    /// Node-side counterpart of [`Environment::update_index`].
    pub async fn update_node_index<F, T>(&self, ctx: &NodeContext, f: F) -> Result<T>
    where
        F: FnOnce(&mut TrustIndex) -> Result<T> + Send,
        T: Send,
    {
        let mut index = self.load_node_index(ctx).await?;
        let value = f(&mut index)?;
        self.save_index(&ctx.node, &index).await?;
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Objects
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `value` for `owner` alone, sign it and store it privately.
    pub(crate) async fn save_object<T>(&self, owner: &Entity, id: &Id, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let container = owner.encrypt_then_sign(&to_cbor(value)?, &[])?;
        self.api
            .send_private(&owner.id(), id, &container.to_bytes()?)
            .await?;
        Ok(())
    }

    pub(crate) async fn load_object<T: DeserializeOwned>(&self, owner: &Entity, id: &Id) -> Result<T> {
        let container = Container::from_bytes(&self.api.get_private(&owner.id(), id).await?)?;
        Ok(from_cbor(&owner.verify_then_decrypt(&container)?)?)
    }

    pub(crate) async fn delete_object(&self, owner: &Id, id: &Id) -> Result<()> {
        Ok(self.api.delete_private(owner, id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Indexed resources
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a resource under the organization, then index it with `tags`.
    pub(crate) async fn store_resource<R: Resource>(
        &self,
        ctx: &AdminContext,
        resource: &R,
        tags: Vec<String>,
    ) -> Result<()> {
        let name = resource.name().to_string();
        if self.load_index(ctx).await?.contains(R::CLASS, &name) {
            return Err(CoreError::DuplicateName {
                class: R::CLASS,
                name,
            }
            .into());
        }

        let id = resource.id();
        self.save_object(&ctx.org, &id, resource).await?;
        self.update_index(ctx, move |index| {
            index.add(R::CLASS, &name, id)?;
            index.add_tags(id, tags);
            Ok(())
        })
        .await
    }

    /// Fetch a resource by name.
    pub(crate) async fn fetch_resource<R: Resource>(&self, ctx: &AdminContext, name: &str) -> Result<R> {
        let id = self.load_index(ctx).await?.get(R::CLASS, name)?;
        self.load_object(&ctx.org, &id).await
    }

    /// Re-save a resource. With `tags` its tag set is replaced.
    pub(crate) async fn replace_resource<R: Resource>(
        &self,
        ctx: &AdminContext,
        resource: &R,
        tags: Option<Vec<String>>,
    ) -> Result<()> {
        let id = resource.id();
        self.save_object(&ctx.org, &id, resource).await?;
        if let Some(tags) = tags {
            self.update_index(ctx, move |index| {
                index.clear_tags(&id);
                index.add_tags(id, tags);
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    /// Delete a resource's object, then its index entry.
    pub(crate) async fn remove_resource(
        &self,
        ctx: &AdminContext,
        class: ResourceClass,
        name: &str,
    ) -> Result<Id> {
        let id = self.load_index(ctx).await?.get(class, name)?;
        self.delete_object(&ctx.org.id(), &id).await?;
        self.update_index(ctx, |index| Ok(index.remove(class, name)?))
            .await
    }

    /// Names in `class`, optionally only those carrying `tag`.
    pub(crate) async fn list_names(
        &self,
        ctx: &AdminContext,
        class: ResourceClass,
        tag: Option<&str>,
    ) -> Result<Vec<String>> {
        let index = self.load_index(ctx).await?;
        Ok(match tag {
            Some(tag) => index.find_by_tag(class, &tag.trim().to_lowercase()),
            None => index.names(class).into_iter().map(|(name, _)| name).collect(),
        })
    }
}

pub(crate) fn expect_kind(expected: EntityKind, found: EntityKind) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(TrustError::UnexpectedEntity { expected, found })
    }
}
