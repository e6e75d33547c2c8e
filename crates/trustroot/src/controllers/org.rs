//! Organization lifecycle.

use tracing::info;
use trustroot_core::{Id, ResourceClass, TrustIndex};
use trustroot_seal::{Entity, EntityKind, Identity, PrivateIdentity};
use trustroot_store::Backend;

use crate::config::{LocalConfig, OrgRef};
use crate::environment::{index_id, Environment};
use crate::error::{validation, Result};
use crate::params::{DeleteParams, OrgCreateParams, Validate};

/// Summary of an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgInfo {
    pub id: Id,
    pub name: String,
    pub admins: Vec<String>,
    pub nodes: Vec<String>,
    pub pairing_keys: usize,
}

pub struct Orgs<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> Orgs<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Create an organization and its first admin in this home.
    pub async fn create(&self, params: OrgCreateParams) -> Result<OrgRef> {
        params.validate()?;
        let mut local = self.env.local_config().await?;
        if let Some(existing) = &local.org {
            return Err(validation(format!(
                "this home already belongs to organization '{}'",
                existing.name
            )));
        }

        let org = Entity::generate(EntityKind::Organization, params.org.trim());
        let admin = Entity::generate(EntityKind::Admin, params.admin.trim());

        self.env.keep_entity(&admin).await?;
        self.env
            .api()
            .send_public(&org.id(), &org.id(), &org.dump_public()?)
            .await?;
        self.env
            .home()
            .send_public(&org.id(), &org.id(), &org.dump_public()?)
            .await?;
        let sealed = org.encrypt_then_sign(&org.dump()?, &[&admin])?;
        self.env
            .api()
            .send_private(&org.id(), &org.id(), &sealed.to_bytes()?)
            .await?;

        let mut index = TrustIndex::new(index_id(&org.id()), org.id());
        index.add(ResourceClass::Admin, admin.name(), admin.id())?;
        self.env.save_index(&org, &index).await?;

        let org_ref = OrgRef {
            id: org.id(),
            name: org.name().to_string(),
        };
        local.org = Some(org_ref.clone());
        local.admin_id = Some(admin.id());
        self.env.save_local_config(&local).await?;

        info!(org = %org.id(), name = org.name(), admin = admin.name(), "created organization");
        Ok(org_ref)
    }

    pub async fn show(&self) -> Result<OrgInfo> {
        let ctx = self.env.admin_context().await?;
        let index = self.env.load_index(&ctx).await?;
        let names = |class: ResourceClass| -> Vec<String> {
            index
                .names(class)
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        };
        Ok(OrgInfo {
            id: ctx.org.id(),
            name: ctx.org.name().to_string(),
            admins: names(ResourceClass::Admin),
            nodes: names(ResourceClass::Node),
            pairing_keys: index.pairing_keys().count(),
        })
    }

    /// Organizations configured in this home.
    pub async fn list(&self) -> Result<Vec<OrgRef>> {
        Ok(self.env.local_config().await?.org.into_iter().collect())
    }

    /// Delete the organization's documents and forget it in this home.
    ///
    /// Objects indexed under the organization are not deleted one by one;
    /// without the organization key they are unreadable.
    pub async fn delete(&self, params: DeleteParams) -> Result<()> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        if ctx.org.name() != params.name {
            return Err(validation(format!(
                "this home belongs to '{}', not '{}'",
                ctx.org.name(),
                params.name
            )));
        }

        let org_id = ctx.org.id();
        self.env.delete_object(&org_id, &index_id(&org_id)).await?;
        self.env.delete_object(&org_id, &org_id).await?;
        self.env.api().delete_public(&org_id, &org_id).await?;
        self.env.home().delete_public(&org_id, &org_id).await?;

        let local = LocalConfig {
            nodes: self.env.local_config().await?.nodes,
            ..LocalConfig::default()
        };
        self.env.save_local_config(&local).await?;

        info!(org = %org_id, "deleted organization");
        Ok(())
    }
}
