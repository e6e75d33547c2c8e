//! Certificate authorities held by the organization.

use tracing::info;
use trustroot_core::{Id, ResourceClass};
use trustroot_seal::Identity;
use trustroot_store::Backend;
use trustroot_x509::Ca;

use crate::environment::{AdminContext, Environment};
use crate::error::{validation, Result};
use crate::files::{read_optional_pem, read_pem};
use crate::params::{resolve_tags, CaCreateParams, CaUpdateParams, DeleteParams, Validate};

pub struct CaController<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> CaController<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Generate a root CA, or import one from PEM files.
    pub async fn create(&self, params: CaCreateParams) -> Result<Ca> {
        params.validate()?;
        let config = self.env.config();
        let ctx = self.env.admin_context().await?;
        let cert_expiry_days = params.cert_expiry_days.unwrap_or(config.cert_expiry_days);

        let ca = match &params.import {
            Some(import) => {
                let certificate = read_pem(&import.pem).await?;
                let key = read_optional_pem(import.key.as_deref()).await?;
                Ca::import(&params.name, certificate, key, cert_expiry_days, params.dn.clone())?
            }
            None => Ca::generate_root(
                &params.name,
                params.ca_expiry_days.unwrap_or(config.ca_expiry_days),
                cert_expiry_days,
                params.key_type.unwrap_or(config.key_type),
                params.dn.clone(),
            )?,
        };

        let tags = resolve_tags(params.tags.as_deref(), &ca.name);
        self.env.store_resource(&ctx, &ca, tags).await?;
        info!(org = %ctx.org.id(), ca = %ca.name, id = %ca.id, imported = params.import.is_some(), "created CA");
        Ok(ca)
    }

    /// CA names, optionally only those tagged `tag`.
    pub async fn list(&self, tag: Option<&str>) -> Result<Vec<String>> {
        let ctx = self.env.admin_context().await?;
        self.env.list_names(&ctx, ResourceClass::Ca, tag).await
    }

    pub async fn show(&self, name: &str) -> Result<Ca> {
        let ctx = self.env.admin_context().await?;
        self.env.fetch_resource(&ctx, name).await
    }

    /// Overwrite the supplied fields. Supplied tags replace the old set.
    pub async fn update(&self, params: CaUpdateParams) -> Result<Ca> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let mut ca: Ca = self.env.fetch_resource(&ctx, &params.name).await?;

        if let Some(path) = &params.certificate {
            ca.replace_certificate(read_pem(path).await?)?;
        }
        if let Some(path) = &params.key {
            ca.replace_private_key(read_pem(path).await?)?;
        }
        if let Some(days) = params.cert_expiry_days {
            ca.cert_expiry_days = days;
        }
        ca.dn_scope.merge(&params.dn);

        let tags = params
            .tags
            .as_deref()
            .map(|tags| resolve_tags(Some(tags), &ca.name));
        self.env.replace_resource(&ctx, &ca, tags).await?;
        info!(ca = %ca.name, "updated CA");
        Ok(ca)
    }

    pub async fn delete(&self, params: DeleteParams) -> Result<Id> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let id = self
            .env
            .remove_resource(&ctx, ResourceClass::Ca, &params.name)
            .await?;
        info!(ca = %params.name, %id, "deleted CA");
        Ok(id)
    }

    /// A CA that can sign.
    pub(crate) async fn find(&self, ctx: &AdminContext, name: &str) -> Result<Ca> {
        let ca: Ca = self.env.fetch_resource(ctx, name).await?;
        if ca.private_key_pem.is_none() {
            return Err(validation(format!("CA '{name}' has no private key and cannot sign")));
        }
        Ok(ca)
    }
}
