//! Certificates held by the organization.

use tracing::info;
use trustroot_core::{Id, ResourceClass};
use trustroot_seal::Identity;
use trustroot_store::Backend;
use trustroot_x509::Certificate;

use crate::environment::Environment;
use crate::error::Result;
use crate::files::{read_optional_pem, read_pem};
use crate::params::{resolve_tags, CertCreateParams, CertUpdateParams, DeleteParams, Validate};

pub struct Certificates<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> Certificates<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Generate (self-signed or CA-signed) or import a certificate.
    ///
    /// A standalone certificate is returned without being stored or indexed.
    pub async fn create(&self, params: CertCreateParams) -> Result<Certificate> {
        params.validate()?;
        let config = self.env.config();

        if let Some(import) = &params.import {
            let certificate = read_pem(&import.pem).await?;
            let key = read_optional_pem(import.key.as_deref()).await?;
            let mut cert = Certificate::import(&params.name, certificate, key)?;
            if let Some(days) = params.expiry_days {
                cert.expiry_days = days;
            }
            return self.finish(&params, cert).await;
        }

        let key_type = params.key_type.unwrap_or(config.key_type);
        let expiry_days = params.expiry_days.unwrap_or(config.cert_expiry_days);
        let cert = match &params.ca {
            Some(ca_name) => {
                let ctx = self.env.admin_context().await?;
                let ca = self.env.cas().find(&ctx, ca_name).await?;
                Certificate::generate(&params.name, &params.dn, key_type, expiry_days, Some(&ca))?
            }
            None => Certificate::generate(&params.name, &params.dn, key_type, expiry_days, None)?,
        };
        self.finish(&params, cert).await
    }

    async fn finish(&self, params: &CertCreateParams, cert: Certificate) -> Result<Certificate> {
        if params.standalone {
            info!(certificate = %cert.name, "created standalone certificate");
            return Ok(cert);
        }
        let ctx = self.env.admin_context().await?;
        let tags = resolve_tags(params.tags.as_deref(), &cert.name);
        self.env.store_resource(&ctx, &cert, tags).await?;
        info!(org = %ctx.org.id(), certificate = %cert.name, id = %cert.id, "created certificate");
        Ok(cert)
    }

    /// Certificate names, optionally only those tagged `tag`.
    pub async fn list(&self, tag: Option<&str>) -> Result<Vec<String>> {
        let ctx = self.env.admin_context().await?;
        self.env
            .list_names(&ctx, ResourceClass::Certificate, tag)
            .await
    }

    pub async fn show(&self, name: &str) -> Result<Certificate> {
        let ctx = self.env.admin_context().await?;
        self.env.fetch_resource(&ctx, name).await
    }

    /// Overwrite the supplied fields. Supplied tags replace the old set.
    pub async fn update(&self, params: CertUpdateParams) -> Result<Certificate> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let mut cert: Certificate = self.env.fetch_resource(&ctx, &params.name).await?;

        if let Some(path) = &params.certificate {
            cert.replace_certificate(read_pem(path).await?)?;
        }
        if let Some(path) = &params.key {
            cert.replace_private_key(read_pem(path).await?)?;
        }

        let tags = params
            .tags
            .as_deref()
            .map(|tags| resolve_tags(Some(tags), &cert.name));
        self.env.replace_resource(&ctx, &cert, tags).await?;
        info!(certificate = %cert.name, "updated certificate");
        Ok(cert)
    }

    pub async fn delete(&self, params: DeleteParams) -> Result<Id> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let id = self
            .env
            .remove_resource(&ctx, ResourceClass::Certificate, &params.name)
            .await?;
        info!(certificate = %params.name, %id, "deleted certificate");
        Ok(id)
    }
}
