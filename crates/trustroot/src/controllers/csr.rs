//! CSRs held by the organization.

use tracing::info;
use trustroot_core::{Id, ResourceClass};
use trustroot_seal::Identity;
use trustroot_store::Backend;
use trustroot_x509::{Certificate, Csr};

use crate::environment::Environment;
use crate::error::Result;
use crate::files::{read_optional_pem, read_pem};
use crate::params::{
    resolve_tags, CsrCreateParams, CsrSignParams, CsrUpdateParams, DeleteParams, Validate,
};

pub struct Csrs<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> Csrs<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Generate or import a CSR.
    pub async fn create(&self, params: CsrCreateParams) -> Result<Csr> {
        params.validate()?;
        let csr = match &params.import {
            Some(import) => {
                let request = read_pem(&import.pem).await?;
                let key = read_optional_pem(import.key.as_deref()).await?;
                Csr::import(&params.name, request, key)?
            }
            None => Csr::generate(
                &params.name,
                &params.dn,
                params.key_type.unwrap_or(self.env.config().key_type),
            )?,
        };

        if params.standalone {
            info!(csr = %csr.name, "created standalone CSR");
            return Ok(csr);
        }
        let ctx = self.env.admin_context().await?;
        let tags = resolve_tags(params.tags.as_deref(), &csr.name);
        self.env.store_resource(&ctx, &csr, tags).await?;
        info!(org = %ctx.org.id(), csr = %csr.name, id = %csr.id, "created CSR");
        Ok(csr)
    }

    /// Sign a stored CSR with a CA and store the certificate.
    pub async fn sign(&self, params: CsrSignParams) -> Result<Certificate> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let csr: Csr = self.env.fetch_resource(&ctx, &params.name).await?;
        let ca = self.env.cas().find(&ctx, &params.ca).await?;

        let mut cert = ca.sign(&csr, params.keep_subject)?;
        cert.id = Id::generate();
        cert.private_key_pem = csr.private_key_pem.clone();
        if let Some(name) = &params.certificate {
            cert.name = name.trim().to_string();
        }

        let tags = resolve_tags(params.tags.as_deref(), &cert.name);
        self.env.store_resource(&ctx, &cert, tags).await?;
        info!(csr = %csr.name, ca = %ca.name, certificate = %cert.name, "signed CSR");
        Ok(cert)
    }

    /// CSR names, optionally only those tagged `tag`.
    pub async fn list(&self, tag: Option<&str>) -> Result<Vec<String>> {
        let ctx = self.env.admin_context().await?;
        self.env.list_names(&ctx, ResourceClass::Csr, tag).await
    }

    pub async fn show(&self, name: &str) -> Result<Csr> {
        let ctx = self.env.admin_context().await?;
        self.env.fetch_resource(&ctx, name).await
    }

    /// Overwrite the supplied fields. Supplied tags replace the old set.
    pub async fn update(&self, params: CsrUpdateParams) -> Result<Csr> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let mut csr: Csr = self.env.fetch_resource(&ctx, &params.name).await?;

        if let Some(path) = &params.csr {
            let request = read_pem(path).await?;
            csr = Csr {
                id: csr.id,
                ..Csr::import(&csr.name, request, csr.private_key_pem.clone())?
            };
        }
        if let Some(path) = &params.key {
            let key = read_pem(path).await?;
            csr = Csr {
                id: csr.id,
                ..Csr::import(&csr.name, csr.csr_pem.clone(), Some(key))?
            };
        }

        let tags = params
            .tags
            .as_deref()
            .map(|tags| resolve_tags(Some(tags), &csr.name));
        self.env.replace_resource(&ctx, &csr, tags).await?;
        info!(csr = %csr.name, "updated CSR");
        Ok(csr)
    }

    pub async fn delete(&self, params: DeleteParams) -> Result<Id> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let id = self
            .env
            .remove_resource(&ctx, ResourceClass::Csr, &params.name)
            .await?;
        info!(csr = %params.name, %id, "deleted CSR");
        Ok(id)
    }
}
