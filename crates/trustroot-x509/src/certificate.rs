//! End-entity certificates.

use rcgen::{Certificate as RcgenCertificate, CertificateParams};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use trustroot_core::Id;

use crate::ca::Ca;
use crate::error::Result;
use crate::pem::{self, Validity};
use crate::types::{DnScope, KeyType};

/// A certificate, optionally with its private key and issuing CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Id,
    pub name: String,
    pub key_type: KeyType,
    pub expiry_days: u32,
    pub certificate_pem: String,
    pub private_key_pem: Option<String>,
    pub ca_certificate_pem: Option<String>,
}

impl Certificate {
    /// Generate a key pair and certificate for `name`.
    ///
    /// With a CA the certificate is signed by it, otherwise it is self-signed.
    pub fn generate(
        name: &str,
        subject: &DnScope,
        key_type: KeyType,
        expiry_days: u32,
        ca: Option<&Ca>,
    ) -> Result<Self> {
        let mut params = CertificateParams::new(vec![name.to_string()]);
        params.alg = key_type.algorithm()?;
        params.distinguished_name = subject.distinguished_name(name);
        params.not_before = OffsetDateTime::now_utc();
        params.not_after = params.not_before + Duration::days(i64::from(expiry_days));
        let cert = RcgenCertificate::from_params(params)?;

        let certificate_pem = match ca {
            Some(ca) => cert.serialize_pem_with_signer(&ca.signer()?)?,
            None => cert.serialize_pem()?,
        };
        let certificate = Self {
            id: Id::generate(),
            name: name.to_string(),
            key_type,
            expiry_days,
            certificate_pem,
            private_key_pem: Some(cert.serialize_private_key_pem()),
            ca_certificate_pem: ca.map(|ca| ca.certificate_pem.clone()),
        };
        debug!(name, id = %certificate.id, signed = ca.is_some(), "generated certificate");
        Ok(certificate)
    }

    /// Wrap an existing certificate. The expiry is read from its validity.
    pub fn import(
        name: &str,
        certificate_pem: String,
        private_key_pem: Option<String>,
    ) -> Result<Self> {
        let validity = pem::certificate_validity(&certificate_pem)?;
        let key_type = match private_key_pem.as_deref() {
            Some(key) => KeyType::of_private_key(key)?,
            None => KeyType::default(),
        };
        Ok(Self {
            id: Id::generate(),
            name: name.to_string(),
            key_type,
            expiry_days: validity.days(),
            certificate_pem,
            private_key_pem,
            ca_certificate_pem: None,
        })
    }

    /// Replace the certificate body, re-reading its expiry.
    pub fn replace_certificate(&mut self, certificate_pem: String) -> Result<()> {
        self.expiry_days = pem::certificate_validity(&certificate_pem)?.days();
        self.certificate_pem = certificate_pem;
        Ok(())
    }

    /// Replace the private key.
    pub fn replace_private_key(&mut self, private_key_pem: String) -> Result<()> {
        self.key_type = KeyType::of_private_key(&private_key_pem)?;
        self.private_key_pem = Some(private_key_pem);
        Ok(())
    }

    pub fn validity(&self) -> Result<Validity> {
        pem::certificate_validity(&self.certificate_pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_signed() {
        let cert = Certificate::generate("web", &DnScope::default(), KeyType::Ed25519, 30, None)
            .unwrap();
        assert!(cert.ca_certificate_pem.is_none());
        assert_eq!(cert.validity().unwrap().days(), 30);
    }

    #[test]
    fn test_import_infers_expiry() {
        let cert = Certificate::generate("web", &DnScope::default(), KeyType::EcdsaP384, 12, None)
            .unwrap();
        let imported = Certificate::import(
            "web-copy",
            cert.certificate_pem.clone(),
            cert.private_key_pem.clone(),
        )
        .unwrap();
        assert_eq!(imported.expiry_days, 12);
        assert_eq!(imported.key_type, KeyType::EcdsaP384);
    }

    #[test]
    fn test_replace_certificate_updates_expiry() {
        let mut cert =
            Certificate::generate("a", &DnScope::default(), KeyType::Ed25519, 10, None).unwrap();
        let other =
            Certificate::generate("b", &DnScope::default(), KeyType::Ed25519, 20, None).unwrap();
        cert.replace_certificate(other.certificate_pem.clone()).unwrap();
        assert_eq!(cert.expiry_days, 20);
        assert!(cert.replace_certificate("junk".into()).is_err());
    }
}
