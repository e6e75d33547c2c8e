//! Certificate authorities.

use rcgen::{
    BasicConstraints, Certificate as RcgenCertificate, CertificateParams,
    CertificateSigningRequest, IsCa, KeyPair, KeyUsagePurpose,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use trustroot_core::Id;

use crate::certificate::Certificate;
use crate::csr::Csr;
use crate::error::{Result, X509Error};
use crate::pem;
use crate::types::{DnScope, KeyType};

/// A certificate authority: its certificate, signing policy and, when held,
/// its private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ca {
    pub id: Id,
    pub name: String,
    pub ca_expiry_days: u32,
    /// Validity given to certificates this CA signs.
    pub cert_expiry_days: u32,
    pub key_type: KeyType,
    pub dn_scope: DnScope,
    pub certificate_pem: String,
    pub private_key_pem: Option<String>,
}

impl Ca {
    /// Generate a self-signed root CA.
    pub fn generate_root(
        name: &str,
        ca_expiry_days: u32,
        cert_expiry_days: u32,
        key_type: KeyType,
        dn_scope: DnScope,
    ) -> Result<Self> {
        let mut params = CertificateParams::default();
        params.alg = key_type.algorithm()?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        params.distinguished_name = dn_scope.distinguished_name(name);
        params.not_before = OffsetDateTime::now_utc();
        params.not_after = params.not_before + Duration::days(i64::from(ca_expiry_days));
        let cert = RcgenCertificate::from_params(params)?;

        let ca = Self {
            id: Id::generate(),
            name: name.to_string(),
            ca_expiry_days,
            cert_expiry_days,
            key_type,
            dn_scope,
            certificate_pem: cert.serialize_pem()?,
            private_key_pem: Some(cert.serialize_private_key_pem()),
        };
        info!(name, id = %ca.id, %key_type, "generated root CA");
        Ok(ca)
    }

    /// Wrap an existing CA certificate. The CA expiry is read from the
    /// certificate's validity.
    pub fn import(
        name: &str,
        certificate_pem: String,
        private_key_pem: Option<String>,
        cert_expiry_days: u32,
        dn_scope: DnScope,
    ) -> Result<Self> {
        let validity = pem::certificate_validity(&certificate_pem)?;
        let key_type = match private_key_pem.as_deref() {
            Some(key) => KeyType::of_private_key(key)?,
            None => KeyType::default(),
        };
        Ok(Self {
            id: Id::generate(),
            name: name.to_string(),
            ca_expiry_days: validity.days(),
            cert_expiry_days,
            key_type,
            dn_scope,
            certificate_pem,
            private_key_pem,
        })
    }

    /// Sign `csr`, returning a certificate that carries the request's id.
    ///
    /// Unless `keep_subject` is set the subject is rebuilt from this CA's
    /// scope with the request name as common name.
    pub fn sign(&self, csr: &Csr, keep_subject: bool) -> Result<Certificate> {
        let signer = self.signer()?;
        let mut request = CertificateSigningRequest::from_pem(&csr.csr_pem)?;
        if !keep_subject {
            request.params.distinguished_name = self.dn_scope.distinguished_name(&csr.name);
        }
        request.params.not_before = OffsetDateTime::now_utc();
        request.params.not_after =
            request.params.not_before + Duration::days(i64::from(self.cert_expiry_days));

        let certificate = Certificate {
            id: csr.id,
            name: csr.name.clone(),
            key_type: csr.key_type,
            expiry_days: self.cert_expiry_days,
            certificate_pem: request.serialize_pem_with_signer(&signer)?,
            private_key_pem: None,
            ca_certificate_pem: Some(self.certificate_pem.clone()),
        };
        debug!(ca = %self.name, csr = %csr.id, keep_subject, "signed CSR");
        Ok(certificate)
    }

    /// Replace the CA certificate, re-reading its expiry.
    pub fn replace_certificate(&mut self, certificate_pem: String) -> Result<()> {
        self.ca_expiry_days = pem::certificate_validity(&certificate_pem)?.days();
        self.certificate_pem = certificate_pem;
        Ok(())
    }

    /// Replace the private key.
    pub fn replace_private_key(&mut self, private_key_pem: String) -> Result<()> {
        self.key_type = KeyType::of_private_key(&private_key_pem)?;
        self.private_key_pem = Some(private_key_pem);
        Ok(())
    }

    /// Copy without the private key.
    pub fn public(&self) -> Self {
        Self {
            private_key_pem: None,
            ..self.clone()
        }
    }

    pub(crate) fn signer(&self) -> Result<RcgenCertificate> {
        let key = self
            .private_key_pem
            .as_deref()
            .ok_or_else(|| X509Error::MissingPrivateKey(self.name.clone()))?;
        let key_pair = KeyPair::from_pem(key)?;
        let params = CertificateParams::from_ca_cert_pem(&self.certificate_pem, key_pair)?;
        Ok(RcgenCertificate::from_params(params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> DnScope {
        DnScope {
            country: Some("DE".into()),
            organization: Some("Example".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_root_validity() {
        let ca = Ca::generate_root("root", 365, 30, KeyType::Ed25519, scope()).unwrap();
        assert!(ca.certificate_pem.contains("BEGIN CERTIFICATE"));
        assert_eq!(pem::certificate_validity(&ca.certificate_pem).unwrap().days(), 365);
    }

    #[test]
    fn test_sign_keeps_csr_id() {
        let ca = Ca::generate_root("root", 365, 30, KeyType::EcdsaP256, scope()).unwrap();
        let csr = Csr::generate("node", &DnScope::default(), KeyType::Ed25519).unwrap();

        let cert = ca.sign(&csr.public(), false).unwrap();
        assert_eq!(cert.id, csr.id);
        assert_eq!(cert.expiry_days, 30);
        assert!(cert.private_key_pem.is_none());
        assert_eq!(cert.ca_certificate_pem.as_deref(), Some(ca.certificate_pem.as_str()));
        assert_eq!(cert.validity().unwrap().days(), 30);

        assert!(ca.sign(&csr, true).is_ok());
    }

    #[test]
    fn test_public_ca_cannot_sign() {
        let ca = Ca::generate_root("root", 10, 5, KeyType::Ed25519, scope()).unwrap();
        let csr = Csr::generate("node", &DnScope::default(), KeyType::Ed25519).unwrap();
        assert!(matches!(
            ca.public().sign(&csr, false),
            Err(X509Error::MissingPrivateKey(_))
        ));
    }

    #[test]
    fn test_import_infers_expiry_and_signs() {
        let root = Ca::generate_root("root", 100, 7, KeyType::EcdsaP256, scope()).unwrap();
        let imported = Ca::import(
            "copy",
            root.certificate_pem.clone(),
            root.private_key_pem.clone(),
            7,
            DnScope::default(),
        )
        .unwrap();
        assert_eq!(imported.ca_expiry_days, 100);
        assert_eq!(imported.key_type, KeyType::EcdsaP256);

        let cert =
            Certificate::generate("leaf", &DnScope::default(), KeyType::Ed25519, 3, Some(&imported))
                .unwrap();
        assert!(cert.ca_certificate_pem.is_some());
    }
}
