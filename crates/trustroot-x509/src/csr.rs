//! Certificate signing requests.

use rcgen::{Certificate as RcgenCertificate, CertificateParams};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trustroot_core::Id;

use crate::error::Result;
use crate::pem;
use crate::types::{DnScope, KeyType};

/// A certificate signing request and, on the requesting side, its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Csr {
    pub id: Id,
    pub name: String,
    pub key_type: KeyType,
    pub csr_pem: String,
    pub private_key_pem: Option<String>,
}

impl Csr {
    /// Generate a key pair and a request for `name` under `subject`.
    pub fn generate(name: &str, subject: &DnScope, key_type: KeyType) -> Result<Self> {
        let mut params = CertificateParams::new(vec![name.to_string()]);
        params.alg = key_type.algorithm()?;
        params.distinguished_name = subject.distinguished_name(name);
        let request = RcgenCertificate::from_params(params)?;

        let csr = Self {
            id: Id::generate(),
            name: name.to_string(),
            key_type,
            csr_pem: request.serialize_request_pem()?,
            private_key_pem: Some(request.serialize_private_key_pem()),
        };
        debug!(name, id = %csr.id, %key_type, "generated CSR");
        Ok(csr)
    }

    /// Wrap an existing request, optionally with its private key.
    pub fn import(name: &str, csr_pem: String, private_key_pem: Option<String>) -> Result<Self> {
        pem::check_request(&csr_pem)?;
        let key_type = match private_key_pem.as_deref() {
            Some(key) => KeyType::of_private_key(key)?,
            None => KeyType::default(),
        };
        Ok(Self {
            id: Id::generate(),
            name: name.to_string(),
            key_type,
            csr_pem,
            private_key_pem,
        })
    }

    /// Copy without the private key, suitable for sending to a signer.
    pub fn public(&self) -> Self {
        Self {
            private_key_pem: None,
            ..self.clone()
        }
    }

    /// Whether the private key is held.
    pub fn has_private_key(&self) -> bool {
        self.private_key_pem.is_some()
    }
}
