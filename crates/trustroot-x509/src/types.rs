//! Key types and distinguished-name scope.

use rcgen::{DistinguishedName, DnType, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::X509Error;

const OID_STREET_ADDRESS: [u64; 4] = [2, 5, 4, 9];
const OID_POSTAL_CODE: [u64; 4] = [2, 5, 4, 17];

/// Key algorithm of a CA, certificate or CSR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyType {
    #[default]
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    /// Recognised on import only.
    Rsa,
}

impl KeyType {
    pub(crate) fn algorithm(self) -> Result<&'static SignatureAlgorithm, X509Error> {
        match self {
            KeyType::Ed25519 => Ok(&rcgen::PKCS_ED25519),
            KeyType::EcdsaP256 => Ok(&rcgen::PKCS_ECDSA_P256_SHA256),
            KeyType::EcdsaP384 => Ok(&rcgen::PKCS_ECDSA_P384_SHA384),
            KeyType::Rsa => Err(X509Error::KeyGenerationUnavailable(self)),
        }
    }

    /// Detect the key type of a PEM private key.
    pub fn of_private_key(pem: &str) -> Result<Self, X509Error> {
        let key_pair = rcgen::KeyPair::from_pem(pem)?;
        [
            (KeyType::Ed25519, &rcgen::PKCS_ED25519),
            (KeyType::EcdsaP256, &rcgen::PKCS_ECDSA_P256_SHA256),
            (KeyType::EcdsaP384, &rcgen::PKCS_ECDSA_P384_SHA384),
            (KeyType::Rsa, &rcgen::PKCS_RSA_SHA256),
        ]
        .into_iter()
        .find(|(_, alg)| key_pair.is_compatible(alg))
        .map(|(key_type, _)| key_type)
        .ok_or_else(|| X509Error::UnsupportedKeyType("unrecognised private key".to_string()))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::EcdsaP256 => "ecdsa-p256",
            KeyType::EcdsaP384 => "ecdsa-p384",
            KeyType::Rsa => "rsa",
        })
    }
}

impl FromStr for KeyType {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "ec" | "ecdsa" | "ecdsa-p256" | "p256" => Ok(KeyType::EcdsaP256),
            "ecdsa-p384" | "p384" => Ok(KeyType::EcdsaP384),
            "rsa" => Ok(KeyType::Rsa),
            other => Err(X509Error::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// Distinguished-name components applied to a subject.
///
/// The common name is never part of the scope; it comes from the resource
/// name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnScope {
    pub country: Option<String>,
    pub province: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
}

impl DnScope {
    /// Build a distinguished name with this scope and `common_name`.
    pub fn distinguished_name(&self, common_name: &str) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        self.apply(&mut dn);
        dn
    }

    /// Push every supplied component onto `dn`.
    pub fn apply(&self, dn: &mut DistinguishedName) {
        let components = [
            (DnType::CountryName, &self.country),
            (DnType::StateOrProvinceName, &self.province),
            (DnType::LocalityName, &self.locality),
            (DnType::OrganizationName, &self.organization),
            (DnType::OrganizationalUnitName, &self.organizational_unit),
            (DnType::CustomDnType(OID_STREET_ADDRESS.to_vec()), &self.street_address),
            (DnType::CustomDnType(OID_POSTAL_CODE.to_vec()), &self.postal_code),
        ];
        for (ty, value) in components {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                dn.push(ty, value);
            }
        }
    }

    /// Overwrite the components that `other` supplies.
    pub fn merge(&mut self, other: &DnScope) {
        fn take(into: &mut Option<String>, from: &Option<String>) {
            if from.is_some() {
                into.clone_from(from);
            }
        }
        take(&mut self.country, &other.country);
        take(&mut self.province, &other.province);
        take(&mut self.locality, &other.locality);
        take(&mut self.organization, &other.organization);
        take(&mut self.organizational_unit, &other.organizational_unit);
        take(&mut self.street_address, &other.street_address);
        take(&mut self.postal_code, &other.postal_code);
    }

    /// Whether no component is set.
    pub fn is_empty(&self) -> bool {
        *self == DnScope::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_names() {
        assert_eq!("ec".parse::<KeyType>().unwrap(), KeyType::EcdsaP256);
        assert_eq!("Ed25519".parse::<KeyType>().unwrap(), KeyType::Ed25519);
        assert!("dsa".parse::<KeyType>().is_err());
        for key_type in [KeyType::Ed25519, KeyType::EcdsaP256, KeyType::EcdsaP384, KeyType::Rsa] {
            assert_eq!(key_type.to_string().parse::<KeyType>().unwrap(), key_type);
        }
    }

    #[test]
    fn test_rsa_generation_unavailable() {
        assert!(matches!(
            KeyType::Rsa.algorithm(),
            Err(X509Error::KeyGenerationUnavailable(KeyType::Rsa))
        ));
    }

    #[test]
    fn test_detect_generated_key_type() {
        for key_type in [KeyType::Ed25519, KeyType::EcdsaP256, KeyType::EcdsaP384] {
            let key = rcgen::KeyPair::generate(key_type.algorithm().unwrap()).unwrap();
            assert_eq!(KeyType::of_private_key(&key.serialize_pem()).unwrap(), key_type);
        }
    }

    #[test]
    fn test_merge_only_overwrites_supplied() {
        let mut scope = DnScope {
            country: Some("GB".into()),
            organization: Some("Acme".into()),
            ..Default::default()
        };
        scope.merge(&DnScope {
            organization: Some("Acme Ltd".into()),
            ..Default::default()
        });
        assert_eq!(scope.country.as_deref(), Some("GB"));
        assert_eq!(scope.organization.as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn test_distinguished_name_skips_empty() {
        let scope = DnScope {
            locality: Some(String::new()),
            country: Some("NL".into()),
            ..Default::default()
        };
        let dn = scope.distinguished_name("web1");
        assert!(dn.get(&DnType::CommonName).is_some());
        assert!(dn.get(&DnType::CountryName).is_some());
        assert!(dn.get(&DnType::LocalityName).is_none());
    }
}
