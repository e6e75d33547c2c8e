//! Validated parameters, one type per operation.
//!
//! Required inputs are plain fields, optional ones are `Option`s. Every
//! controller calls [`Validate::validate`] before touching a store.

use std::path::PathBuf;

use trustroot_core::{normalize_tags, Id};
use trustroot_x509::{DnScope, KeyType};

use crate::error::{validation, Result};

/// Tag value that stands for the resource's own name.
pub const NAME_TAG: &str = "NAME";

/// Checks run before an operation has side effects.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn require_days(field: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(0) => Err(validation(format!("{field} must be at least one day"))),
        _ => Ok(()),
    }
}

/// Resolve a tag argument for the resource `name`.
///
/// `NAME` tags the resource with its own name; anything else is normalized.
pub fn resolve_tags(tags: Option<&str>, name: &str) -> Vec<String> {
    match tags {
        Some(tags) if tags.trim() == NAME_TAG => normalize_tags(name),
        Some(tags) => normalize_tags(tags),
        None => Vec::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Organization, admin, node
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrgCreateParams {
    pub org: String,
    pub admin: String,
}

impl Validate for OrgCreateParams {
    fn validate(&self) -> Result<()> {
        require("organization name", &self.org)?;
        require("admin name", &self.admin)
    }
}

/// Joining side of an admin invitation.
#[derive(Clone)]
pub struct AdminJoinParams {
    pub name: String,
    pub org_id: Id,
    pub org_name: String,
    pub invite_id: Id,
    pub invite_key: String,
}

impl std::fmt::Debug for AdminJoinParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminJoinParams")
            .field("name", &self.name)
            .field("org_id", &self.org_id)
            .field("org_name", &self.org_name)
            .field("invite_id", &self.invite_id)
            .finish_non_exhaustive()
    }
}

impl Validate for AdminJoinParams {
    fn validate(&self) -> Result<()> {
        require("admin name", &self.name)?;
        require("organization name", &self.org_name)?;
        require("invite key", &self.invite_key)
    }
}

#[derive(Clone)]
pub struct NodeCreateParams {
    pub name: String,
    pub org_id: Id,
    pub pairing_id: Id,
    pub pairing_key: String,
}

impl std::fmt::Debug for NodeCreateParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCreateParams")
            .field("name", &self.name)
            .field("org_id", &self.org_id)
            .field("pairing_id", &self.pairing_id)
            .finish_non_exhaustive()
    }
}

impl Validate for NodeCreateParams {
    fn validate(&self) -> Result<()> {
        require("node name", &self.name)?;
        require("pairing key", &self.pairing_key)
    }
}

/// Organization-side signing of a node's outstanding CSRs.
#[derive(Debug, Clone)]
pub struct NodeIssueParams {
    pub node: String,
    pub ca: String,
    /// Most CSRs to sign in this call.
    pub limit: Option<usize>,
    pub keep_subject: bool,
    /// Tags for the organization's copy of each certificate.
    pub tags: Option<String>,
}

impl Validate for NodeIssueParams {
    fn validate(&self) -> Result<()> {
        require("node name", &self.node)?;
        require("CA name", &self.ca)?;
        match self.limit {
            Some(0) => Err(validation("limit must be positive")),
            _ => Ok(()),
        }
    }
}

/// Deletion of a named resource.
#[derive(Debug, Clone)]
pub struct DeleteParams {
    pub name: String,
    pub confirm: bool,
}

impl DeleteParams {
    pub fn confirmed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confirm: true,
        }
    }
}

impl Validate for DeleteParams {
    fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        if !self.confirm {
            return Err(validation(format!(
                "deleting '{}' requires confirmation",
                self.name
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CA, certificate, CSR
// ─────────────────────────────────────────────────────────────────────────────

/// PEM files to import: a certificate (or request) and an optional key.
#[derive(Debug, Clone)]
pub struct PemImport {
    pub pem: PathBuf,
    pub key: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CaCreateParams {
    pub name: String,
    pub ca_expiry_days: Option<u32>,
    pub cert_expiry_days: Option<u32>,
    pub key_type: Option<KeyType>,
    pub dn: DnScope,
    /// Import instead of generating a root.
    pub import: Option<PemImport>,
    pub tags: Option<String>,
}

impl Validate for CaCreateParams {
    fn validate(&self) -> Result<()> {
        require("CA name", &self.name)?;
        require_days("CA expiry", self.ca_expiry_days)?;
        require_days("certificate expiry", self.cert_expiry_days)?;
        if self.key_type == Some(KeyType::Rsa) && self.import.is_none() {
            return Err(validation("rsa keys can only be imported"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaUpdateParams {
    pub name: String,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cert_expiry_days: Option<u32>,
    /// Components set here overwrite the stored scope.
    pub dn: DnScope,
    pub tags: Option<String>,
}

impl Validate for CaUpdateParams {
    fn validate(&self) -> Result<()> {
        require("CA name", &self.name)?;
        require_days("certificate expiry", self.cert_expiry_days)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CertCreateParams {
    pub name: String,
    /// Signing CA; self-signed when absent.
    pub ca: Option<String>,
    pub key_type: Option<KeyType>,
    pub expiry_days: Option<u32>,
    pub dn: DnScope,
    pub import: Option<PemImport>,
    pub tags: Option<String>,
    /// Return the certificate without storing or indexing it.
    pub standalone: bool,
}

impl Validate for CertCreateParams {
    fn validate(&self) -> Result<()> {
        require("certificate name", &self.name)?;
        require_days("certificate expiry", self.expiry_days)?;
        if self.import.is_some() && self.ca.is_some() {
            return Err(validation("an imported certificate cannot be signed by a CA"));
        }
        if self.key_type == Some(KeyType::Rsa) && self.import.is_none() {
            return Err(validation("rsa keys can only be imported"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CertUpdateParams {
    pub name: String,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub tags: Option<String>,
}

impl Validate for CertUpdateParams {
    fn validate(&self) -> Result<()> {
        require("certificate name", &self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsrCreateParams {
    pub name: String,
    pub key_type: Option<KeyType>,
    pub dn: DnScope,
    pub import: Option<PemImport>,
    pub tags: Option<String>,
    pub standalone: bool,
}

impl Validate for CsrCreateParams {
    fn validate(&self) -> Result<()> {
        require("CSR name", &self.name)?;
        if self.key_type == Some(KeyType::Rsa) && self.import.is_none() {
            return Err(validation("rsa keys can only be imported"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsrUpdateParams {
    pub name: String,
    pub csr: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub tags: Option<String>,
}

impl Validate for CsrUpdateParams {
    fn validate(&self) -> Result<()> {
        require("CSR name", &self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsrSignParams {
    pub name: String,
    pub ca: String,
    /// Keep the request's subject instead of applying the CA scope.
    pub keep_subject: bool,
    /// Certificate name; defaults to the CSR name.
    pub certificate: Option<String>,
    pub tags: Option<String>,
}

impl Validate for CsrSignParams {
    fn validate(&self) -> Result<()> {
        require("CSR name", &self.name)?;
        require("CA name", &self.ca)?;
        match &self.certificate {
            Some(name) => require("certificate name", name),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrustError;
    use proptest::prelude::*;

    #[test]
    fn test_delete_requires_confirmation() {
        let params = DeleteParams {
            name: "web".into(),
            confirm: false,
        };
        assert!(matches!(params.validate(), Err(TrustError::Validation(_))));
        assert!(DeleteParams::confirmed("web").validate().is_ok());
    }

    #[test]
    fn test_blank_names_rejected() {
        let params = OrgCreateParams {
            org: "acme".into(),
            admin: "  ".into(),
        };
        assert!(params.validate().is_err());
        assert!(CaCreateParams::default().validate().is_err());
    }

    #[test]
    fn test_rsa_generation_rejected() {
        let params = CertCreateParams {
            name: "web".into(),
            key_type: Some(KeyType::Rsa),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let params = CaCreateParams {
            name: "root".into(),
            cert_expiry_days: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_resolve_tags() {
        assert_eq!(resolve_tags(Some("NAME"), "Web1"), vec!["web1"]);
        assert_eq!(resolve_tags(Some(" A, b "), "x"), vec!["a", "b"]);
        assert!(resolve_tags(None, "x").is_empty());
    }

    #[test]
    fn test_secret_params_debug() {
        let params = NodeCreateParams {
            name: "n".into(),
            org_id: Id::generate(),
            pairing_id: Id::generate(),
            pairing_key: "s3cret".into(),
        };
        assert!(!format!("{params:?}").contains("s3cret"));
    }

    proptest! {
        #[test]
        fn prop_resolved_tags_are_normalized(input in "[ a-zA-Z0-9,]{0,40}") {
            for tag in resolve_tags(Some(&input), "x") {
                prop_assert_eq!(tag.trim(), tag.as_str());
                prop_assert_eq!(tag.to_lowercase(), tag.clone());
            }
        }
    }
}
