//! Test fixtures.
//!
//! Every party gets its own home store; all of them share one API store, as
//! separate operators would.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trustroot::params::{AdminJoinParams, NodeCreateParams, OrgCreateParams};
use trustroot::{Environment, OrgRef, TrustConfig};
use trustroot_core::Id;
use trustroot_store::MemoryStore;

/// An organization created by `alice` over in-memory stores.
pub struct TestOrg {
    pub api: Arc<MemoryStore>,
    pub org: OrgRef,
    /// Environment of the founding admin.
    pub admin: Environment<MemoryStore>,
}

impl TestOrg {
    pub async fn new() -> trustroot::Result<Self> {
        Self::with_config(TrustConfig::default()).await
    }

    pub async fn with_config(config: TrustConfig) -> trustroot::Result<Self> {
        let api = Arc::new(MemoryStore::new());
        let admin = Environment::new(Arc::clone(&api), Arc::new(MemoryStore::new()), config);
        let org = admin
            .orgs()
            .create(OrgCreateParams {
                org: "acme".into(),
                admin: "alice".into(),
            })
            .await?;
        Ok(Self { api, org, admin })
    }

    /// A new operator with an empty home sharing the API store.
    pub fn party(&self) -> Environment<MemoryStore> {
        Environment::new(
            Arc::clone(&self.api),
            Arc::new(MemoryStore::new()),
            self.admin.config().clone(),
        )
    }

    /// Run the whole invitation for `name` and return its environment.
    pub async fn enroll_admin(&self, name: &str) -> trustroot::Result<Environment<MemoryStore>> {
        let invite = self.admin.admins().invite(name).await?;
        let party = self.party();
        party
            .admins()
            .join(AdminJoinParams {
                name: name.into(),
                org_id: self.org.id,
                org_name: self.org.name.clone(),
                invite_id: invite.id,
                invite_key: invite.secret().to_string(),
            })
            .await?;
        self.admin.admins().run().await?;
        party
            .admins()
            .complete(invite.id, invite.secret())
            .await?;
        Ok(party)
    }

    /// Create node `name` in a new home and register it with `tags`.
    pub async fn enroll_node(
        &self,
        name: &str,
        tags: Option<&str>,
    ) -> trustroot::Result<(Environment<MemoryStore>, Id)> {
        let pairing = self.admin.pairing_keys().new_key(tags).await?;
        let party = self.party();
        let id = party
            .nodes()
            .create(NodeCreateParams {
                name: name.into(),
                org_id: self.org.id,
                pairing_id: pairing.id,
                pairing_key: pairing.secret().to_string(),
            })
            .await?;
        self.admin.nodes().register().await?;
        party.nodes().complete(name).await?;
        Ok((party, id))
    }
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_pem(dir: &Path, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_org_fixture() {
        let org = TestOrg::new().await.unwrap();
        let info = org.admin.orgs().show().await.unwrap();
        assert_eq!(info.name, "acme");
        assert_eq!(info.admins, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_parties_share_api_only() {
        let org = TestOrg::new().await.unwrap();
        let party = org.party();
        assert!(party.local_config().await.unwrap().org.is_none());
        assert!(party.admin_context().await.is_err());
    }

    #[test]
    fn test_write_pem() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pem(dir.path(), "a.pem", "x").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x");
    }
}
