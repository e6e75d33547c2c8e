//! Admin enrollment and management.
//!
//! Invitation runs in four steps: an admin issues a pairing key
//! ([`Admins::invite`]), the newcomer joins with it ([`Admins::join`]), an
//! admin drains the organization's `invite` channel ([`Admins::run`]) and the
//! newcomer picks up the organization's answer ([`Admins::complete`]).

use tracing::info;
use trustroot_core::{normalize_tags, CoreError, Id, PairingPurpose, ResourceClass};
use trustroot_seal::{Entity, EntityKind, Identity, PairingKey, PublicEntity};
use trustroot_store::Backend;

use super::handshake::{open_org_reply, HandshakeHandler};
use crate::config::OrgRef;
use crate::drain::{drain, Channel, DrainReport, INVITE};
use crate::environment::Environment;
use crate::error::{validation, Result, TrustError};
use crate::params::{AdminJoinParams, DeleteParams, Validate};

pub struct Admins<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> Admins<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    /// Issue an invite pairing key for `name`.
    ///
    /// The returned key is the out-of-band credential handed to the invitee.
    pub async fn invite(&self, name: &str) -> Result<PairingKey> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(validation("admin name is required"));
        }
        let ctx = self.env.admin_context().await?;
        let pairing = PairingKey::generate();

        let (id, secret) = (pairing.id, pairing.secret().to_string());
        let tags = normalize_tags(&name);
        self.env
            .update_index(&ctx, move |index| {
                if index.contains(ResourceClass::Admin, &name) {
                    return Err(CoreError::DuplicateName {
                        class: ResourceClass::Admin,
                        name,
                    }
                    .into());
                }
                index.add_pairing_key(id, &secret, PairingPurpose::Invite, tags);
                Ok(())
            })
            .await?;

        info!(org = %ctx.org.id(), invite = %pairing.id, "issued admin invite");
        Ok(pairing)
    }

    /// Join an organization with an invite. Returns the new admin id.
    pub async fn join(&self, params: AdminJoinParams) -> Result<Id> {
        params.validate()?;
        let mut local = self.env.local_config().await?;
        if let Some(existing) = &local.org {
            return Err(validation(format!(
                "this home already belongs to organization '{}'",
                existing.name
            )));
        }

        let admin = Entity::generate(EntityKind::Admin, params.name.trim());
        self.env.keep_entity(&admin).await?;

        let pairing = PairingKey::new(params.invite_id, params.invite_key);
        let request = admin.encrypt_then_authenticate(&admin.dump_public()?, &pairing)?;
        self.env
            .api()
            .push_incoming(&params.org_id, INVITE, &request.to_bytes()?)
            .await?;

        local.org = Some(OrgRef {
            id: params.org_id,
            name: params.org_name,
        });
        local.admin_id = Some(admin.id());
        self.env.save_local_config(&local).await?;

        info!(org = %params.org_id, admin = %admin.id(), "sent join request");
        Ok(admin.id())
    }

    /// Process pending join requests.
    pub async fn run(&self) -> Result<DrainReport> {
        let ctx = self.env.admin_context().await?;
        let mut handler = HandshakeHandler::new(self.env, &ctx, PairingPurpose::Invite);
        drain(
            self.env.api(),
            Channel::incoming(ctx.org.id(), INVITE),
            self.env.config().invite_failure_policy,
            None,
            &mut handler,
        )
        .await
    }

    /// Receive the organization's answer to a join request.
    ///
    /// An answer that fails to open is pushed back before the error returns.
    pub async fn complete(&self, invite_id: Id, invite_key: &str) -> Result<PublicEntity> {
        let local = self.env.local_config().await?;
        let (org_ref, admin_id) = match (local.org, local.admin_id) {
            (Some(org), Some(admin)) => (org, admin),
            _ => return Err(TrustError::NotConfigured("no pending join in this home".into())),
        };

        let pairing = PairingKey::new(invite_id, invite_key);
        let item = self.env.api().pop_incoming(&admin_id, INVITE).await?;
        let org = match open_org_reply(&item, &pairing, org_ref.id) {
            Ok(org) => org,
            Err(err) => {
                self.env.api().push_incoming(&admin_id, INVITE, &item).await?;
                return Err(err);
            }
        };

        self.env
            .home()
            .send_public(&org.id, &org.id, &org.dump()?)
            .await?;
        info!(org = %org.id, admin = %admin_id, "joined organization");
        Ok(org)
    }

    /// Admin names with their ids.
    pub async fn list(&self) -> Result<Vec<(String, Id)>> {
        let ctx = self.env.admin_context().await?;
        Ok(self.env.load_index(&ctx).await?.names(ResourceClass::Admin))
    }

    pub async fn show(&self, name: &str) -> Result<PublicEntity> {
        let ctx = self.env.admin_context().await?;
        let id = self.env.load_index(&ctx).await?.get(ResourceClass::Admin, name)?;
        self.env.fetch_public(&id, &id).await
    }

    /// Remove an admin and re-encrypt the organization for those remaining.
    pub async fn delete(&self, params: DeleteParams) -> Result<()> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        if ctx.admin.name() == params.name {
            return Err(validation("an admin cannot delete itself"));
        }

        let name = params.name.clone();
        let index = self
            .env
            .update_index(&ctx, move |index| {
                index.remove(ResourceClass::Admin, &name)?;
                Ok(index.clone())
            })
            .await?;
        self.env.broadcast_org(&ctx.org, &index).await?;

        info!(org = %ctx.org.id(), admin = %params.name, "deleted admin");
        Ok(())
    }
}
