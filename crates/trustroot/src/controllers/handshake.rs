//! Organization side of the pairing-key handshake, shared by admin invites
//! and node registrations.

use async_trait::async_trait;
use tracing::info;
use trustroot_core::{Id, PairingPurpose, ResourceClass};
use trustroot_seal::{Container, EntityKind, Identity, PairingKey, PublicEntity};
use trustroot_store::Backend;

use crate::drain::{ItemHandler, ItemOutcome, INVITE, REGISTRATION};
use crate::environment::{expect_kind, AdminContext, Environment};
use crate::error::{Result, TrustError};

/// Consumes one handshake per item. Every failure requeues the item.
pub(crate) struct HandshakeHandler<'e, B: Backend> {
    env: &'e Environment<B>,
    ctx: &'e AdminContext,
    purpose: PairingPurpose,
}

impl<'e, B: Backend> HandshakeHandler<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>, ctx: &'e AdminContext, purpose: PairingPurpose) -> Self {
        Self { env, ctx, purpose }
    }

    pub(crate) fn channel(purpose: PairingPurpose) -> &'static str {
        match purpose {
            PairingPurpose::Invite => INVITE,
            PairingPurpose::Registration => REGISTRATION,
        }
    }

    fn roles(&self) -> (ResourceClass, EntityKind) {
        match self.purpose {
            PairingPurpose::Invite => (ResourceClass::Admin, EntityKind::Admin),
            PairingPurpose::Registration => (ResourceClass::Node, EntityKind::Node),
        }
    }

    async fn accept(&self, item: &[u8]) -> Result<()> {
        let org = &self.ctx.org;
        let (class, kind) = self.roles();

        let container = Container::from_bytes(item)?;
        let key_id = container.key_id()?;
        let entry = self
            .env
            .load_index(self.ctx)
            .await?
            .get_pairing_key_for(&key_id, self.purpose)?
            .clone();
        let pairing = PairingKey::new(key_id, entry.key);
        let newcomer = PublicEntity::load(&pairing.open(&container)?)?;
        expect_kind(kind, newcomer.kind)?;

        if self.purpose == PairingPurpose::Registration {
            self.env
                .api()
                .send_public(&org.id(), &newcomer.id, &newcomer.dump()?)
                .await?;
        }

        // The pairing key stays until the reply is queued, so a requeued
        // item can be replayed; `add` accepts the same (name, id) again.
        let (id, name, tags) = (newcomer.id, newcomer.name.clone(), entry.tags);
        let index = self
            .env
            .update_index(self.ctx, move |index| {
                index.add(class, &name, id)?;
                index.add_tags(id, tags);
                Ok(index.clone())
            })
            .await?;

        if self.purpose == PairingPurpose::Invite {
            self.env.broadcast_org(org, &index).await?;
        }

        let reply = org.encrypt_then_authenticate(&org.dump_public()?, &pairing)?;
        self.env
            .api()
            .push_incoming(&newcomer.id, Self::channel(self.purpose), &reply.to_bytes()?)
            .await?;
        self.env
            .update_index(self.ctx, move |index| {
                index.remove_pairing_key(&key_id)?;
                Ok(())
            })
            .await?;

        info!(org = %org.id(), %kind, name = %newcomer.name, id = %newcomer.id, "accepted handshake");
        Ok(())
    }
}

#[async_trait]
impl<'e, B: Backend> ItemHandler for HandshakeHandler<'e, B> {
    async fn handle(&mut self, item: &[u8]) -> ItemOutcome {
        match self.accept(item).await {
            Ok(()) => ItemOutcome::Consumed,
            Err(err) => ItemOutcome::Requeue(err),
        }
    }
}

/// Open the organization's answer to a handshake on the joining side.
pub(crate) fn open_org_reply(
    item: &[u8],
    pairing: &PairingKey,
    expected_org: Id,
) -> Result<PublicEntity> {
    let container = Container::from_bytes(item)?;
    let org = PublicEntity::load(&pairing.open(&container)?)?;
    expect_kind(EntityKind::Organization, org.kind)?;
    if org.id != expected_org {
        return Err(TrustError::OrganizationMismatch {
            expected: expected_org,
            found: org.id,
        });
    }
    Ok(org)
}
