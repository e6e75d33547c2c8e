//! Node enrollment and certificate exchange.
//!
//! Node side: [`Nodes::create`] registers with a pairing key and fills the
//! CSR pool, [`Nodes::complete`] receives the organization handshake and
//! [`Nodes::run`] takes delivered certificates. Organization side:
//! [`Nodes::register`] accepts registrations and [`Nodes::issue`] signs a
//! node's outstanding CSRs.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info};
use trustroot_core::{from_cbor, normalize_tags, to_cbor, Id, PairingPurpose, ResourceClass};
use trustroot_seal::{
    Container, Entity, EntityKind, Identity, PairingKey, PrivateIdentity, PublicEntity, SealMode,
};
use trustroot_store::Backend;
use trustroot_x509::{Ca, Certificate, Csr, DnScope};

use super::handshake::{open_org_reply, HandshakeHandler};
use crate::config::{NodeRef, PendingPairing};
use crate::drain::{drain, Channel, DrainReport, ItemHandler, ItemOutcome, CERTS, CSRS, REGISTRATION};
use crate::environment::{AdminContext, Environment, NodeContext};
use crate::error::{validation, Result, TrustError};
use crate::params::{resolve_tags, DeleteParams, NodeCreateParams, NodeIssueParams, Validate};

/// A registered node as the organization sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub public: PublicEntity,
    pub tags: BTreeSet<String>,
}

pub struct Nodes<'e, B: Backend> {
    env: &'e Environment<B>,
}

impl<'e, B: Backend> Nodes<'e, B> {
    pub(crate) fn new(env: &'e Environment<B>) -> Self {
        Self { env }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node side
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a node identity, send its registration and fill its CSR pool.
    pub async fn create(&self, params: NodeCreateParams) -> Result<Id> {
        params.validate()?;
        let name = params.name.trim().to_string();
        let mut local = self.env.local_config().await?;
        if local.nodes.contains_key(&name) {
            return Err(validation(format!("node '{name}' already exists in this home")));
        }

        let node = Entity::generate(EntityKind::Node, name.clone());
        self.env.keep_entity(&node).await?;

        let pairing = PairingKey::new(params.pairing_id, params.pairing_key.clone());
        let request = node.encrypt_then_authenticate(&node.dump_public()?, &pairing)?;
        self.env
            .api()
            .push_incoming(&params.org_id, REGISTRATION, &request.to_bytes()?)
            .await?;

        local.nodes.insert(
            name.clone(),
            NodeRef {
                id: node.id(),
                org_id: params.org_id,
                pairing: Some(PendingPairing {
                    id: params.pairing_id,
                    key: params.pairing_key,
                }),
            },
        );
        self.env.save_local_config(&local).await?;
        info!(node = %node.id(), org = %params.org_id, "sent node registration");

        let ctx = self.env.node_context(&name).await?;
        self.fill_pool(&ctx).await?;
        Ok(node.id())
    }

    /// Receive the organization's answer to the registration.
    pub async fn complete(&self, name: &str) -> Result<PublicEntity> {
        let ctx = self.env.node_context(name).await?;
        let pending = ctx
            .node_ref
            .pairing
            .clone()
            .ok_or_else(|| validation(format!("node '{name}' is already registered")))?;
        let node_id = ctx.node.id();

        let pairing = PairingKey::new(pending.id, pending.key);
        let item = self.env.api().pop_incoming(&node_id, REGISTRATION).await?;
        let org = match open_org_reply(&item, &pairing, ctx.node_ref.org_id) {
            Ok(org) => org,
            Err(err) => {
                self.env
                    .api()
                    .push_incoming(&node_id, REGISTRATION, &item)
                    .await?;
                return Err(err);
            }
        };

        self.env
            .home()
            .send_public(&org.id, &org.id, &org.dump()?)
            .await?;
        let mut local = self.env.local_config().await?;
        if let Some(node_ref) = local.nodes.get_mut(name) {
            node_ref.pairing = None;
        }
        self.env.save_local_config(&local).await?;

        info!(node = %node_id, org = %org.id, "node registered");
        Ok(org)
    }

    /// Top the node's CSR pool up to the configured minimum.
    pub async fn create_csrs(&self, name: &str) -> Result<Vec<Id>> {
        let ctx = self.env.node_context(name).await?;
        self.fill_pool(&ctx).await
    }

    /// Take delivered certificates, then refill the CSR pool.
    ///
    /// The first certificate that cannot be processed stops the run.
    pub async fn run(&self, name: &str) -> Result<DrainReport> {
        let ctx = self.env.node_context(name).await?;
        let org = ctx.org()?;

        let mut handler = CertificateHandler {
            env: self.env,
            ctx: &ctx,
            org,
        };
        let report = drain(
            self.env.api(),
            Channel::incoming(ctx.node.id(), CERTS),
            self.env.config().invite_failure_policy,
            None,
            &mut handler,
        )
        .await?;

        self.fill_pool(&ctx).await?;
        Ok(report)
    }

    /// Certificates this node holds with their private keys.
    pub async fn certificates(&self, name: &str) -> Result<Vec<Certificate>> {
        let ctx = self.env.node_context(name).await?;
        let index = self.env.load_node_index(&ctx).await?;
        let mut certificates = Vec::new();
        for id in index.list(ResourceClass::Certificate) {
            certificates.push(self.env.load_object(&ctx.node, &id).await?);
        }
        Ok(certificates)
    }

    async fn fill_pool(&self, ctx: &NodeContext) -> Result<Vec<Id>> {
        let node_id = ctx.node.id();
        let outstanding = self.env.api().outgoing_size(&node_id, CSRS).await?;
        let missing = self.env.config().min_csrs.saturating_sub(outstanding);

        let mut created = Vec::with_capacity(missing);
        for _ in 0..missing {
            let csr = Csr::generate(&ctx.name, &DnScope::default(), self.env.config().key_type)?;
            self.env.save_object(&ctx.node, &csr.id, &csr).await?;
            let signed = ctx.node.sign(&to_cbor(&csr.public())?)?;
            self.env
                .api()
                .push_outgoing(&node_id, CSRS, &signed.to_bytes()?)
                .await?;
            created.push(csr.id);
        }

        if !created.is_empty() {
            let ids = created.clone();
            self.env
                .update_node_index(ctx, move |index| {
                    for id in ids {
                        index.add(ResourceClass::Csr, &id.to_hex(), id)?;
                    }
                    Ok(())
                })
                .await?;
        }

        debug!(node = %node_id, outstanding, created = created.len(), "filled CSR pool");
        Ok(created)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Organization side
    // ─────────────────────────────────────────────────────────────────────────

    /// Process pending node registrations.
    pub async fn register(&self) -> Result<DrainReport> {
        let ctx = self.env.admin_context().await?;
        let mut handler = HandshakeHandler::new(self.env, &ctx, PairingPurpose::Registration);
        drain(
            self.env.api(),
            Channel::incoming(ctx.org.id(), REGISTRATION),
            self.env.config().invite_failure_policy,
            None,
            &mut handler,
        )
        .await
    }

    /// Sign a node's outstanding CSRs and deliver the certificates.
    ///
    /// Returns the names of the organization's copies.
    pub async fn issue(&self, params: NodeIssueParams) -> Result<Vec<String>> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let node_id = self
            .env
            .load_index(&ctx)
            .await?
            .get(ResourceClass::Node, &params.node)?;
        let node = self.env.fetch_public(&ctx.org.id(), &node_id).await?;
        let ca = self.env.cas().find(&ctx, &params.ca).await?;

        let mut handler = IssueHandler {
            env: self.env,
            ctx: &ctx,
            node: &node,
            ca: &ca,
            params: &params,
            issued: Vec::new(),
        };
        let report = drain(
            self.env.api(),
            Channel::outgoing(node_id, CSRS),
            self.env.config().invite_failure_policy,
            params.limit,
            &mut handler,
        )
        .await?;

        info!(node = %params.node, ca = %params.ca, ?report, "issued certificates");
        Ok(handler.issued)
    }

    /// Registered node names with their ids.
    pub async fn list(&self) -> Result<Vec<(String, Id)>> {
        let ctx = self.env.admin_context().await?;
        Ok(self.env.load_index(&ctx).await?.names(ResourceClass::Node))
    }

    pub async fn show(&self, name: &str) -> Result<NodeInfo> {
        let ctx = self.env.admin_context().await?;
        let index = self.env.load_index(&ctx).await?;
        let id = index.get(ResourceClass::Node, name)?;
        Ok(NodeInfo {
            public: self.env.fetch_public(&ctx.org.id(), &id).await?,
            tags: index.tags(&id),
        })
    }

    pub async fn delete(&self, params: DeleteParams) -> Result<()> {
        params.validate()?;
        let ctx = self.env.admin_context().await?;
        let id = self
            .env
            .load_index(&ctx)
            .await?
            .get(ResourceClass::Node, &params.name)?;
        self.env.api().delete_public(&ctx.org.id(), &id).await?;
        self.env
            .update_index(&ctx, |index| Ok(index.remove(ResourceClass::Node, &params.name)?))
            .await?;
        info!(org = %ctx.org.id(), node = %params.name, "deleted node");
        Ok(())
    }
}

/// Node side of certificate delivery. Every failure is fatal.
struct CertificateHandler<'e, B: Backend> {
    env: &'e Environment<B>,
    ctx: &'e NodeContext,
    org: &'e PublicEntity,
}

impl<'e, B: Backend> CertificateHandler<'e, B> {
    async fn accept(&self, item: &[u8]) -> Result<Id> {
        let node = &self.ctx.node;
        let container = Container::from_bytes(item)?;
        let mut cert: Certificate = from_cbor(&node.open_from(&container, self.org)?)?;

        let csr_id = cert.id;
        let csr: Csr = match self.env.load_object(node, &csr_id).await {
            Err(err) if err.is_store_not_found() => {
                return Err(TrustError::UnmatchedCertificate(csr_id))
            }
            other => other?,
        };

        cert.private_key_pem = csr.private_key_pem;
        cert.id = Id::generate();
        let cert_id = cert.id;
        self.env.save_object(node, &cert_id, &cert).await?;
        self.env.delete_object(&node.id(), &csr_id).await?;
        self.env
            .update_node_index(self.ctx, move |index| {
                let csr_name = csr_id.to_hex();
                if index.contains(ResourceClass::Csr, &csr_name) {
                    index.remove(ResourceClass::Csr, &csr_name)?;
                }
                index.add(ResourceClass::Certificate, &cert_id.to_hex(), cert_id)?;
                Ok(())
            })
            .await?;

        debug!(node = %node.id(), csr = %csr_id, certificate = %cert_id, "stored certificate");
        Ok(cert_id)
    }
}

#[async_trait]
impl<'e, B: Backend> ItemHandler for CertificateHandler<'e, B> {
    async fn handle(&mut self, item: &[u8]) -> ItemOutcome {
        match self.accept(item).await {
            Ok(_) => ItemOutcome::Consumed,
            Err(err) => ItemOutcome::Fatal(err),
        }
    }
}

/// Organization side of CSR signing.
///
/// A CSR that fails verification follows the failure policy; a failure to
/// sign, store or deliver stops the run.
struct IssueHandler<'e, B: Backend> {
    env: &'e Environment<B>,
    ctx: &'e AdminContext,
    node: &'e PublicEntity,
    ca: &'e Ca,
    params: &'e NodeIssueParams,
    issued: Vec<String>,
}

impl<'e, B: Backend> IssueHandler<'e, B> {
    fn open(&self, item: &[u8]) -> Result<Csr> {
        let container = Container::from_bytes(item)?;
        container.expect_mode(SealMode::Signed)?;
        self.node.verify(&container)?;
        Ok(from_cbor(&container.body)?)
    }

    async fn sign(&self, csr: Csr) -> Result<String> {
        let delivered = self.ca.sign(&csr, self.params.keep_subject)?;

        let mut copy = delivered.clone();
        copy.id = Id::generate();
        copy.name = format!("{}-{}", self.node.name, &csr.id.to_hex()[..8]);
        let mut tags = resolve_tags(self.params.tags.as_deref(), &copy.name);
        tags.extend(normalize_tags(&self.node.name));
        self.env.store_resource(self.ctx, &copy, tags).await?;

        let sealed = self
            .ctx
            .org
            .encrypt_then_sign(&to_cbor(&delivered)?, &[self.node as &dyn Identity])?
            .to_bytes()?;
        self.env
            .api()
            .push_incoming(&self.node.id, CERTS, &sealed)
            .await?;
        Ok(copy.name)
    }
}

#[async_trait]
impl<'e, B: Backend> ItemHandler for IssueHandler<'e, B> {
    async fn handle(&mut self, item: &[u8]) -> ItemOutcome {
        let csr = match self.open(item) {
            Ok(csr) => csr,
            Err(err) => return ItemOutcome::Requeue(err),
        };
        match self.sign(csr).await {
            Ok(name) => {
                self.issued.push(name);
                ItemOutcome::Consumed
            }
            Err(err) => ItemOutcome::Fatal(err),
        }
    }
}
