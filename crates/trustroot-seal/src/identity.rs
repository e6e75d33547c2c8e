//! The identity capability.
//!
//! Organizations, admins and nodes all seal and open containers the same
//! way, so the behavior lives on two traits instead of on each entity:
//!
//! - [`Identity`]: what anyone holding the public half can do (verify a
//!   signature, address encrypted content to it, pairing-key sealing).
//! - [`PrivateIdentity`]: what only the key holder can do (sign,
//!   encrypt-then-sign, verify-then-decrypt).

use serde::{Deserialize, Serialize};
use std::fmt;
use trustroot_core::{from_cbor, to_cbor, Ed25519PublicKey, Ed25519Signature, Id, Keypair};

use crate::container::{Container, SealMode, SealedBody};
use crate::crypto::{EncryptionKey, X25519PublicKey, X25519StaticSecret};
use crate::envelope::EncryptedPayload;
use crate::error::{Result, SealError};
use crate::keyshare::KeyShare;
use crate::pairing::PairingKey;

/// Entity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Organization,
    Admin,
    Node,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Organization => "organization",
            EntityKind::Admin => "admin",
            EntityKind::Node => "node",
        })
    }
}

/// Public side of the identity capability.
pub trait Identity {
    fn id(&self) -> Id;
    fn name(&self) -> &str;
    fn kind(&self) -> EntityKind;
    fn signing_key(&self) -> Ed25519PublicKey;
    fn encryption_key(&self) -> X25519PublicKey;

    /// Check that `container` was signed by this identity.
    fn verify(&self, container: &Container) -> Result<()> {
        if container.mode == SealMode::Authenticated {
            return Err(SealError::UnexpectedMode {
                expected: SealMode::Signed,
                found: container.mode,
            });
        }
        if container.source != self.id() {
            return Err(SealError::SignerMismatch {
                expected: self.id(),
                found: container.source,
            });
        }

        let signature = Ed25519Signature::from_slice(&container.signature)
            .map_err(|_| SealError::InvalidSignature)?;
        self.signing_key()
            .verify(&container.signing_bytes()?, &signature)
            .map_err(|_| SealError::InvalidSignature)
    }

    /// Seal `plaintext` with a pairing key, naming this identity as source.
    fn encrypt_then_authenticate(&self, plaintext: &[u8], pairing: &PairingKey) -> Result<Container> {
        pairing.seal(self.id(), plaintext)
    }

    /// Open a pairing-key container.
    fn verify_authentication_then_decrypt(
        &self,
        container: &Container,
        pairing: &PairingKey,
    ) -> Result<Vec<u8>> {
        pairing.open(container)
    }

    /// Copy out the public half.
    fn to_public(&self) -> PublicEntity {
        PublicEntity {
            id: self.id(),
            name: self.name().to_string(),
            kind: self.kind(),
            signing_key: self.signing_key(),
            encryption_key: self.encryption_key(),
        }
    }
}

/// Private side of the identity capability.
pub trait PrivateIdentity: Identity {
    fn keypair(&self) -> &Keypair;
    fn encryption_secret(&self) -> &X25519StaticSecret;

    /// Sign a plaintext body.
    fn sign(&self, plaintext: &[u8]) -> Result<Container> {
        self.finish(Container::unsigned(
            self.id(),
            SealMode::Signed,
            &self.id(),
            plaintext.to_vec(),
        ))
    }

    /// Encrypt for `recipients`, then sign.
    ///
    /// An empty recipient list seals the container for this identity alone.
    fn encrypt_then_sign(&self, plaintext: &[u8], recipients: &[&dyn Identity]) -> Result<Container> {
        let targets: Vec<(Id, X25519PublicKey)> = if recipients.is_empty() {
            vec![(self.id(), self.encryption_key())]
        } else {
            recipients
                .iter()
                .map(|r| (r.id(), r.encryption_key()))
                .collect()
        };

        let content_key = EncryptionKey::generate();
        let payload = EncryptedPayload::encrypt(plaintext, &content_key)?;
        let shares = targets
            .iter()
            .map(|(id, public)| KeyShare::wrap(*id, public, &content_key))
            .collect::<Result<Vec<_>>>()?;

        let body = to_cbor(&SealedBody { payload, shares })?;
        self.finish(Container::unsigned(
            self.id(),
            SealMode::SignedEncrypted,
            &self.id(),
            body,
        ))
    }

    /// Verify a container signed by this identity, then decrypt it.
    fn verify_then_decrypt(&self, container: &Container) -> Result<Vec<u8>> {
        self.verify(container)?;
        self.decrypt(container)
    }

    /// Verify a container signed by `sender`, then decrypt it.
    fn open_from(&self, container: &Container, sender: &dyn Identity) -> Result<Vec<u8>> {
        sender.verify(container)?;
        self.decrypt(container)
    }

    /// Decrypt a sealed body addressed to this identity without verifying.
    fn decrypt(&self, container: &Container) -> Result<Vec<u8>> {
        let body = container.sealed_body()?;
        let share = body
            .shares
            .iter()
            .find(|s| s.recipient == self.id())
            .ok_or(SealError::NotARecipient(self.id()))?;
        let content_key = share.unwrap_key(self.encryption_secret())?;
        body.payload.decrypt(&content_key)
    }

    #[doc(hidden)]
    fn finish(&self, mut container: Container) -> Result<Container> {
        container.signature = self
            .keypair()
            .sign(&container.signing_bytes()?)
            .as_bytes()
            .to_vec();
        Ok(container)
    }
}

/// Stored form of an entity. Secret fields are absent in the public dump.
#[derive(Serialize, Deserialize)]
struct EntityDocument {
    id: Id,
    name: String,
    kind: EntityKind,
    signing_key: Ed25519PublicKey,
    encryption_key: X25519PublicKey,
    signing_seed: Option<[u8; 32]>,
    encryption_secret: Option<[u8; 32]>,
}

/// An entity with its private keys.
#[derive(Clone)]
pub struct Entity {
    id: Id,
    name: String,
    kind: EntityKind,
    keypair: Keypair,
    encryption: X25519StaticSecret,
}

impl Entity {
    /// Generate a new entity with fresh keys.
    pub fn generate(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: Id::generate(),
            name: name.into(),
            kind,
            keypair: Keypair::generate(),
            encryption: X25519StaticSecret::generate(),
        }
    }

    /// Private dump, including secrets.
    pub fn dump(&self) -> Result<Vec<u8>> {
        Ok(to_cbor(&EntityDocument {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            signing_key: self.signing_key(),
            encryption_key: self.encryption_key(),
            signing_seed: Some(self.keypair.seed()),
            encryption_secret: Some(self.encryption.to_bytes()),
        })?)
    }

    /// Public dump.
    pub fn dump_public(&self) -> Result<Vec<u8>> {
        self.to_public().dump()
    }

    /// Restore from a private dump.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc: EntityDocument = from_cbor(bytes)?;
        let (Some(seed), Some(secret)) = (doc.signing_seed, doc.encryption_secret) else {
            return Err(SealError::InvalidEntity(format!(
                "{} {} has no private keys",
                doc.kind, doc.id
            )));
        };

        let entity = Self {
            id: doc.id,
            name: doc.name,
            kind: doc.kind,
            keypair: Keypair::from_seed(&seed),
            encryption: X25519StaticSecret::from_bytes(secret),
        };
        if entity.signing_key() != doc.signing_key || entity.encryption_key() != doc.encryption_key {
            return Err(SealError::InvalidEntity(format!(
                "{} {} keys do not match their public halves",
                entity.kind, entity.id
            )));
        }
        Ok(entity)
    }
}

impl Identity for Entity {
    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn signing_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    fn encryption_key(&self) -> X25519PublicKey {
        self.encryption.public_key()
    }
}

impl PrivateIdentity for Entity {
    fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    fn encryption_secret(&self) -> &X25519StaticSecret {
        &self.encryption
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The public half of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicEntity {
    pub id: Id,
    pub name: String,
    pub kind: EntityKind,
    pub signing_key: Ed25519PublicKey,
    pub encryption_key: X25519PublicKey,
}

impl PublicEntity {
    /// Public dump.
    pub fn dump(&self) -> Result<Vec<u8>> {
        Ok(to_cbor(&EntityDocument {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            signing_key: self.signing_key,
            encryption_key: self.encryption_key,
            signing_seed: None,
            encryption_secret: None,
        })?)
    }

    /// Restore from a public or private dump, keeping only the public half.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc: EntityDocument = from_cbor(bytes)?;
        Ok(Self {
            id: doc.id,
            name: doc.name,
            kind: doc.kind,
            signing_key: doc.signing_key,
            encryption_key: doc.encryption_key,
        })
    }
}

impl Identity for PublicEntity {
    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn signing_key(&self) -> Ed25519PublicKey {
        self.signing_key
    }

    fn encryption_key(&self) -> X25519PublicKey {
        self.encryption_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(name: &str) -> Entity {
        Entity::generate(EntityKind::Admin, name)
    }

    #[test]
    fn test_sign_verify() {
        let org = Entity::generate(EntityKind::Organization, "acme");
        let container = org.sign(b"certificate").unwrap();

        org.verify(&container).unwrap();
        org.to_public().verify(&container).unwrap();
        assert_eq!(container.body, b"certificate");
    }

    #[test]
    fn test_verify_rejects_other_signer() {
        let org = Entity::generate(EntityKind::Organization, "acme");
        let mallory = Entity::generate(EntityKind::Organization, "acme");
        let mut container = mallory.sign(b"forged").unwrap();

        assert!(matches!(
            org.verify(&container),
            Err(SealError::SignerMismatch { .. })
        ));

        // Claiming the org as source does not help without its key.
        container.source = org.id();
        assert!(matches!(org.verify(&container), Err(SealError::InvalidSignature)));
    }

    #[test]
    fn test_encrypt_for_self() {
        let org = Entity::generate(EntityKind::Organization, "acme");
        let container = org.encrypt_then_sign(b"index", &[]).unwrap();

        assert_eq!(container.recipients().unwrap(), vec![org.id()]);
        assert_eq!(org.verify_then_decrypt(&container).unwrap(), b"index");
    }

    #[test]
    fn test_encrypt_for_many_recipients() {
        let org = Entity::generate(EntityKind::Organization, "acme");
        let alice = admin("alice");
        let bob = admin("bob");
        let carol = admin("carol");

        let recipients: [&dyn Identity; 2] = [&alice, &bob];
        let container = org.encrypt_then_sign(b"org secret", &recipients).unwrap();

        assert_eq!(alice.open_from(&container, &org).unwrap(), b"org secret");
        assert_eq!(bob.open_from(&container, &org.to_public()).unwrap(), b"org secret");
        assert!(matches!(
            carol.open_from(&container, &org),
            Err(SealError::NotARecipient(_))
        ));
    }

    #[test]
    fn test_tampered_sealed_container_fails_verification() {
        let org = Entity::generate(EntityKind::Organization, "acme");
        let mut container = org.encrypt_then_sign(b"index", &[]).unwrap();
        container.body.push(0);
        assert!(org.verify_then_decrypt(&container).is_err());
    }

    #[test]
    fn test_pairing_through_identity() {
        let joining = admin("dave");
        let org = Entity::generate(EntityKind::Organization, "acme");
        let pairing = PairingKey::generate();

        let container = joining
            .encrypt_then_authenticate(&joining.dump_public().unwrap(), &pairing)
            .unwrap();
        assert_eq!(container.source, joining.id());

        let opened = org.verify_authentication_then_decrypt(&container, &pairing).unwrap();
        assert_eq!(PublicEntity::load(&opened).unwrap(), joining.to_public());
    }

    #[test]
    fn test_dump_load() {
        let node = Entity::generate(EntityKind::Node, "web1");
        let restored = Entity::load(&node.dump().unwrap()).unwrap();
        assert_eq!(restored.to_public(), node.to_public());

        let public = PublicEntity::load(&node.dump_public().unwrap()).unwrap();
        assert_eq!(public, node.to_public());
    }

    #[test]
    fn test_public_dump_cannot_load_as_private() {
        let node = Entity::generate(EntityKind::Node, "web1");
        assert!(matches!(
            Entity::load(&node.dump_public().unwrap()),
            Err(SealError::InvalidEntity(_))
        ));
    }
}
