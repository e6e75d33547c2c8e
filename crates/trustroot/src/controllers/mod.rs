//! Controllers, one per resource. Each borrows the [`Environment`] and loads
//! the identities it needs per call.
//!
//! [`Environment`]: crate::Environment

mod admin;
mod ca;
mod certificate;
mod csr;
mod handshake;
mod node;
mod org;
mod pairing_key;

pub use admin::Admins;
pub use ca::CaController;
pub use certificate::Certificates;
pub use csr::Csrs;
pub use node::{NodeInfo, Nodes};
pub use org::{OrgInfo, Orgs};
pub use pairing_key::{PairingKeyInfo, PairingKeys};
