//! # trustroot testkit
//!
//! Testing utilities for trustroot.
//!
//! - **Fixtures**: an organization over in-memory stores, with helpers that
//!   run the full admin and node enrollment handshakes
//! - **Generators**: proptest strategies for names, tag strings and DN scopes
//!
//! ```rust,no_run
//! use trustroot_testkit::fixtures::TestOrg;
//!
//! async fn example() -> trustroot::Result<()> {
//!     let org = TestOrg::new().await?;
//!     let bob = org.enroll_admin("bob").await?;
//!     assert_eq!(bob.admins().list().await?.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{write_pem, TestOrg};
