//! Indexed X.509 resources.

use serde::de::DeserializeOwned;
use serde::Serialize;
use trustroot_core::{Id, ResourceClass};
use trustroot_x509::{Ca, Certificate, Csr};

/// A value stored under the organization and indexed by name.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    const CLASS: ResourceClass;

    fn id(&self) -> Id;
    fn name(&self) -> &str;
}

impl Resource for Ca {
    const CLASS: ResourceClass = ResourceClass::Ca;

    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Resource for Certificate {
    const CLASS: ResourceClass = ResourceClass::Certificate;

    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Resource for Csr {
    const CLASS: ResourceClass = ResourceClass::Csr;

    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
