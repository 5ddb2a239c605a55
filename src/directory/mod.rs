//! Address directory abstraction
//!
//! The narrow slice of the cloud address-management API the binder uses:
//! look up an address, detach it, find the host's interface, attach.
//! Every call is a single round trip with no local retry.
//!
//! Implementations:
//! - [`Ec2Directory`]: AWS EC2 via `aws-sdk-ec2`
//! - `MockDirectory` (test-fixtures): in-memory double recording calls

mod ec2;

pub use ec2::Ec2Directory;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DirectoryError;

/// An Elastic IP as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub public_ip: String,
    /// Reservation id (`eipalloc-...`), required to attach
    pub allocation_id: String,
    /// Present iff the address is attached to an interface somewhere
    pub association_id: Option<String>,
}

impl Address {
    pub fn new(public_ip: impl Into<String>, allocation_id: impl Into<String>) -> Self {
        Self {
            public_ip: public_ip.into(),
            allocation_id: allocation_id.into(),
            association_id: None,
        }
    }

    pub fn with_association(mut self, association_id: impl Into<String>) -> Self {
        self.association_id = Some(association_id.into());
        self
    }

    pub fn is_attached(&self) -> bool {
        self.association_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// A network interface an address can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentPoint {
    /// Interface id (`eni-...`)
    pub id: String,
}

impl AttachmentPoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Cloud address-management capability
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    /// All addresses whose public IP is `public_ip`
    async fn lookup_address(&self, public_ip: &str) -> Result<Vec<Address>, DirectoryError>;

    /// Remove an existing association
    async fn detach(&self, association_id: &str) -> Result<(), DirectoryError>;

    /// Interfaces that currently carry `public_ip`
    async fn find_attachment_points(
        &self,
        public_ip: &str,
    ) -> Result<Vec<AttachmentPoint>, DirectoryError>;

    /// Associate an allocation with an interface, returning the new
    /// association id when the API reports one
    async fn attach(
        &self,
        allocation_id: &str,
        attachment_point_id: &str,
    ) -> Result<Option<String>, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_attached_only_with_non_empty_association() {
        let address = Address::new("54.162.153.80", "eipalloc-111");
        assert!(!address.is_attached());
        assert!(address.clone().with_association("eipassoc-old").is_attached());
        assert!(!address.with_association("").is_attached());
    }
}
