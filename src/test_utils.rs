//! Test utilities for eip-binder (test builds and `test-fixtures` feature)
//!
//! In-memory doubles for both capabilities. Each records every call in order
//! so tests can assert call counts and sequencing, and can be told to fail
//! (or hang) on a specific operation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use eip_binder::test_utils::*;
//!
//! let directory = Arc::new(
//!     MockDirectory::new()
//!         .with_address(Address::new("54.162.153.80", "eipalloc-111"))
//!         .with_attachment_point(AttachmentPoint::new("eni-aaa"))
//!         .with_new_association("eipassoc-new"),
//! );
//! let metadata = Arc::new(MockMetadata::host("10.0.0.1", "i-myinst"));
//! let binder = Binder::new(directory.clone(), metadata.clone());
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::directory::{Address, AddressDirectory, AttachmentPoint};
use crate::error::{DirectoryError, MetadataError};
use crate::metadata::MetadataClient;
use crate::util::{INSTANCE_ID_PATH, PUBLIC_IPV4_PATH};

// ═══════════════════════════════════════════════════════════════════════════
// DIRECTORY DOUBLE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
    Lookup,
    Detach,
    FindAttachmentPoints,
    Attach,
}

/// A recorded directory call with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Lookup(String),
    Detach(String),
    FindAttachmentPoints(String),
    Attach {
        allocation_id: String,
        attachment_point_id: String,
    },
}

impl DirectoryCall {
    pub fn op(&self) -> DirectoryOp {
        match self {
            Self::Lookup(_) => DirectoryOp::Lookup,
            Self::Detach(_) => DirectoryOp::Detach,
            Self::FindAttachmentPoints(_) => DirectoryOp::FindAttachmentPoints,
            Self::Attach { .. } => DirectoryOp::Attach,
        }
    }
}

/// In-memory address directory.
///
/// Tracks the live association of the target so a test can observe the
/// address being left unattached after a failed bind.
#[derive(Debug, Default)]
pub struct MockDirectory {
    addresses: Vec<Address>,
    attachment_points: Vec<AttachmentPoint>,
    new_association: Option<String>,
    failures: HashMap<DirectoryOp, DirectoryError>,
    hanging: Option<DirectoryOp>,
    calls: Mutex<Vec<DirectoryCall>>,
    association: Mutex<Option<String>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address returned by every lookup
    pub fn with_address(mut self, address: Address) -> Self {
        if self.addresses.is_empty() {
            *self.association.get_mut() = address.association_id.clone();
        }
        self.addresses.push(address);
        self
    }

    pub fn with_attachment_point(mut self, point: AttachmentPoint) -> Self {
        self.attachment_points.push(point);
        self
    }

    /// Association id returned by `attach`
    pub fn with_new_association(mut self, association_id: impl Into<String>) -> Self {
        self.new_association = Some(association_id.into());
        self
    }

    /// Make `op` fail with `error`
    pub fn failing(mut self, op: DirectoryOp, error: DirectoryError) -> Self {
        self.failures.insert(op, error);
        self
    }

    /// Make `op` never complete (for cancellation tests)
    pub fn hanging(mut self, op: DirectoryOp) -> Self {
        self.hanging = Some(op);
        self
    }

    /// All calls, in the order they were made
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: DirectoryOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// Position of the first call of `op`
    pub fn position(&self, op: DirectoryOp) -> Option<usize> {
        self.calls.lock().iter().position(|c| c.op() == op)
    }

    /// Current association of the first address (None = attached nowhere)
    pub fn current_association(&self) -> Option<String> {
        self.association.lock().clone()
    }

    async fn enter(&self, call: DirectoryCall) -> Result<(), DirectoryError> {
        let op = call.op();
        self.calls.lock().push(call);
        if self.hanging == Some(op) {
            std::future::pending::<()>().await;
        }
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AddressDirectory for MockDirectory {
    async fn lookup_address(&self, public_ip: &str) -> Result<Vec<Address>, DirectoryError> {
        self.enter(DirectoryCall::Lookup(public_ip.to_string()))
            .await?;
        Ok(self
            .addresses
            .iter()
            .filter(|a| a.public_ip == public_ip)
            .cloned()
            .collect())
    }

    async fn detach(&self, association_id: &str) -> Result<(), DirectoryError> {
        self.enter(DirectoryCall::Detach(association_id.to_string()))
            .await?;
        let mut current = self.association.lock();
        if current.as_deref() == Some(association_id) {
            *current = None;
        }
        Ok(())
    }

    async fn find_attachment_points(
        &self,
        public_ip: &str,
    ) -> Result<Vec<AttachmentPoint>, DirectoryError> {
        self.enter(DirectoryCall::FindAttachmentPoints(public_ip.to_string()))
            .await?;
        Ok(self.attachment_points.clone())
    }

    async fn attach(
        &self,
        allocation_id: &str,
        attachment_point_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        self.enter(DirectoryCall::Attach {
            allocation_id: allocation_id.to_string(),
            attachment_point_id: attachment_point_id.to_string(),
        })
        .await?;
        *self.association.lock() = self.new_association.clone();
        Ok(self.new_association.clone())
    }
}

/// Service-style error as the EC2 API would report it
pub fn api_error(operation: &'static str, code: &str) -> DirectoryError {
    DirectoryError::Api {
        operation,
        code: Some(code.to_string()),
        message: format!("{} rejected by test directory", operation),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// METADATA DOUBLE
// ═══════════════════════════════════════════════════════════════════════════

pub const MOCK_TOKEN: &str = "mock-token";

/// A recorded metadata call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataCall {
    Token,
    Read { token: String, path: String },
}

/// In-memory metadata service
#[derive(Debug)]
pub struct MockMetadata {
    values: HashMap<String, String>,
    token_error: Option<MetadataError>,
    path_errors: HashMap<String, MetadataError>,
    calls: Mutex<Vec<MetadataCall>>,
}

impl MockMetadata {
    /// A host with the given public IPv4 and instance id
    pub fn host(public_ip: &str, instance_id: &str) -> Self {
        let values = HashMap::from([
            (PUBLIC_IPV4_PATH.to_string(), public_ip.to_string()),
            (INSTANCE_ID_PATH.to_string(), instance_id.to_string()),
        ]);
        Self {
            values,
            token_error: None,
            path_errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_token(mut self, error: MetadataError) -> Self {
        self.token_error = Some(error);
        self
    }

    pub fn failing_path(mut self, path: &str, error: MetadataError) -> Self {
        self.path_errors.insert(path.to_string(), error);
        self
    }

    pub fn calls(&self) -> Vec<MetadataCall> {
        self.calls.lock().clone()
    }

    pub fn token_requests(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MetadataCall::Token))
            .count()
    }
}

#[async_trait]
impl MetadataClient for MockMetadata {
    async fn fetch_token(&self) -> Result<String, MetadataError> {
        self.calls.lock().push(MetadataCall::Token);
        match &self.token_error {
            Some(err) => Err(err.clone()),
            None => Ok(MOCK_TOKEN.to_string()),
        }
    }

    async fn fetch_metadata(&self, token: &str, path: &str) -> Result<String, MetadataError> {
        self.calls.lock().push(MetadataCall::Read {
            token: token.to_string(),
            path: path.to_string(),
        });
        if let Some(err) = self.path_errors.get(path) {
            return Err(err.clone());
        }
        self.values
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::Status {
                path: path.to_string(),
                status: 404,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_directory_tracks_association() {
        let directory = MockDirectory::new()
            .with_address(Address::new("1.2.3.4", "eipalloc-1").with_association("eipassoc-1"))
            .with_new_association("eipassoc-2");
        assert_eq!(directory.current_association().as_deref(), Some("eipassoc-1"));

        directory.detach("eipassoc-1").await.unwrap();
        assert!(directory.current_association().is_none());

        directory.attach("eipalloc-1", "eni-1").await.unwrap();
        assert_eq!(directory.current_association().as_deref(), Some("eipassoc-2"));
        assert_eq!(directory.count(DirectoryOp::Detach), 1);
        assert_eq!(directory.position(DirectoryOp::Attach), Some(1));
    }

    #[tokio::test]
    async fn test_mock_directory_failure_is_still_recorded() {
        let directory =
            MockDirectory::new().failing(DirectoryOp::Lookup, api_error("DescribeAddresses", "Throttling"));
        assert!(directory.lookup_address("1.2.3.4").await.is_err());
        assert_eq!(directory.calls(), vec![DirectoryCall::Lookup("1.2.3.4".into())]);
    }

    #[tokio::test]
    async fn test_mock_metadata_unknown_path_is_not_found() {
        let metadata = MockMetadata::host("10.0.0.1", "i-1");
        let err = metadata.fetch_metadata(MOCK_TOKEN, "meta-data/mac").await.unwrap_err();
        assert!(matches!(err, MetadataError::Status { status: 404, .. }));
    }
}
