//! Instance metadata abstraction
//!
//! The binder only needs two facts about the host it runs on: its current
//! public IPv4 address and its instance id. Both come from a token-gated
//! metadata service (IMDSv2 on EC2).
//!
//! Implementations:
//! - [`ImdsClient`]: EC2 Instance Metadata Service v2 over HTTP
//! - `MockMetadata` (test-fixtures): in-memory double

mod imds;

pub use imds::ImdsClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::MetadataError;

/// Identity of the calling host, fetched fresh on every bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub public_ip: String,
    pub instance_id: String,
}

/// Token-gated metadata service
///
/// Both calls run once per request with no retry; a single failure is
/// terminal for that call.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Acquire a session token for subsequent reads
    async fn fetch_token(&self) -> Result<String, MetadataError>;

    /// Read the metadata value at `path` (e.g. `meta-data/instance-id`)
    async fn fetch_metadata(&self, token: &str, path: &str) -> Result<String, MetadataError>;
}
