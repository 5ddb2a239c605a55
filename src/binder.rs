//! Binder - moves an Elastic IP onto the calling host
//!
//! A bind is a strict sequence of six states with a single early exit:
//!
//! ```text
//! LookupTarget ─► IdentifyHost ─► Decide ──(already bound)──► done
//!                                   │
//!                                   ▼
//!                   DetachIfNeeded ─► LocateHostInterface ─► Attach ─► done
//! ```
//!
//! Any failure aborts the bind. Nothing is retried or rolled back: an error
//! raised after a successful detach leaves the address attached nowhere and
//! reports the old association through [`BindError::detached_association`].

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::directory::{Address, AddressDirectory, AttachmentPoint};
use crate::error::{BindError, BindStep, DirectoryError, Result};
use crate::metadata::{HostIdentity, MetadataClient};
use crate::util::{INSTANCE_ID_PATH, PUBLIC_IPV4_PATH};

/// Outcome of a successful bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindResult {
    /// The host already held the address; nothing was changed
    pub already_bound: bool,
    /// New association id, set only when this bind attached the address
    pub association_id: Option<String>,
    pub instance_id: String,
}

impl BindResult {
    pub fn already_bound(instance_id: impl Into<String>) -> Self {
        Self {
            already_bound: true,
            association_id: None,
            instance_id: instance_id.into(),
        }
    }

    pub fn attached(association_id: Option<String>, instance_id: impl Into<String>) -> Self {
        Self {
            already_bound: false,
            association_id,
            instance_id: instance_id.into(),
        }
    }
}

/// Orchestrates one bind over injected directory and metadata capabilities
#[derive(Clone)]
pub struct Binder {
    directory: Arc<dyn AddressDirectory>,
    metadata: Arc<dyn MetadataClient>,
}

impl Binder {
    pub fn new(directory: Arc<dyn AddressDirectory>, metadata: Arc<dyn MetadataClient>) -> Self {
        Self {
            directory,
            metadata,
        }
    }

    /// Bind `target` to this host.
    ///
    /// `cancel` scopes every directory call; metadata calls are bounded by the
    /// metadata client's own timeout instead.
    #[instrument(skip(self, cancel))]
    pub async fn bind(&self, target: &str, cancel: &CancellationToken) -> Result<BindResult> {
        let address = self.lookup_target(target, cancel).await?;
        let host = self.identify_host().await?;

        // Decide: must run before any mutating call
        if host.public_ip == target {
            info!(instance_id = %host.instance_id, "EIP {} is already associated with this instance", target);
            return Ok(BindResult::already_bound(host.instance_id));
        }
        if address.allocation_id.is_empty() {
            return Err(BindError::MissingAllocation {
                public_ip: address.public_ip,
            });
        }

        let detached = self.detach_if_needed(&address, cancel).await?;
        let point = self
            .locate_host_interface(&host, detached.as_deref(), cancel)
            .await?;

        info!(
            allocation_id = %address.allocation_id,
            interface = %point.id,
            instance_id = %host.instance_id,
            "attaching EIP {}", target
        );
        let association_id = self
            .directory_call(
                BindStep::Attach,
                detached.as_deref(),
                cancel,
                self.directory.attach(&address.allocation_id, &point.id),
            )
            .await?;

        info!(
            association_id = association_id.as_deref().unwrap_or("-"),
            instance_id = %host.instance_id,
            "EIP {} attached", target
        );
        Ok(BindResult::attached(association_id, host.instance_id))
    }

    async fn lookup_target(&self, target: &str, cancel: &CancellationToken) -> Result<Address> {
        let addresses = self
            .directory_call(
                BindStep::LookupTarget,
                None,
                cancel,
                self.directory.lookup_address(target),
            )
            .await?;

        first_of(addresses, "addresses", target).ok_or_else(|| BindError::AddressNotFound {
            public_ip: target.to_string(),
        })
    }

    /// One token, then both reads with it
    async fn identify_host(&self) -> Result<HostIdentity> {
        let token = self
            .metadata
            .fetch_token()
            .await
            .map_err(|source| BindError::Metadata {
                step: "token",
                source,
            })?;

        let public_ip = self
            .metadata
            .fetch_metadata(&token, PUBLIC_IPV4_PATH)
            .await
            .map_err(|source| BindError::Metadata {
                step: "public-ipv4",
                source,
            })?;

        let instance_id = self
            .metadata
            .fetch_metadata(&token, INSTANCE_ID_PATH)
            .await
            .map_err(|source| BindError::Metadata {
                step: "instance-id",
                source,
            })?;

        let host = HostIdentity {
            public_ip: public_ip.trim().to_string(),
            instance_id: instance_id.trim().to_string(),
        };
        debug!(public_ip = %host.public_ip, instance_id = %host.instance_id, "identified host");
        Ok(host)
    }

    /// Returns the association that was removed, if any
    async fn detach_if_needed(
        &self,
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let Some(association_id) = address.association_id.as_deref().filter(|id| !id.is_empty())
        else {
            debug!("address is not attached, skipping detach");
            return Ok(None);
        };

        info!("detaching EIP from previous association {}", association_id);
        self.directory_call(
            BindStep::DetachIfNeeded,
            None,
            cancel,
            self.directory.detach(association_id),
        )
        .await?;
        Ok(Some(association_id.to_string()))
    }

    async fn locate_host_interface(
        &self,
        host: &HostIdentity,
        detached: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AttachmentPoint> {
        let points = self
            .directory_call(
                BindStep::LocateHostInterface,
                detached,
                cancel,
                self.directory.find_attachment_points(&host.public_ip),
            )
            .await?;

        first_of(points, "network interfaces", &host.public_ip).ok_or_else(|| {
            BindError::AttachmentPointNotFound {
                public_ip: host.public_ip.clone(),
                detached: detached.map(String::from),
            }
        })
    }

    /// Run one directory call inside the cancellation scope
    async fn directory_call<T, F>(
        &self,
        step: BindStep,
        detached: Option<&str>,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, DirectoryError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BindError::Cancelled {
                step,
                detached: detached.map(String::from),
            }),
            result = call => result.map_err(|source| BindError::Directory {
                step,
                source,
                detached: detached.map(String::from),
            }),
        }
    }
}

/// First element of a lookup expected to be singular.
///
/// Duplicates are not treated as an error; the first entry wins.
fn first_of<T>(items: Vec<T>, what: &str, key: &str) -> Option<T> {
    if items.len() > 1 {
        warn!(count = items.len(), "multiple {} match {}, using the first", what, key);
    }
    items.into_iter().next()
}
