//! AWS EC2 implementation of the address directory
//!
//! | Operation | EC2 API |
//! |-----------|---------|
//! | `lookup_address` | `DescribeAddresses(PublicIps=[ip])` |
//! | `detach` | `DisassociateAddress(AssociationId)` |
//! | `find_attachment_points` | `DescribeNetworkInterfaces(addresses.association.public-ip=ip)` |
//! | `attach` | `AssociateAddress(AllocationId, NetworkInterfaceId)` |

use async_trait::async_trait;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{self as ec2, Filter};
use tracing::{debug, instrument};

use super::{Address, AddressDirectory, AttachmentPoint};
use crate::error::DirectoryError;
use crate::util::ASSOCIATED_PUBLIC_IP_FILTER;

/// EC2-backed directory
#[derive(Debug, Clone)]
pub struct Ec2Directory {
    client: aws_sdk_ec2::Client,
}

impl Ec2Directory {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS config chain.
    ///
    /// `region` overrides the region from the environment/profile.
    /// `AWS_ENDPOINT_URL` is honoured by the chain (LocalStack). SDK retries
    /// are disabled: each operation is exactly one remote call.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(aws_config::retry::RetryConfig::disabled());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        tracing::info!(region = ?config.region(), "AWS configuration loaded");
        Self::new(aws_sdk_ec2::Client::new(&config))
    }
}

fn api_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> DirectoryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    DirectoryError::Api {
        operation,
        code: err.code().map(String::from),
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn to_address(raw: &ec2::Address) -> Result<Address, DirectoryError> {
    let missing = |field| DirectoryError::MalformedResponse {
        operation: "DescribeAddresses",
        field,
    };

    let public_ip = raw.public_ip().ok_or_else(|| missing("PublicIp"))?;
    let allocation_id = raw
        .allocation_id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| missing("AllocationId"))?;

    Ok(Address {
        public_ip: public_ip.to_string(),
        allocation_id: allocation_id.to_string(),
        association_id: raw.association_id().map(String::from),
    })
}

fn to_attachment_point(raw: &ec2::NetworkInterface) -> Result<AttachmentPoint, DirectoryError> {
    raw.network_interface_id()
        .map(AttachmentPoint::new)
        .ok_or(DirectoryError::MalformedResponse {
            operation: "DescribeNetworkInterfaces",
            field: "NetworkInterfaceId",
        })
}

#[async_trait]
impl AddressDirectory for Ec2Directory {
    #[instrument(skip(self))]
    async fn lookup_address(&self, public_ip: &str) -> Result<Vec<Address>, DirectoryError> {
        let output = self
            .client
            .describe_addresses()
            .public_ips(public_ip)
            .send()
            .await
            .map_err(|e| api_error("DescribeAddresses", e))?;

        let addresses = output
            .addresses()
            .iter()
            .map(to_address)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = addresses.len(), "described addresses");
        Ok(addresses)
    }

    #[instrument(skip(self))]
    async fn detach(&self, association_id: &str) -> Result<(), DirectoryError> {
        self.client
            .disassociate_address()
            .association_id(association_id)
            .send()
            .await
            .map_err(|e| api_error("DisassociateAddress", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_attachment_points(
        &self,
        public_ip: &str,
    ) -> Result<Vec<AttachmentPoint>, DirectoryError> {
        let filter = Filter::builder()
            .name(ASSOCIATED_PUBLIC_IP_FILTER)
            .values(public_ip)
            .build();

        let output = self
            .client
            .describe_network_interfaces()
            .filters(filter)
            .send()
            .await
            .map_err(|e| api_error("DescribeNetworkInterfaces", e))?;

        let points = output
            .network_interfaces()
            .iter()
            .map(to_attachment_point)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = points.len(), "described network interfaces");
        Ok(points)
    }

    #[instrument(skip(self))]
    async fn attach(
        &self,
        allocation_id: &str,
        attachment_point_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let output = self
            .client
            .associate_address()
            .allocation_id(allocation_id)
            .network_interface_id(attachment_point_id)
            .send()
            .await
            .map_err(|e| api_error("AssociateAddress", e))?;

        Ok(output.association_id().map(String::from))
    }
}
