//! Centralized constants for the metadata protocol and request limits
//!
//! All endpoint, header and timeout values in one place for easy tuning.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════
// Instance Metadata Service (IMDSv2)
// ═══════════════════════════════════════════════════════════════

/// Link-local base URL of the EC2 instance metadata service
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

/// Token endpoint, relative to `{endpoint}/latest/`
pub const TOKEN_PATH: &str = "api/token";

/// Header declaring the requested token validity on the token request
pub const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// Header carrying the token on metadata reads
pub const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Requested token validity (server enforced)
pub const TOKEN_TTL: Duration = Duration::from_secs(300);

/// Metadata path for the instance's public IPv4 address
pub const PUBLIC_IPV4_PATH: &str = "meta-data/public-ipv4";

/// Metadata path for the instance identifier
pub const INSTANCE_ID_PATH: &str = "meta-data/instance-id";

/// Env var overriding the metadata endpoint
pub const METADATA_ENDPOINT_ENV: &str = "EIP_METADATA_ENDPOINT";

// ═══════════════════════════════════════════════════════════════
// Timeouts
// ═══════════════════════════════════════════════════════════════

/// Timeout for a single metadata request
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for establishing the metadata connection
pub const METADATA_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default cancellation scope for a whole bind (CLI `--timeout`)
pub const BIND_TIMEOUT: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════════
// Target resolution
// ═══════════════════════════════════════════════════════════════

/// Argument value that switches target resolution to the pod-name indirection
pub const POD_NAME_SENTINEL: &str = "POD_NAME";

// ═══════════════════════════════════════════════════════════════
// Directory filters
// ═══════════════════════════════════════════════════════════════

/// EC2 filter matching interfaces by the public IP associated with them
pub const ASSOCIATED_PUBLIC_IP_FILTER: &str = "addresses.association.public-ip";
