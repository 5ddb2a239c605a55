//! EIP Binder Error Types with Error Codes
//!
//! Error code ranges:
//! - EIP-000-009: Configuration / input errors
//! - EIP-010-019: Metadata service errors
//! - EIP-020-029: Not-found errors
//! - EIP-030-039: Directory (EC2 API) errors
//!
//! Every error raised after the target address was detached from its previous
//! owner carries that association id, see [`BindError::detached_association`].

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// The six states of a bind, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindStep {
    LookupTarget,
    IdentifyHost,
    Decide,
    DetachIfNeeded,
    LocateHostInterface,
    Attach,
}

impl fmt::Display for BindStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LookupTarget => "looking up the target address",
            Self::IdentifyHost => "identifying the host",
            Self::Decide => "checking the current binding",
            Self::DetachIfNeeded => "detaching",
            Self::LocateHostInterface => "locating the host interface",
            Self::Attach => "attaching",
        };
        f.write_str(s)
    }
}

/// Failure of a single metadata service call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("request for '{path}' failed: {reason}")]
    Request { path: String, reason: String },

    #[error("request for '{path}' returned status {status}")]
    Status { path: String, status: u16 },
}

/// Failure of a single address directory call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{operation} failed{}: {message}", .code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Api {
        operation: &'static str,
        /// Service error code (e.g. `UnauthorizedOperation`), when the API reported one
        code: Option<String>,
        message: String,
    },

    #[error("{operation} response is missing {field}")]
    MalformedResponse {
        operation: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum BindError {
    // ═══════════════════════════════════════════
    // CONFIG ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[EIP-001] Missing target address (usage: eip-binder <EIP>)")]
    MissingTarget,

    #[error("[EIP-002] Environment variable {name} is empty{}", .via.as_ref().map(|v| format!(" (from {})", v)).unwrap_or_default())]
    EmptyEnvVar {
        name: String,
        /// The sentinel variable and value the name was derived from
        via: Option<String>,
    },

    #[error("[EIP-003] Invalid IPv4 address: '{value}'")]
    InvalidTarget { value: String },

    #[error("[EIP-004] Invalid metadata endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("[EIP-005] Config error: {reason}")]
    Config { reason: String },

    // ═══════════════════════════════════════════
    // METADATA ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[EIP-010] Metadata {step} lookup failed: {source}")]
    Metadata {
        /// Sub-step that failed: `token`, `public-ipv4` or `instance-id`
        step: &'static str,
        source: MetadataError,
    },

    // ═══════════════════════════════════════════
    // NOT FOUND ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[EIP-020] No address found for {public_ip}")]
    AddressNotFound { public_ip: String },

    #[error("[EIP-021] No network interface found for public IP {public_ip}")]
    AttachmentPointNotFound {
        public_ip: String,
        detached: Option<String>,
    },

    #[error("[EIP-022] Address {public_ip} has no allocation id")]
    MissingAllocation { public_ip: String },

    // ═══════════════════════════════════════════
    // DIRECTORY ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[EIP-030] Directory call failed while {step}: {source}")]
    Directory {
        step: BindStep,
        source: DirectoryError,
        detached: Option<String>,
    },

    #[error("[EIP-031] Bind cancelled while {step}")]
    Cancelled {
        step: BindStep,
        detached: Option<String>,
    },
}

impl BindError {
    /// Get the error code (e.g., "EIP-020")
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingTarget => "EIP-001",
            Self::EmptyEnvVar { .. } => "EIP-002",
            Self::InvalidTarget { .. } => "EIP-003",
            Self::InvalidEndpoint { .. } => "EIP-004",
            Self::Config { .. } => "EIP-005",
            Self::Metadata { .. } => "EIP-010",
            Self::AddressNotFound { .. } => "EIP-020",
            Self::AttachmentPointNotFound { .. } => "EIP-021",
            Self::MissingAllocation { .. } => "EIP-022",
            Self::Directory { .. } => "EIP-030",
            Self::Cancelled { .. } => "EIP-031",
        }
    }

    /// Association id the target was detached from, if the bind failed after
    /// detaching. The address is then attached nowhere.
    pub fn detached_association(&self) -> Option<&str> {
        match self {
            Self::AttachmentPointNotFound { detached, .. }
            | Self::Directory { detached, .. }
            | Self::Cancelled { detached, .. } => detached.as_deref(),
            _ => None,
        }
    }

    /// Errors raised while resolving input, before any remote call
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingTarget
                | Self::EmptyEnvVar { .. }
                | Self::InvalidTarget { .. }
                | Self::InvalidEndpoint { .. }
                | Self::Config { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AddressNotFound { .. } | Self::AttachmentPointNotFound { .. }
        )
    }
}

impl FixSuggestion for BindError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindError::MissingTarget => Some("Pass the Elastic IP as the only argument"),
            BindError::EmptyEnvVar { .. } => {
                Some("Set POD_NAME and the variable derived from it (hyphens become underscores)")
            }
            BindError::InvalidTarget { .. } => Some("Use a dotted-quad IPv4 address, e.g. 54.162.153.80"),
            BindError::InvalidEndpoint { .. } => {
                Some("Use an absolute http(s) URL such as http://169.254.169.254")
            }
            BindError::Config { .. } => None,
            BindError::Metadata { .. } => {
                Some("Run on an EC2 instance with IMDSv2 reachable, or set EIP_METADATA_ENDPOINT")
            }
            BindError::AddressNotFound { .. } => {
                Some("Check the Elastic IP is allocated in this account and region")
            }
            BindError::AttachmentPointNotFound { .. } => {
                Some("Check the instance has a public IP on its primary interface, then re-run")
            }
            BindError::MissingAllocation { .. } => {
                Some("Only VPC Elastic IPs (with an allocation id) can be bound")
            }
            BindError::Directory { .. } => {
                Some("Check IAM permissions for ec2:DescribeAddresses, ec2:DisassociateAddress, ec2:DescribeNetworkInterfaces and ec2:AssociateAddress")
            }
            BindError::Cancelled { .. } => Some("Increase --timeout or check EC2 API reachability"),
        }
    }
}
