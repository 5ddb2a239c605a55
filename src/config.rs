//! Input resolution and runtime settings
//!
//! ## Target resolution
//!
//! The target is the single positional argument. When it equals the
//! `POD_NAME` sentinel, the value of `$POD_NAME` (hyphens replaced with
//! underscores) names a second variable holding the address. This lets a
//! StatefulSet init container map each pod to its own Elastic IP:
//!
//! ```text
//! POD_NAME=web-0   web_0=54.162.153.80   eip-binder POD_NAME
//! ```
//!
//! Whatever the source, the final value must be an IPv4 address.
//!
//! ## Metadata settings priority (highest to lowest)
//!
//! 1. CLI flag (`--metadata-endpoint`)
//! 2. Environment variable (`EIP_METADATA_ENDPOINT`)
//! 3. Defaults (`http://169.254.169.254`)

use std::net::Ipv4Addr;
use std::time::Duration;

use url::Url;

use crate::error::{BindError, Result};
use crate::util::{
    DEFAULT_METADATA_ENDPOINT, METADATA_CONNECT_TIMEOUT, METADATA_ENDPOINT_ENV, METADATA_TIMEOUT,
    POD_NAME_SENTINEL, TOKEN_TTL,
};

/// Resolve the target address from the CLI argument.
///
/// `getenv` is injected (typically `|k| std::env::var(k).ok()`); empty values
/// count as unset.
pub fn resolve_target<F>(arg: Option<&str>, getenv: F) -> Result<Ipv4Addr>
where
    F: Fn(&str) -> Option<String>,
{
    let arg = arg.ok_or(BindError::MissingTarget)?;
    let lookup = |name: &str| getenv(name).filter(|v| !v.is_empty());

    let raw = if arg == POD_NAME_SENTINEL {
        let pod_name = lookup(POD_NAME_SENTINEL).ok_or_else(|| BindError::EmptyEnvVar {
            name: POD_NAME_SENTINEL.to_string(),
            via: None,
        })?;
        let key = pod_name.replace('-', "_");
        let value = lookup(&key).ok_or_else(|| BindError::EmptyEnvVar {
            name: key.clone(),
            via: Some(format!("{}={}", POD_NAME_SENTINEL, pod_name)),
        })?;
        tracing::info!(pod_name = %pod_name, env = %key, target = %value, "resolved target from pod name");
        value
    } else {
        arg.to_string()
    };

    raw.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| BindError::InvalidTarget { value: raw.clone() })
}

/// Validate a metadata endpoint and normalize it (no trailing slash)
pub fn parse_endpoint(raw: &str) -> Result<String> {
    let invalid = |reason: String| BindError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Settings for the instance metadata client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Base URL, without the `/latest` suffix
    pub endpoint: String,

    /// Requested token validity
    pub token_ttl: Duration,

    /// Per-request timeout
    pub timeout: Duration,

    pub connect_timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            token_ttl: TOKEN_TTL,
            timeout: METADATA_TIMEOUT,
            connect_timeout: METADATA_CONNECT_TIMEOUT,
        }
    }
}

impl MetadataConfig {
    /// Merge with environment variables
    ///
    /// Environment variables take precedence over defaults.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|k| std::env::var(k).ok())
    }

    /// Same as [`with_env`](Self::with_env) with an injected lookup
    pub fn with_env_from<F>(self, getenv: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match getenv(METADATA_ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            Some(endpoint) => self.with_endpoint(&endpoint),
            None => Ok(self),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = parse_endpoint(endpoint)?;
        Ok(self)
    }
}
