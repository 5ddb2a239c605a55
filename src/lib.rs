//! eip-binder - claim an Elastic IP for the instance running this tool
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  binder     Six-state bind sequence (Binder, BindResult)     │
//! │  config     Target resolution, metadata settings             │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  directory/ Address directory trait + EC2 backend            │
//! │  metadata/  Metadata client trait + IMDSv2 backend           │
//! │  util/      Constants                                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`binder`] | Lookup, identify, decide, detach, locate, attach |
//! | [`config`] | `POD_NAME` indirection, IPv4 validation, endpoint overrides |
//! | [`directory`] | `AddressDirectory` capability, `Ec2Directory` |
//! | [`metadata`] | `MetadataClient` capability, `ImdsClient` |
//! | [`error`] | Error types with codes and fix suggestions |

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER
// ═══════════════════════════════════════════════════════════════
pub mod binder;
pub mod config;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER
// ═══════════════════════════════════════════════════════════════
pub mod directory;
pub mod metadata;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING
// ═══════════════════════════════════════════════════════════════
pub mod error;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_utils;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

pub use binder::{BindResult, Binder};
pub use config::{resolve_target, MetadataConfig};
pub use directory::{Address, AddressDirectory, AttachmentPoint, Ec2Directory};
pub use error::{BindError, BindStep, DirectoryError, FixSuggestion, MetadataError};
pub use metadata::{HostIdentity, ImdsClient, MetadataClient};
