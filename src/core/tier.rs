//! Capability tiers: which permissions a host version demands and how files are referenced.
//!
//! The platform is probed once; the dispatcher only ever consults the policy table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A permission the dispatcher may need from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Coarse runtime grant for reading shared storage on older versions.
    ReadExternalStorage,
    /// Broad "manage all files" capability. Granted only from a settings screen.
    ManageAllFiles,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::ReadExternalStorage => write!(f, "read external storage"),
            PermissionKind::ManageAllFiles => write!(f, "manage external storage"),
        }
    }
}

/// How the launched app receives the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStyle {
    /// Plain `file://` URI. The receiving app reads the path directly.
    FileUri,
    /// Provider-backed `content://` URI with a temporary read grant.
    ProviderUri,
}

/// The host capability tier, selected once from a platform probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    Legacy,
    ProviderUris,
    AllFilesAccess,
    ScopedStorage,
    Desktop,
}

/// What a tier requires before a launch, and how it references the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Must already be held. The dispatcher never prompts for it.
    pub broad_access: Option<PermissionKind>,
    /// Prompted for when missing.
    pub runtime_permission: Option<PermissionKind>,
    pub reference: ReferenceStyle,
}

const FIRST_PROVIDER_LEVEL: u32 = 24;
const FIRST_ALL_FILES_LEVEL: u32 = 30;
const FIRST_SCOPED_LEVEL: u32 = 33;

impl CapabilityTier {
    /// Maps a mobile API level onto its tier.
    pub fn from_api_level(level: u32) -> Self {
        match level {
            l if l >= FIRST_SCOPED_LEVEL => CapabilityTier::ScopedStorage,
            l if l >= FIRST_ALL_FILES_LEVEL => CapabilityTier::AllFilesAccess,
            l if l >= FIRST_PROVIDER_LEVEL => CapabilityTier::ProviderUris,
            _ => CapabilityTier::Legacy,
        }
    }

    pub const fn policy(self) -> TierPolicy {
        use PermissionKind::*;
        match self {
            CapabilityTier::Legacy => TierPolicy {
                broad_access: None,
                runtime_permission: Some(ReadExternalStorage),
                reference: ReferenceStyle::FileUri,
            },
            CapabilityTier::ProviderUris => TierPolicy {
                broad_access: None,
                runtime_permission: Some(ReadExternalStorage),
                reference: ReferenceStyle::ProviderUri,
            },
            CapabilityTier::AllFilesAccess => TierPolicy {
                broad_access: Some(ManageAllFiles),
                runtime_permission: Some(ReadExternalStorage),
                reference: ReferenceStyle::ProviderUri,
            },
            CapabilityTier::ScopedStorage => TierPolicy {
                broad_access: Some(ManageAllFiles),
                runtime_permission: None,
                reference: ReferenceStyle::ProviderUri,
            },
            CapabilityTier::Desktop => TierPolicy {
                broad_access: None,
                runtime_permission: None,
                reference: ReferenceStyle::FileUri,
            },
        }
    }
}
