//! Platform-specific integration.
//!
//! Keep OS quirks here to avoid leaking them into the dispatcher. The dispatcher
//! only ever talks to the host through the [`Platform`] trait, which also lets
//! tests script permission answers and launch results without a real device.

pub mod desktop;

use std::path::Path;

use crate::core::{CapabilityTier, ContentRef, LaunchError, PermissionKind, RequestToken};

pub use desktop::DesktopPlatform;

/// The narrow set of host services the dispatcher depends on.
pub trait Platform: Send + Sync {
    /// Probes the host once for its capability tier.
    fn capability_tier(&self) -> CapabilityTier;

    /// Returns `true` if `kind` is currently granted.
    fn check_permission(&self, kind: PermissionKind) -> bool;

    /// Shows the OS permission prompt for `kind`.
    ///
    /// The answer is delivered through
    /// [`FileOpenDispatcher::on_permission_result`](crate::core::FileOpenDispatcher::on_permission_result)
    /// with the same `token`, possibly before this call returns.
    fn request_permission(&self, kind: PermissionKind, token: RequestToken);

    /// Sends the user to the settings screen that grants `kind`.
    ///
    /// Returning from that screen is reported through
    /// [`FileOpenDispatcher::on_activity_result`](crate::core::FileOpenDispatcher::on_activity_result).
    fn open_permission_settings(&self, kind: PermissionKind, token: RequestToken);

    fn file_exists(&self, path: &Path) -> bool;

    /// Asks the host to view `content` as `mime` with a read grant.
    ///
    /// Returns once the host accepted or refused the request. It never waits
    /// for the launched application.
    fn launch(&self, content: &ContentRef, mime: &str) -> Result<(), LaunchError>;
}
