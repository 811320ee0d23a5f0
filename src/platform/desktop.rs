//! Desktop host: no runtime permissions, launches through the system opener.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use super::Platform;
use crate::core::{CapabilityTier, ContentRef, LaunchError, PermissionKind, RequestToken};

/// Runs the dispatcher on Linux, macOS and Windows via the `open` crate.
#[derive(Debug, Default, Clone)]
pub struct DesktopPlatform {
    /// MIME type -> application used instead of the system default.
    handler_overrides: HashMap<String, String>,
}

impl DesktopPlatform {
    pub fn new(handler_overrides: HashMap<String, String>) -> Self {
        Self { handler_overrides }
    }

    /// The application configured for `mime`, if any.
    pub fn handler_for(&self, mime: &str) -> Option<&str> {
        self.handler_overrides.get(mime).map(String::as_str)
    }
}

impl Platform for DesktopPlatform {
    fn capability_tier(&self) -> CapabilityTier {
        CapabilityTier::Desktop
    }

    fn check_permission(&self, _kind: PermissionKind) -> bool {
        true
    }

    fn request_permission(&self, kind: PermissionKind, token: RequestToken) {
        // Unreachable on this tier; the dispatcher never asks.
        tracing::warn!("Desktop host has no permission prompt for {} ({})", kind, token);
    }

    fn open_permission_settings(&self, kind: PermissionKind, token: RequestToken) {
        tracing::warn!("Desktop host has no settings screen for {} ({})", kind, token);
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn launch(&self, content: &ContentRef, mime: &str) -> Result<(), LaunchError> {
        let result = match self.handler_for(mime) {
            Some(app) => {
                tracing::debug!("Opening {} with configured handler {}", content.as_str(), app);
                open::with(&content.path, app)
            }
            None => {
                tracing::debug!("Opening {} with the system default", content.as_str());
                open::that(&content.path)
            }
        };

        result.map_err(|e| {
            tracing::warn!("System opener failed for {}: {}", content.path.display(), e);
            launch_error(e, mime)
        })
    }
}

// A missing opener binary or configured handler means nothing could be
// started at all. Anything else is reported by the opener about the file.
fn launch_error(err: io::Error, mime: &str) -> LaunchError {
    match err.kind() {
        io::ErrorKind::NotFound => LaunchError::Rejected(err.to_string()),
        _ => LaunchError::NoHandler {
            mime: mime.to_string(),
        },
    }
}
