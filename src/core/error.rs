//! Defines the error types for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

use super::tier::PermissionKind;

/// Every way an open request can end without launching, plus the rejections
/// that never become the in-flight request.
///
/// All variants are terminal. The dispatcher never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    /// The user or policy refused a required permission.
    #[error("{}", denial_message(.0))]
    PermissionDenied(PermissionKind),

    /// The request carried a null or empty path.
    #[error("File path is null")]
    InvalidPath,

    /// The path is well formed but nothing exists there.
    #[error("File does not exist")]
    FileNotFound(PathBuf),

    /// No registered application handles the resolved MIME type.
    #[error("No app found to open this file")]
    NoHandlerApp { mime: String },

    /// The host refused the launch for a reason other than a missing handler.
    #[error("Launch was rejected: {0}")]
    LaunchFailed(String),

    /// The file lies outside every root the content provider may share.
    #[error("File is outside every shareable root: {}", .0.display())]
    NotShareable(PathBuf),

    /// A previous request has not been resolved yet.
    #[error("Another open request is still in flight")]
    RequestInFlight,

    /// The in-flight request was discarded by the caller.
    #[error("Open request was cancelled")]
    Cancelled,
}

fn denial_message(kind: &PermissionKind) -> &'static str {
    match kind {
        PermissionKind::ManageAllFiles => "Manage external storage permission required",
        PermissionKind::ReadExternalStorage => "Permission denied",
    }
}

impl OpenError {
    /// The string tag reported over the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            OpenError::PermissionDenied(_) => "PERMISSION_DENIED",
            OpenError::InvalidPath => "INVALID_PATH",
            OpenError::FileNotFound(_) => "FILE_NOT_FOUND",
            OpenError::NoHandlerApp { .. } => "APP_NOT_FOUND",
            OpenError::LaunchFailed(_) => "LAUNCH_FAILED",
            OpenError::NotShareable(_) => "FILE_NOT_SHAREABLE",
            OpenError::RequestInFlight => "REQUEST_IN_FLIGHT",
            OpenError::Cancelled => "CANCELLED",
        }
    }
}

/// Errors reported by a platform's launcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("no application is registered for {mime}")]
    NoHandler { mime: String },

    #[error("launcher rejected the request: {0}")]
    Rejected(String),
}

/// Errors while minting a content reference for a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("path is not absolute: {}", .0.display())]
    NotAbsolute(PathBuf),

    #[error("no provider root contains {}", .0.display())]
    OutsideRoots(PathBuf),

    #[error("invalid provider authority {0:?}")]
    InvalidAuthority(String),
}

impl From<ReferenceError> for OpenError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::NotAbsolute(path) | ReferenceError::OutsideRoots(path) => {
                OpenError::NotShareable(path)
            }
            ReferenceError::InvalidAuthority(authority) => {
                OpenError::LaunchFailed(format!("invalid provider authority {authority:?}"))
            }
        }
    }
}
