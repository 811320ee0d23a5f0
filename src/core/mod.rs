pub mod dispatcher;
pub mod error;
pub mod mime;
pub mod reference;
pub mod tier;

use std::fmt;

/// A request to open one file. Immutable once accepted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenRequest {
    path: Option<String>,
    explicit_type: Option<String>,
}

impl OpenRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            explicit_type: None,
        }
    }

    /// A request whose caller supplied no path at all.
    pub fn without_path() -> Self {
        Self::default()
    }

    /// Builds a request from raw, possibly missing, method-call arguments.
    pub fn from_parts(path: Option<String>, explicit_type: Option<String>) -> Self {
        Self {
            path,
            explicit_type: explicit_type.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn with_type(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.explicit_type = (!mime.trim().is_empty()).then_some(mime);
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn explicit_type(&self) -> Option<&str> {
        self.explicit_type.as_deref()
    }
}

/// Correlates a suspended request with the host callback that resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// What the dispatcher last learned about the permission it needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
    PendingRequest,
}

/// A launch the host accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub content: ContentRef,
    pub mime: String,
}

/// The terminal result of one request, delivered exactly once.
pub type DispatchOutcome = Result<Launched, OpenError>;

pub use dispatcher::{
    Dispatch, DispatchState, DispatcherOptions, FileOpenDispatcher, HostPrompt, Suspension,
};
pub use error::{LaunchError, OpenError, ReferenceError};
pub use mime::{resolve_type, resolve_type_with, WILDCARD_MIME};
pub use reference::{ContentRef, FileProvider, ProviderRoot};
pub use tier::{CapabilityTier, PermissionKind, ReferenceStyle, TierPolicy};
