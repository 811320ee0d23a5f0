//! The permission-gated, tier-aware file-open state machine.
//!
//! ```text
//! Idle -> PermissionChecking -> [PermissionPending -> PermissionChecking] -> Launching -> Idle
//!                 |                       |
//!                 +--> PermissionDenied <-+
//! ```
//!
//! `PermissionChecking` and `Launching` happen inside a single call. Only the two
//! pending states survive between calls, and each is keyed by the request's
//! [`RequestToken`] so a late callback for an abandoned request is ignored.
//!
//! The dispatcher never shows a prompt itself. A suspended request hands back a
//! [`Suspension`] and the caller shows it with [`Suspension::show`] once it no
//! longer holds anything the host's answer needs.

use std::path::Path;
use std::sync::Arc;

use super::error::{LaunchError, OpenError};
use super::mime::resolve_type_with;
use super::reference::FileProvider;
use super::tier::{CapabilityTier, PermissionKind, TierPolicy};
use super::{DispatchOutcome, Launched, OpenRequest, PermissionState, RequestToken};
use crate::platform::Platform;

/// Result of driving the state machine one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The request reached a terminal outcome and the dispatcher is idle again.
    Completed(DispatchOutcome),
    /// The request waits for the host to answer this prompt.
    Suspended(Suspension),
}

impl Dispatch {
    pub fn outcome(self) -> Option<DispatchOutcome> {
        match self {
            Dispatch::Completed(outcome) => Some(outcome),
            Dispatch::Suspended(_) => None,
        }
    }
}

/// What the host must show before a suspended request can resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPrompt {
    /// The runtime permission dialog, answered via `on_permission_result`.
    Permission(PermissionKind),
    /// The settings screen for a broad permission, answered via `on_activity_result`.
    Settings(PermissionKind),
}

/// A suspended request and the prompt it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suspension {
    pub token: RequestToken,
    pub prompt: HostPrompt,
}

impl Suspension {
    /// Asks the host to show the prompt.
    ///
    /// The host may answer before this returns, so callers must not hold the
    /// lock its callbacks take.
    pub fn show<P: Platform + ?Sized>(&self, platform: &P) {
        tracing::debug!("Showing {:?} for {}", self.prompt, self.token);
        match self.prompt {
            HostPrompt::Permission(kind) => platform.request_permission(kind, self.token),
            HostPrompt::Settings(kind) => platform.open_permission_settings(kind, self.token),
        }
    }
}

/// The externally visible state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    PermissionPending(RequestToken),
    SettingsPending(RequestToken),
}

/// Behaviour switches, usually taken from the bridge config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Send the user to the settings screen when broad access is missing
    /// instead of failing immediately.
    pub redirect_to_settings: bool,
    /// Consult the `mime_guess` database for extensions outside the fixed table.
    pub extended_mime_lookup: bool,
}

#[derive(Debug)]
struct ActiveRequest {
    token: RequestToken,
    request: OpenRequest,
    mime: String,
}

#[derive(Debug)]
enum Phase {
    Idle,
    AwaitingPermission {
        active: ActiveRequest,
        kind: PermissionKind,
    },
    AwaitingSettings {
        active: ActiveRequest,
        kind: PermissionKind,
    },
}

/// Opens files with the host's registered applications, one request at a time.
pub struct FileOpenDispatcher<P: Platform> {
    platform: Arc<P>,
    tier: CapabilityTier,
    provider: FileProvider,
    options: DispatcherOptions,
    phase: Phase,
    permission_state: PermissionState,
    next_token: u64,
}

impl<P: Platform> FileOpenDispatcher<P> {
    /// Creates a dispatcher, probing the platform for its tier once.
    pub fn new(platform: P, provider: FileProvider) -> Self {
        let tier = platform.capability_tier();
        tracing::debug!("Dispatcher created for tier {:?}", tier);
        Self {
            platform: Arc::new(platform),
            tier,
            provider,
            options: DispatcherOptions::default(),
            phase: Phase::Idle,
            permission_state: PermissionState::Unknown,
            next_token: 1,
        }
    }

    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// A handle to the platform that outlives a lock on the dispatcher.
    pub fn shared_platform(&self) -> Arc<P> {
        Arc::clone(&self.platform)
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permission_state
    }

    pub fn state(&self) -> DispatchState {
        match &self.phase {
            Phase::Idle => DispatchState::Idle,
            Phase::AwaitingPermission { active, .. } => {
                DispatchState::PermissionPending(active.token)
            }
            Phase::AwaitingSettings { active, .. } => DispatchState::SettingsPending(active.token),
        }
    }

    /// The token of the unresolved request, if there is one.
    pub fn in_flight(&self) -> Option<RequestToken> {
        match self.state() {
            DispatchState::Idle => None,
            DispatchState::PermissionPending(token) | DispatchState::SettingsPending(token) => {
                Some(token)
            }
        }
    }

    /// Accepts a request and drives it as far as possible without the host.
    ///
    /// Returns `Err(OpenError::RequestInFlight)` without touching the current
    /// request if one is still unresolved. Every other failure is a completed
    /// outcome of the new request.
    pub fn open(&mut self, request: OpenRequest) -> Result<Dispatch, OpenError> {
        if let Some(current) = self.in_flight() {
            tracing::warn!(
                "Rejecting open request for {:?}: {} is still in flight",
                request.path(),
                current
            );
            return Err(OpenError::RequestInFlight);
        }

        let token = RequestToken::new(self.next_token);
        self.next_token += 1;

        let mime = resolve_type_with(
            request.path(),
            request.explicit_type(),
            self.options.extended_mime_lookup,
        );
        tracing::info!(
            "Accepted {} for {:?} as {}",
            token,
            request.path(),
            mime
        );

        if !has_path(&request) {
            return Ok(Dispatch::Completed(self.finish(token, Err(OpenError::InvalidPath))));
        }

        let active = ActiveRequest {
            token,
            request,
            mime,
        };
        Ok(self.check_broad_access(active))
    }

    /// Resumes a request suspended on a permission prompt.
    ///
    /// `grants` holds one entry per requested permission. An empty list means
    /// the prompt was interrupted and counts as a denial. Returns `None` for a
    /// token that is not waiting on a prompt.
    pub fn on_permission_result(
        &mut self,
        token: RequestToken,
        grants: &[bool],
    ) -> Option<Dispatch> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AwaitingPermission { active, kind } if active.token == token => {
                let granted = !grants.is_empty() && grants.iter().all(|g| *g);
                tracing::debug!("Permission result for {}: granted={}", token, granted);
                if granted {
                    self.permission_state = PermissionState::Granted;
                    Some(Dispatch::Completed(self.launch(active)))
                } else {
                    self.permission_state = PermissionState::Denied;
                    Some(Dispatch::Completed(
                        self.finish(token, Err(OpenError::PermissionDenied(kind))),
                    ))
                }
            }
            other => {
                self.phase = other;
                tracing::warn!("Ignoring stale permission result for {}", token);
                None
            }
        }
    }

    /// Resumes a request that sent the user to a permission settings screen.
    ///
    /// Re-checks the broad permission and, if it is now held, continues with the
    /// rest of the gate. This can suspend again on a runtime prompt.
    pub fn on_activity_result(&mut self, token: RequestToken) -> Option<Dispatch> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AwaitingSettings { active, kind } if active.token == token => {
                if self.platform.check_permission(kind) {
                    tracing::debug!("{} granted from settings for {}", kind, token);
                    Some(self.check_runtime_permission(active))
                } else {
                    self.permission_state = PermissionState::Denied;
                    Some(Dispatch::Completed(
                        self.finish(token, Err(OpenError::PermissionDenied(kind))),
                    ))
                }
            }
            other => {
                self.phase = other;
                tracing::warn!("Ignoring stale activity result for {}", token);
                None
            }
        }
    }

    /// Discards the in-flight request. Its later callbacks become stale.
    pub fn cancel(&mut self) -> Option<RequestToken> {
        let token = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return None,
            Phase::AwaitingPermission { active, .. } | Phase::AwaitingSettings { active, .. } => {
                active.token
            }
        };
        if self.permission_state == PermissionState::PendingRequest {
            self.permission_state = PermissionState::Unknown;
        }
        tracing::info!("Cancelled {}", token);
        Some(token)
    }

    fn policy(&self) -> TierPolicy {
        self.tier.policy()
    }

    fn check_broad_access(&mut self, active: ActiveRequest) -> Dispatch {
        let Some(kind) = self.policy().broad_access else {
            return self.check_runtime_permission(active);
        };

        if self.platform.check_permission(kind) {
            return self.check_runtime_permission(active);
        }

        if self.options.redirect_to_settings {
            let token = active.token;
            tracing::info!("{} lacks {}, opening settings", token, kind);
            self.permission_state = PermissionState::PendingRequest;
            self.phase = Phase::AwaitingSettings { active, kind };
            return Dispatch::Suspended(Suspension {
                token,
                prompt: HostPrompt::Settings(kind),
            });
        }

        self.permission_state = PermissionState::Denied;
        Dispatch::Completed(self.finish(active.token, Err(OpenError::PermissionDenied(kind))))
    }

    fn check_runtime_permission(&mut self, active: ActiveRequest) -> Dispatch {
        match self.policy().runtime_permission {
            Some(kind) if !self.platform.check_permission(kind) => {
                let token = active.token;
                tracing::info!("{} needs {}, prompting", token, kind);
                self.permission_state = PermissionState::PendingRequest;
                self.phase = Phase::AwaitingPermission { active, kind };
                Dispatch::Suspended(Suspension {
                    token,
                    prompt: HostPrompt::Permission(kind),
                })
            }
            _ => {
                self.permission_state = PermissionState::Granted;
                Dispatch::Completed(self.launch(active))
            }
        }
    }

    fn launch(&mut self, active: ActiveRequest) -> DispatchOutcome {
        let ActiveRequest {
            token,
            request,
            mime,
        } = active;

        let Some(path) = request.path().filter(|p| !p.trim().is_empty()) else {
            return self.finish(token, Err(OpenError::InvalidPath));
        };
        let path = Path::new(path);

        if !self.platform.file_exists(path) {
            return self.finish(token, Err(OpenError::FileNotFound(path.to_path_buf())));
        }

        let content = match self.provider.reference_for(path, self.policy().reference) {
            Ok(content) => content,
            Err(e) => return self.finish(token, Err(e.into())),
        };

        tracing::debug!("Launching {} as {} for {}", content.as_str(), mime, token);
        let outcome = match self.platform.launch(&content, &mime) {
            Ok(()) => Ok(Launched { content, mime }),
            Err(LaunchError::NoHandler { mime }) => Err(OpenError::NoHandlerApp { mime }),
            Err(LaunchError::Rejected(reason)) => Err(OpenError::LaunchFailed(reason)),
        };
        self.finish(token, outcome)
    }

    fn finish(&mut self, token: RequestToken, outcome: DispatchOutcome) -> DispatchOutcome {
        self.phase = Phase::Idle;
        match &outcome {
            Ok(launched) => tracing::info!("{} opened {}", token, launched.content.as_str()),
            Err(e) => tracing::warn!("{} failed with {}: {}", token, e.code(), e),
        }
        outcome
    }
}

fn has_path(request: &OpenRequest) -> bool {
    request.path().is_some_and(|p| !p.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContentRef, ProviderRoot, ReferenceStyle};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// A host whose answers are scripted up front and whose calls are recorded.
    struct ScriptedPlatform {
        tier: CapabilityTier,
        granted: Mutex<HashSet<PermissionKind>>,
        files: Mutex<HashSet<PathBuf>>,
        handled_types: Mutex<Option<HashSet<String>>>,
        checks: Mutex<Vec<PermissionKind>>,
        prompts: Mutex<Vec<(PermissionKind, RequestToken)>>,
        settings: Mutex<Vec<(PermissionKind, RequestToken)>>,
        launches: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedPlatform {
        fn new(tier: CapabilityTier) -> Self {
            Self {
                tier,
                granted: Mutex::new(HashSet::new()),
                files: Mutex::new(HashSet::new()),
                handled_types: Mutex::new(None),
                checks: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
                settings: Mutex::new(Vec::new()),
                launches: Mutex::new(Vec::new()),
            }
        }

        fn grant(self, kind: PermissionKind) -> Self {
            self.granted.lock().unwrap().insert(kind);
            self
        }

        fn with_file(self, path: &str) -> Self {
            self.files.lock().unwrap().insert(PathBuf::from(path));
            self
        }

        /// Only these MIME types have a handler; everything else fails to launch.
        fn handling(self, types: &[&str]) -> Self {
            *self.handled_types.lock().unwrap() =
                Some(types.iter().map(|t| t.to_string()).collect());
            self
        }

        fn launches(&self) -> Vec<(String, String)> {
            self.launches.lock().unwrap().clone()
        }

        fn prompts(&self) -> Vec<(PermissionKind, RequestToken)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl Platform for ScriptedPlatform {
        fn capability_tier(&self) -> CapabilityTier {
            self.tier
        }
        fn check_permission(&self, kind: PermissionKind) -> bool {
            self.checks.lock().unwrap().push(kind);
            self.granted.lock().unwrap().contains(&kind)
        }
        fn request_permission(&self, kind: PermissionKind, token: RequestToken) {
            self.prompts.lock().unwrap().push((kind, token));
        }
        fn open_permission_settings(&self, kind: PermissionKind, token: RequestToken) {
            self.settings.lock().unwrap().push((kind, token));
        }
        fn file_exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains(path)
        }
        fn launch(&self, content: &ContentRef, mime: &str) -> Result<(), LaunchError> {
            if let Some(types) = self.handled_types.lock().unwrap().as_ref() {
                if !types.contains(mime) {
                    return Err(LaunchError::NoHandler {
                        mime: mime.to_string(),
                    });
                }
            }
            self.launches
                .lock()
                .unwrap()
                .push((content.as_str().to_string(), mime.to_string()));
            Ok(())
        }
    }

    fn provider() -> FileProvider {
        FileProvider::new(
            "com.example.fileProvider",
            vec![ProviderRoot {
                name: "root".into(),
                path: "/".into(),
            }],
        )
    }

    fn dispatcher(platform: ScriptedPlatform) -> FileOpenDispatcher<ScriptedPlatform> {
        FileOpenDispatcher::new(platform, provider())
    }

    fn completed(dispatch: Dispatch) -> DispatchOutcome {
        dispatch.outcome().expect("request should have completed")
    }

    /// Shows the prompt the way a host would and returns the token to answer with.
    fn shown(
        dispatcher: &FileOpenDispatcher<ScriptedPlatform>,
        dispatch: Dispatch,
    ) -> RequestToken {
        match dispatch {
            Dispatch::Suspended(suspension) => {
                suspension.show(dispatcher.platform());
                suspension.token
            }
            other => panic!("expected a suspended request, got {other:?}"),
        }
    }

    #[test]
    fn test_png_on_exempt_tier_succeeds() {
        let platform = ScriptedPlatform::new(CapabilityTier::ScopedStorage)
            .grant(PermissionKind::ManageAllFiles)
            .with_file("/tmp/a.png");
        let mut dispatcher = dispatcher(platform);

        let launched = completed(dispatcher.open(OpenRequest::new("/tmp/a.png")).unwrap()).unwrap();

        assert_eq!(launched.mime, "image/png");
        assert_eq!(launched.content.style, ReferenceStyle::ProviderUri);
        assert_eq!(
            dispatcher.platform().launches(),
            vec![(
                "content://com.example.fileProvider/root/tmp/a.png".to_string(),
                "image/png".to_string()
            )]
        );
        assert!(dispatcher.platform().prompts().is_empty());
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn test_legacy_tier_uses_file_uri() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy)
            .grant(PermissionKind::ReadExternalStorage)
            .with_file("/sdcard/song.mp3");
        let mut dispatcher = dispatcher(platform);

        let launched =
            completed(dispatcher.open(OpenRequest::new("/sdcard/song.mp3")).unwrap()).unwrap();

        assert_eq!(launched.content.style, ReferenceStyle::FileUri);
        assert_eq!(launched.content.as_str(), "file:///sdcard/song.mp3");
        assert_eq!(launched.mime, "audio/mpeg");
    }

    #[test]
    fn test_missing_file_after_permissions_pass() {
        let platform = ScriptedPlatform::new(CapabilityTier::ProviderUris)
            .grant(PermissionKind::ReadExternalStorage);
        let mut dispatcher = dispatcher(platform);

        let err = completed(dispatcher.open(OpenRequest::new("/tmp/missing.pdf")).unwrap())
            .unwrap_err();

        assert_eq!(err, OpenError::FileNotFound("/tmp/missing.pdf".into()));
        assert_eq!(
            *dispatcher.platform().checks.lock().unwrap(),
            vec![PermissionKind::ReadExternalStorage]
        );
        assert!(dispatcher.platform().launches().is_empty());
    }

    #[test]
    fn test_null_path_fails_before_any_permission_check() {
        let mut dispatcher = dispatcher(ScriptedPlatform::new(CapabilityTier::Legacy));

        let err = completed(dispatcher.open(OpenRequest::without_path()).unwrap()).unwrap_err();
        assert_eq!(err, OpenError::InvalidPath);

        let err = completed(dispatcher.open(OpenRequest::new("  ")).unwrap()).unwrap_err();
        assert_eq!(err, OpenError::InvalidPath);

        assert!(dispatcher.platform().checks.lock().unwrap().is_empty());
        assert!(dispatcher.platform().prompts().is_empty());
    }

    #[test]
    fn test_denied_prompt_never_launches() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);
        assert_eq!(dispatcher.state(), DispatchState::PermissionPending(token));
        assert_eq!(dispatcher.permission_state(), PermissionState::PendingRequest);
        assert_eq!(
            dispatcher.platform().prompts(),
            vec![(PermissionKind::ReadExternalStorage, token)]
        );

        let outcome = completed(dispatcher.on_permission_result(token, &[false]).unwrap());

        assert_eq!(
            outcome.unwrap_err(),
            OpenError::PermissionDenied(PermissionKind::ReadExternalStorage)
        );
        assert_eq!(dispatcher.permission_state(), PermissionState::Denied);
        assert!(dispatcher.platform().launches().is_empty());
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn test_granted_prompt_launches_exactly_once() {
        let platform =
            ScriptedPlatform::new(CapabilityTier::ProviderUris).with_file("/sdcard/v.mp4");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/v.mp4")).unwrap();
        let token = shown(&dispatcher, dispatch);

        let launched = completed(dispatcher.on_permission_result(token, &[true]).unwrap()).unwrap();
        assert_eq!(launched.mime, "video/mp4");
        assert_eq!(dispatcher.permission_state(), PermissionState::Granted);

        // A duplicate callback must not produce a second outcome.
        assert!(dispatcher.on_permission_result(token, &[true]).is_none());
        assert_eq!(dispatcher.platform().launches().len(), 1);
    }

    #[test]
    fn test_interrupted_prompt_counts_as_denial() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.png");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.png")).unwrap();
        let token = shown(&dispatcher, dispatch);

        let outcome = completed(dispatcher.on_permission_result(token, &[]).unwrap());
        assert!(matches!(outcome, Err(OpenError::PermissionDenied(_))));
    }

    #[test]
    fn test_missing_broad_access_fails_without_prompt() {
        let platform = ScriptedPlatform::new(CapabilityTier::AllFilesAccess)
            .grant(PermissionKind::ReadExternalStorage)
            .with_file("/sdcard/a.png");
        let mut dispatcher = dispatcher(platform);

        let err =
            completed(dispatcher.open(OpenRequest::new("/sdcard/a.png")).unwrap()).unwrap_err();

        assert_eq!(err, OpenError::PermissionDenied(PermissionKind::ManageAllFiles));
        assert_eq!(err.to_string(), "Manage external storage permission required");
        assert!(dispatcher.platform().prompts().is_empty());
        assert!(dispatcher.platform().settings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_redirect_resumes_on_activity_result() {
        let platform =
            ScriptedPlatform::new(CapabilityTier::ScopedStorage).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform).with_options(DispatcherOptions {
            redirect_to_settings: true,
            ..Default::default()
        });

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);
        assert_eq!(dispatcher.state(), DispatchState::SettingsPending(token));
        assert_eq!(
            *dispatcher.platform().settings.lock().unwrap(),
            vec![(PermissionKind::ManageAllFiles, token)]
        );

        // A permission result is not what this request waits for.
        assert!(dispatcher.on_permission_result(token, &[true]).is_none());
        assert_eq!(dispatcher.state(), DispatchState::SettingsPending(token));

        dispatcher
            .platform()
            .granted
            .lock()
            .unwrap()
            .insert(PermissionKind::ManageAllFiles);
        let launched = completed(dispatcher.on_activity_result(token).unwrap()).unwrap();
        assert_eq!(launched.mime, "application/pdf");
    }

    #[test]
    fn test_settings_redirect_denies_when_still_not_granted() {
        let platform =
            ScriptedPlatform::new(CapabilityTier::ScopedStorage).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform).with_options(DispatcherOptions {
            redirect_to_settings: true,
            ..Default::default()
        });

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);

        let outcome = completed(dispatcher.on_activity_result(token).unwrap());
        assert_eq!(
            outcome.unwrap_err(),
            OpenError::PermissionDenied(PermissionKind::ManageAllFiles)
        );
        assert!(dispatcher.platform().launches().is_empty());
    }

    #[test]
    fn test_settings_then_runtime_prompt_keeps_token() {
        let platform =
            ScriptedPlatform::new(CapabilityTier::AllFilesAccess).with_file("/sdcard/a.jpg");
        let mut dispatcher = dispatcher(platform).with_options(DispatcherOptions {
            redirect_to_settings: true,
            ..Default::default()
        });

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.jpg")).unwrap();
        let token = shown(&dispatcher, dispatch);
        dispatcher
            .platform()
            .granted
            .lock()
            .unwrap()
            .insert(PermissionKind::ManageAllFiles);

        assert_eq!(
            dispatcher.on_activity_result(token),
            Some(Dispatch::Suspended(Suspension {
                token,
                prompt: HostPrompt::Permission(PermissionKind::ReadExternalStorage),
            }))
        );
        assert_eq!(dispatcher.state(), DispatchState::PermissionPending(token));

        let launched = completed(dispatcher.on_permission_result(token, &[true]).unwrap()).unwrap();
        assert_eq!(launched.mime, "image/jpeg");
    }

    #[test]
    fn test_no_handler_for_type() {
        let platform = ScriptedPlatform::new(CapabilityTier::Desktop)
            .with_file("/tmp/x.unknownext")
            .handling(&["image/png"]);
        let mut dispatcher = dispatcher(platform);

        let err = completed(dispatcher.open(OpenRequest::new("/tmp/x.unknownext")).unwrap())
            .unwrap_err();

        assert_eq!(
            err,
            OpenError::NoHandlerApp {
                mime: "*/*".to_string()
            }
        );
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn test_explicit_type_reaches_the_launcher() {
        let platform = ScriptedPlatform::new(CapabilityTier::Desktop).with_file("/tmp/notes");
        let mut dispatcher = dispatcher(platform);

        let request = OpenRequest::new("/tmp/notes").with_type("text/plain");
        let launched = completed(dispatcher.open(request).unwrap()).unwrap();

        assert_eq!(launched.mime, "text/plain");
    }

    #[test]
    fn test_concurrent_open_is_rejected_without_disturbing_current() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy)
            .with_file("/sdcard/a.pdf")
            .with_file("/sdcard/b.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let first = shown(&dispatcher, dispatch);

        let err = dispatcher.open(OpenRequest::new("/sdcard/b.pdf")).unwrap_err();
        assert_eq!(err, OpenError::RequestInFlight);
        assert_eq!(dispatcher.in_flight(), Some(first));

        let launched = completed(dispatcher.on_permission_result(first, &[true]).unwrap()).unwrap();
        assert!(launched.content.as_str().ends_with("/sdcard/a.pdf"));

        // Idle again, so the next request is accepted.
        assert!(dispatcher.open(OpenRequest::new("/sdcard/b.pdf")).is_ok());
    }

    #[traced_test]
    #[test]
    fn test_cancel_makes_late_callback_stale() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);

        assert_eq!(dispatcher.cancel(), Some(token));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert_eq!(dispatcher.cancel(), None);

        assert!(dispatcher.on_permission_result(token, &[true]).is_none());
        assert!(dispatcher.platform().launches().is_empty());
        assert!(logs_contain("Ignoring stale permission result"));
    }

    #[test]
    fn test_stale_token_does_not_resume_newer_request() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let old = shown(&dispatcher, dispatch);
        dispatcher.cancel();
        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let new = shown(&dispatcher, dispatch);
        assert_ne!(old, new);

        assert!(dispatcher.on_permission_result(old, &[false]).is_none());
        assert_eq!(dispatcher.state(), DispatchState::PermissionPending(new));
    }

    #[test]
    fn test_suspension_leaves_prompting_to_the_caller() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        assert!(dispatcher.platform().prompts().is_empty());
        assert_eq!(
            dispatcher.state(),
            DispatchState::PermissionPending(RequestToken::new(1))
        );

        let token = shown(&dispatcher, dispatch);
        assert_eq!(
            dispatcher.platform().prompts(),
            vec![(PermissionKind::ReadExternalStorage, token)]
        );
    }

    #[test]
    fn test_activity_result_while_idle_is_ignored() {
        let mut dispatcher = dispatcher(ScriptedPlatform::new(CapabilityTier::ScopedStorage));

        assert!(dispatcher.on_activity_result(RequestToken::new(1)).is_none());
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert!(dispatcher.platform().checks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_activity_result_does_not_resume_permission_prompt() {
        let platform = ScriptedPlatform::new(CapabilityTier::Legacy).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform);

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);

        assert!(dispatcher.on_activity_result(token).is_none());
        assert!(dispatcher.on_activity_result(RequestToken::new(999)).is_none());
        assert_eq!(dispatcher.state(), DispatchState::PermissionPending(token));
        assert_eq!(dispatcher.permission_state(), PermissionState::PendingRequest);

        // The prompt it actually waits on still completes it.
        let launched = completed(dispatcher.on_permission_result(token, &[true]).unwrap()).unwrap();
        assert_eq!(launched.mime, "application/pdf");
        assert_eq!(dispatcher.platform().launches().len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_activity_result_after_cancelled_settings_redirect_is_stale() {
        let platform =
            ScriptedPlatform::new(CapabilityTier::ScopedStorage).with_file("/sdcard/a.pdf");
        let mut dispatcher = dispatcher(platform).with_options(DispatcherOptions {
            redirect_to_settings: true,
            ..Default::default()
        });

        let dispatch = dispatcher.open(OpenRequest::new("/sdcard/a.pdf")).unwrap();
        let token = shown(&dispatcher, dispatch);
        assert_eq!(dispatcher.state(), DispatchState::SettingsPending(token));
        assert_eq!(dispatcher.cancel(), Some(token));

        // The user granted access on the screen, but the request is gone.
        dispatcher
            .platform()
            .granted
            .lock()
            .unwrap()
            .insert(PermissionKind::ManageAllFiles);
        assert!(dispatcher.on_activity_result(token).is_none());

        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert!(dispatcher.platform().launches().is_empty());
        assert!(logs_contain("Ignoring stale activity result"));
    }

    #[test]
    fn test_file_outside_provider_roots_is_not_shareable() {
        let platform = ScriptedPlatform::new(CapabilityTier::ProviderUris)
            .grant(PermissionKind::ReadExternalStorage)
            .with_file("/data/private/a.png");
        let narrow = FileProvider::new(
            "com.example.fileProvider",
            vec![ProviderRoot {
                name: "external".into(),
                path: "/sdcard".into(),
            }],
        );
        let mut dispatcher = FileOpenDispatcher::new(platform, narrow);

        let err = completed(dispatcher.open(OpenRequest::new("/data/private/a.png")).unwrap())
            .unwrap_err();
        assert_eq!(err, OpenError::NotShareable("/data/private/a.png".into()));
        assert_eq!(err.code(), "FILE_NOT_SHAREABLE");
    }
}
