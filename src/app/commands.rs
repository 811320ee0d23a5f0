// src/app/commands.rs
//! Contains the handlers the host calls on the `open_file` channel.
//!
//! `handle_method_call` answers new calls. The remaining handlers are the host's
//! way of delivering permission and activity results, or abandoning a call.
//! Every accepted call receives exactly one `MethodReply` through its sink.

use std::sync::{Arc, Mutex};

use super::events::{MethodCall, MethodReply, OpenFileArgs, OPEN_FILE_METHOD};
use super::helpers::with_bridge;
use super::sink::ReplySink;
use super::state::{BridgeState, PendingReply};
use crate::core::{Dispatch, OpenError, OpenRequest, RequestToken, Suspension};
use crate::platform::Platform;

/// Handles one call from the host.
///
/// Unknown methods get `NotImplemented`. A call arriving while another is
/// suspended gets `REQUEST_IN_FLIGHT`; the suspended call keeps its sink.
pub fn handle_method_call<P: Platform, S: ReplySink>(
    call: MethodCall,
    sink: S,
    state: Arc<Mutex<BridgeState<P>>>,
) {
    if call.method != OPEN_FILE_METHOD {
        tracing::debug!("Method {:?} is not implemented", call.method);
        sink.send_reply(MethodReply::NotImplemented);
        return;
    }

    let args = serde_json::from_value::<OpenFileArgs>(call.arguments).unwrap_or_else(|e| {
        tracing::warn!("Malformed open_file arguments: {}", e);
        OpenFileArgs::default()
    });
    let request = OpenRequest::from(args);

    let prompt = with_bridge(&state, |s| match s.dispatcher.open(request) {
        Ok(Dispatch::Completed(outcome)) => {
            sink.send_reply(MethodReply::from_outcome(&outcome));
            None
        }
        Ok(Dispatch::Suspended(suspension)) => {
            s.pending = Some(PendingReply {
                token: suspension.token,
                sink: Box::new(sink),
            });
            Some((suspension, s.dispatcher.shared_platform()))
        }
        Err(rejection) => {
            sink.send_reply(MethodReply::error(&rejection));
            None
        }
    });
    show_unlocked(prompt);
}

/// Delivers the OS answer to a permission prompt.
pub fn on_permission_result<P: Platform>(
    token: RequestToken,
    grants: &[bool],
    state: Arc<Mutex<BridgeState<P>>>,
) {
    let prompt = with_bridge(&state, |s| {
        let dispatch = s.dispatcher.on_permission_result(token, grants)?;
        let suspension = s.settle(dispatch)?;
        Some((suspension, s.dispatcher.shared_platform()))
    });
    show_unlocked(prompt);
}

/// Delivers the return from a settings screen opened for a request.
pub fn on_activity_result<P: Platform>(token: RequestToken, state: Arc<Mutex<BridgeState<P>>>) {
    let prompt = with_bridge(&state, |s| {
        let dispatch = s.dispatcher.on_activity_result(token)?;
        let suspension = s.settle(dispatch)?;
        Some((suspension, s.dispatcher.shared_platform()))
    });
    show_unlocked(prompt);
}

// Hosts may answer a prompt from inside the call that shows it, which re-enters
// the handlers above, so the bridge lock must already be released here.
fn show_unlocked<P: Platform>(prompt: Option<(Suspension, Arc<P>)>) {
    if let Some((suspension, platform)) = prompt {
        suspension.show(platform.as_ref());
    }
}

/// Abandons the suspended call, answering it with `CANCELLED`.
///
/// Returns the cancelled token, or `None` when nothing was in flight.
pub fn cancel_pending<P: Platform>(state: Arc<Mutex<BridgeState<P>>>) -> Option<RequestToken> {
    with_bridge(&state, |s| {
        let token = s.dispatcher.cancel()?;
        match s.pending.take() {
            Some(pending) if pending.token == token => {
                pending.sink.send_reply(MethodReply::error(&OpenError::Cancelled));
            }
            Some(pending) => {
                tracing::warn!(
                    "Pending reply for {} did not match cancelled {}",
                    pending.token,
                    token
                );
            }
            None => {}
        }
        Some(token)
    })
}
