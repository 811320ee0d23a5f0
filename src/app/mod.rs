//! The method-channel surface of the bridge.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod sink;
pub mod state;

use std::sync::{Arc, Mutex};

use events::{MethodCall, MethodReply};
use sink::ReplySink;
use state::BridgeState;

use crate::platform::Platform;

/// Error code for a raw message that is not a valid method call.
pub const MALFORMED_CALL: &str = "MALFORMED_CALL";

/// Parses a raw JSON message from the host and dispatches it.
pub fn handle_ipc_message<P: Platform, S: ReplySink>(
    message: &str,
    sink: S,
    state: Arc<Mutex<BridgeState<P>>>,
) {
    match serde_json::from_str::<MethodCall>(message) {
        Ok(call) => commands::handle_method_call(call, sink, state),
        Err(e) => {
            tracing::error!("Failed to parse IPC message: {}", e);
            sink.send_reply(MethodReply::Error {
                code: MALFORMED_CALL.to_string(),
                message: format!("Malformed method call: {e}"),
            });
        }
    }
}
