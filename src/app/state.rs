//! Defines the shared state behind the method channel.

use super::events::MethodReply;
use super::sink::ReplySink;
use crate::core::{Dispatch, FileOpenDispatcher, RequestToken, Suspension};
use crate::platform::Platform;

/// A reply owed to a call whose request is suspended.
pub struct PendingReply {
    pub token: RequestToken,
    pub sink: Box<dyn ReplySink>,
}

/// Holds the dispatcher and the reply owed to its in-flight call.
///
/// Wrapped in an `Arc<Mutex<...>>` so host callbacks arriving on other threads
/// can resume the dispatcher.
pub struct BridgeState<P: Platform> {
    pub dispatcher: FileOpenDispatcher<P>,
    pub pending: Option<PendingReply>,
}

impl<P: Platform> BridgeState<P> {
    pub fn new(dispatcher: FileOpenDispatcher<P>) -> Self {
        Self {
            dispatcher,
            pending: None,
        }
    }

    /// Applies the result of a resumed request to the owed reply.
    ///
    /// A completed request answers and clears the pending reply. A request that
    /// suspended again keeps it, and the returned prompt must be shown once the
    /// lock on this state is released.
    pub fn settle(&mut self, dispatch: Dispatch) -> Option<Suspension> {
        let outcome = match dispatch {
            Dispatch::Completed(outcome) => outcome,
            Dispatch::Suspended(suspension) => {
                tracing::debug!("{} suspended again", suspension.token);
                return Some(suspension);
            }
        };

        match self.pending.take() {
            Some(pending) => pending.sink.send_reply(MethodReply::from_outcome(&outcome)),
            None => tracing::warn!("Outcome produced with no caller waiting: {:?}", outcome),
        }
        None
    }
}
