//! Defines an abstraction over delivering replies to the host.

use super::events::MethodReply;
use tokio::sync::mpsc::UnboundedSender;

/// A trait that abstracts the delivery of a call's reply.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait ReplySink: Send + Sync + 'static {
    fn send_reply(&self, reply: MethodReply);
}

/// Implement the trait for a tokio channel, used by the CLI and async hosts.
impl ReplySink for UnboundedSender<MethodReply> {
    fn send_reply(&self, reply: MethodReply) {
        // The receiver may be gone if the caller gave up; log and move on.
        if let Err(e) = self.send(reply) {
            tracing::warn!("Failed to deliver reply, receiver dropped: {:?}", e.0);
        }
    }
}
