//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex};

use super::state::BridgeState;
use crate::platform::Platform;

/// Locks the `BridgeState` and runs `update_fn` on it.
///
/// A poisoned lock is recovered rather than propagated.
pub fn with_bridge<P, F, R>(state: &Arc<Mutex<BridgeState<P>>>, update_fn: F) -> R
where
    P: Platform,
    F: FnOnce(&mut BridgeState<P>) -> R,
{
    let mut state_guard = state.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Bridge state mutex was poisoned, recovering");
        poisoned.into_inner()
    });
    update_fn(&mut state_guard)
}
