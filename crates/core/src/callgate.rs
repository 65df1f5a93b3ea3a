//! Call gate - per-call admission decision.
//!
//! Runs on the call-screening collaborator's own thread under a real-time
//! deadline, so the read path is a mode snapshot from an atomic cell, an
//! atomic profile flag, and a lock-free cache snapshot. The decision
//! itself is a pure function of those three inputs.

use crate::contacts::ContactNumberCache;
use crate::mode::{AppMode, ModeCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Response handed back to the telephony collaborator. A block rejects
/// the call and suppresses both the call log entry and the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResponse {
    pub disallow: bool,
    pub reject: bool,
    pub skip_call_log: bool,
    pub skip_notification: bool,
}

impl CallResponse {
    pub fn allow() -> Self {
        Self {
            disallow: false,
            reject: false,
            skip_call_log: false,
            skip_notification: false,
        }
    }

    pub fn block() -> Self {
        Self {
            disallow: true,
            reject: true,
            skip_call_log: true,
            skip_notification: true,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.disallow
    }
}

/// The admission decision table. Pure.
///
/// | mode   | blocking enabled | number allowed | result |
/// |--------|------------------|----------------|--------|
/// | Normal | any              | any            | allow  |
/// | Focus  | false            | any            | allow  |
/// | Focus  | true             | yes            | allow  |
/// | Focus  | true             | no             | block  |
pub fn decide(mode: AppMode, call_blocking_enabled: bool, number_allowed: bool) -> CallResponse {
    match (mode, call_blocking_enabled, number_allowed) {
        (AppMode::Focus, true, false) => CallResponse::block(),
        _ => CallResponse::allow(),
    }
}

/// Screens incoming calls against the current mode, the active profile's
/// call-blocking flag, and the contact number cache.
pub struct CallGate {
    mode: Arc<ModeCell>,
    cache: Arc<ContactNumberCache>,
    call_blocking_enabled: AtomicBool,
}

impl CallGate {
    pub fn new(mode: Arc<ModeCell>, cache: Arc<ContactNumberCache>) -> Self {
        Self {
            mode,
            cache,
            call_blocking_enabled: AtomicBool::new(false),
        }
    }

    /// Updated whenever the active profile changes.
    pub fn set_call_blocking_enabled(&self, enabled: bool) {
        self.call_blocking_enabled.store(enabled, Ordering::Release);
    }

    pub fn call_blocking_enabled(&self) -> bool {
        self.call_blocking_enabled.load(Ordering::Acquire)
    }

    /// Hint for system-level do-not-disturb toggling, re-derived whenever
    /// the mode changes.
    pub fn blocking_active(&self) -> bool {
        self.mode.load() == AppMode::Focus && self.call_blocking_enabled()
    }

    /// Decide admission for one incoming call.
    pub fn screen(&self, incoming_number: &str) -> CallResponse {
        let mode = self.mode.load();
        let blocking = self.call_blocking_enabled();
        // Skip the cache walk entirely when the outcome cannot depend on it.
        let number_allowed = if mode == AppMode::Focus && blocking {
            self.cache.contains(incoming_number)
        } else {
            true
        };
        let response = decide(mode, blocking, number_allowed);
        if response.is_blocked() {
            info!("blocking call (not an allowed contact)");
        } else {
            debug!("allowing call");
        }
        response
    }
}
