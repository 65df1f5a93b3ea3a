//! Mode dispatcher - turns raw trigger payloads into a globally-visible
//! app mode with debounce, persistence, and a typed change broadcast.

use crate::bluetooth::constants::timing;
use crate::config::ConfigStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The two modes the case can switch the phone between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    Normal,
    Focus,
}

impl Default for AppMode {
    fn default() -> Self {
        AppMode::Normal
    }
}

/// Classify a trigger payload. The firmware sends free-form text around
/// the sentinels, so this is a substring match; "ON" is checked before
/// "OFF". Unrecognized payloads yield `None`.
pub fn classify_trigger(message: &str) -> Option<AppMode> {
    if message.contains("ON") {
        Some(AppMode::Focus)
    } else if message.contains("OFF") {
        Some(AppMode::Normal)
    } else {
        None
    }
}

/// Mode change notifications for collaborators (UI, call gate supervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    ModeChanged(AppMode),
}

/// Lock-free snapshot of the current mode. Written only by the dispatcher,
/// read from the call-screening thread which has a real-time deadline.
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub fn new(mode: AppMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn load(&self) -> AppMode {
        match self.0.load(Ordering::Acquire) {
            1 => AppMode::Focus,
            _ => AppMode::Normal,
        }
    }

    pub fn store(&self, mode: AppMode) {
        self.0.store(mode as u8, Ordering::Release);
    }
}

/// Hook for bringing the foreground UI surface forward when entering
/// Focus. The side effect itself belongs to the platform shell.
pub trait SurfaceHandle: Send + Sync {
    fn bring_to_front(&self);
}

/// Debounced trigger-to-mode dispatcher. Single writer of [`ModeCell`]
/// and of the persisted mode key.
pub struct ModeDispatcher {
    last_trigger: Option<Instant>,
    debounce: Duration,
    mode: Arc<ModeCell>,
    store: Arc<dyn ConfigStore>,
    surface: Option<Arc<dyn SurfaceHandle>>,
    events: broadcast::Sender<ModeEvent>,
}

impl ModeDispatcher {
    pub fn new(
        mode: Arc<ModeCell>,
        store: Arc<dyn ConfigStore>,
        events: broadcast::Sender<ModeEvent>,
    ) -> Self {
        Self {
            last_trigger: None,
            debounce: timing::TRIGGER_DEBOUNCE,
            mode,
            store,
            surface: None,
            events,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn SurfaceHandle>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Handle a trigger payload. Returns the new mode when a transition
    /// was applied.
    pub fn handle_trigger(&mut self, message: &str) -> Option<AppMode> {
        self.handle_trigger_at(message, Instant::now())
    }

    /// Debounce is on trigger *arrival*, not on mode change: any payload
    /// that passes the window resets the clock, including a same-mode
    /// retrigger and an unrecognized payload. Matches the shipped firmware
    /// pairing; flagged for product review before changing.
    pub fn handle_trigger_at(&mut self, message: &str, now: Instant) -> Option<AppMode> {
        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < self.debounce {
                debug!("trigger ignored (debounce)");
                return None;
            }
        }
        self.last_trigger = Some(now);

        let new_mode = match classify_trigger(message) {
            Some(mode) => mode,
            None => {
                debug!("unrecognized trigger payload: {:?}", message);
                return None;
            }
        };

        info!("mode transition: {:?}", new_mode);
        self.mode.store(new_mode);
        if let Err(e) = self.store.set_app_mode(new_mode) {
            // Persistence failure is not fatal; the live cell is current.
            warn!("could not persist app mode: {}", e);
        }
        let _ = self.events.send(ModeEvent::ModeChanged(new_mode));

        if new_mode == AppMode::Focus {
            if let Some(surface) = &self.surface {
                surface.bring_to_front();
            }
        }
        Some(new_mode)
    }
}
