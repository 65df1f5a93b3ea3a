//! Focus-case core library
//!
//! Core functionality for a BLE "focus switch" phone case: a hardware
//! toggle on the case flips the phone between a normal mode and a focus
//! mode that screens incoming calls against the active profile's allowed
//! contacts.

pub mod bluetooth;
pub mod callgate;
pub mod config;
pub mod contacts;
pub mod error;
pub mod mode;
pub mod numbers;
pub mod profile;

pub use bluetooth::{
    ConnectionEvent, ConnectionManager, ConnectionState, DiscoveryMode, LinkCommand, LinkEvent,
};
pub use callgate::{CallGate, CallResponse};
pub use config::{ConfigStore, JsonConfigStore, MemoryConfigStore};
pub use contacts::{ContactNumberCache, ContactResolver};
pub use error::{FocusError, Result};
pub use mode::{AppMode, ModeCell, ModeDispatcher, ModeEvent, SurfaceHandle};
pub use profile::{Profile, ProfileStore};

use mode::ModeDispatcher as Dispatcher;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Main focus-case core instance. Owns the connection state machine, the
/// mode dispatcher, the contact cache, and the call gate; collaborators
/// plug in through the [`ConfigStore`], [`ProfileStore`],
/// [`ContactResolver`], and [`SurfaceHandle`] traits.
pub struct FocusCore {
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: Mutex<Option<mpsc::UnboundedReceiver<LinkEvent>>>,
    commands_rx: Mutex<Option<mpsc::UnboundedReceiver<LinkCommand>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    dispatcher: Mutex<Option<Dispatcher>>,
    mode: Arc<ModeCell>,
    mode_events: broadcast::Sender<ModeEvent>,
    cache: Arc<ContactNumberCache>,
    gate: Arc<CallGate>,
    config: Arc<dyn ConfigStore>,
    profiles: Arc<dyn ProfileStore>,
    resolver: Arc<dyn ContactResolver>,
}

impl FocusCore {
    /// Assemble the core around its collaborators. `region` is the ISO
    /// country code phone numbers are canonicalized against.
    pub fn new(
        config: Arc<dyn ConfigStore>,
        profiles: Arc<dyn ProfileStore>,
        resolver: Arc<dyn ContactResolver>,
        region: &str,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (mode_events, _) = broadcast::channel(32);

        // The mode survives restarts; the live cell starts from the store.
        let mode = Arc::new(ModeCell::new(config.app_mode()));
        let cache = Arc::new(ContactNumberCache::new(region));
        let gate = Arc::new(CallGate::new(Arc::clone(&mode), Arc::clone(&cache)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&mode),
            Arc::clone(&config),
            mode_events.clone(),
        );

        Self {
            link_tx,
            link_rx: Mutex::new(Some(link_rx)),
            commands_rx: Mutex::new(None),
            events_rx: Mutex::new(None),
            dispatcher: Mutex::new(Some(dispatcher)),
            mode,
            mode_events,
            cache,
            gate,
            config,
            profiles,
            resolver,
        }
    }

    /// Install a surface hook raised on entry to focus mode. Must be
    /// called before [`start`](Self::start).
    pub fn with_surface(self, surface: Arc<dyn SurfaceHandle>) -> Self {
        {
            let mut guard = self.dispatcher.lock().expect("dispatcher lock poisoned");
            if let Some(dispatcher) = guard.take() {
                *guard = Some(dispatcher.with_surface(surface));
            }
        }
        self
    }

    /// Spawn the manager and routing tasks and kick off the steady-state
    /// reconnect scan. Call once.
    pub async fn start(&self) -> Result<()> {
        info!("starting focus-case core");
        self.reload_profile().await?;

        let link_rx = self
            .link_rx
            .lock()
            .expect("link receiver lock poisoned")
            .take()
            .ok_or(FocusError::AlreadyStarted)?;
        let dispatcher = self
            .dispatcher
            .lock()
            .expect("dispatcher lock poisoned")
            .take()
            .ok_or(FocusError::AlreadyStarted)?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (public_tx, public_rx) = mpsc::unbounded_channel();
        *self.commands_rx.lock().expect("commands lock poisoned") = Some(commands_rx);
        *self.events_rx.lock().expect("events lock poisoned") = Some(public_rx);

        Self::spawn_manager_task(link_rx, internal_tx, commands_tx, Arc::clone(&self.config));
        Self::spawn_event_router(internal_rx, public_tx, dispatcher);

        self.link_tx
            .send(LinkEvent::Start)
            .map_err(|_| FocusError::ChannelClosed)?;
        Ok(())
    }

    /// Drive the connection state machine from one sequential task so a
    /// timer fire can never race a late GATT callback.
    fn spawn_manager_task(
        mut link_rx: mpsc::UnboundedReceiver<LinkEvent>,
        internal_tx: mpsc::UnboundedSender<ConnectionEvent>,
        commands_tx: mpsc::UnboundedSender<LinkCommand>,
        config: Arc<dyn ConfigStore>,
    ) {
        tokio::spawn(async move {
            let mut manager = ConnectionManager::new(internal_tx);
            while let Some(event) = link_rx.recv().await {
                for command in manager.step(event) {
                    match command {
                        LinkCommand::PersistLastDevice { address } => {
                            if let Err(e) = config.set_last_peripheral_address(&address) {
                                warn!("could not persist device address: {}", e);
                            }
                        }
                        other => {
                            if commands_tx.send(other).is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    /// Route connection events: triggers feed the mode dispatcher,
    /// everything else is surfaced to the embedding layer.
    fn spawn_event_router(
        mut internal_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
        public_tx: mpsc::UnboundedSender<ConnectionEvent>,
        mut dispatcher: Dispatcher,
    ) {
        tokio::spawn(async move {
            while let Some(event) = internal_rx.recv().await {
                match event {
                    ConnectionEvent::Trigger(message) => {
                        dispatcher.handle_trigger(&message);
                    }
                    other => {
                        if public_tx.send(other).is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }

    /// Re-read the active profile: call-blocking flag takes effect
    /// immediately, the contact cache is rebuilt off the async runtime.
    pub async fn reload_profile(&self) -> Result<()> {
        let profile = self.profiles.active_profile();
        match profile {
            Some(profile) => {
                info!("active profile: {}", profile.name);
                self.gate
                    .set_call_blocking_enabled(profile.call_blocking_enabled);
                self.config.set_active_profile_id(Some(&profile.id))?;
                let cache = Arc::clone(&self.cache);
                let resolver = Arc::clone(&self.resolver);
                let ids = profile.allowed_contact_ids;
                // Resolution may hit a blocking directory backend.
                tokio::task::spawn_blocking(move || cache.rebuild(&ids, resolver.as_ref()))
                    .await
                    .map_err(|e| FocusError::Store(e.to_string()))?;
            }
            None => {
                info!("no active profile; call blocking disabled");
                self.gate.set_call_blocking_enabled(false);
                self.config.set_active_profile_id(None)?;
                let cache = Arc::clone(&self.cache);
                let resolver = Arc::clone(&self.resolver);
                tokio::task::spawn_blocking(move || {
                    cache.rebuild(&Default::default(), resolver.as_ref())
                })
                .await
                .map_err(|e| FocusError::Store(e.to_string()))?;
            }
        }
        Ok(())
    }

    // --- link control ---------------------------------------------------

    /// Sender for feeding link events; used by the platform driver's
    /// supervisor and by tests.
    pub fn link_event_sender(&self) -> mpsc::UnboundedSender<LinkEvent> {
        self.link_tx.clone()
    }

    /// Take the command stream the platform driver must execute. Yields
    /// once; only one driver may run.
    pub fn take_link_commands(&self) -> Option<mpsc::UnboundedReceiver<LinkCommand>> {
        self.commands_rx.lock().expect("commands lock poisoned").take()
    }

    /// Take the connection-event stream (status, pairing results). Yields
    /// once.
    pub fn take_connection_events(&self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        self.events_rx.lock().expect("events lock poisoned").take()
    }

    /// Subscribe to mode changes.
    pub fn subscribe_mode_events(&self) -> broadcast::Receiver<ModeEvent> {
        self.mode_events.subscribe()
    }

    /// Start an unfiltered pairing scan; discovered devices arrive as
    /// [`ConnectionEvent::DeviceFound`] until the window closes.
    pub fn start_pairing_scan(&self) -> Result<()> {
        self.link_tx
            .send(LinkEvent::PairingScanRequested)
            .map_err(|_| FocusError::ChannelClosed)
    }

    /// Connect to a device picked from the pairing list.
    pub fn connect_to(&self, address: &str) -> Result<()> {
        self.link_tx
            .send(LinkEvent::ConnectRequested {
                address: address.to_string(),
            })
            .map_err(|_| FocusError::ChannelClosed)
    }

    /// Tear the link down and park the state machine.
    pub fn disconnect(&self) -> Result<()> {
        self.link_tx
            .send(LinkEvent::DisconnectRequested)
            .map_err(|_| FocusError::ChannelClosed)
    }

    // --- call screening ---------------------------------------------------

    /// Decide admission for one incoming call. Lock-free; safe to call
    /// from a real-time screening thread.
    pub fn screen_call(&self, incoming_number: &str) -> CallResponse {
        self.gate.screen(incoming_number)
    }

    /// True while focus mode with call blocking is in force; drives the
    /// system do-not-disturb hint.
    pub fn blocking_active(&self) -> bool {
        self.gate.blocking_active()
    }

    pub fn current_mode(&self) -> AppMode {
        self.mode.load()
    }
}
