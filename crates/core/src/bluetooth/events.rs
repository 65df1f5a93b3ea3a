//! Link event and command types.
//!
//! Platform callbacks (scan results, GATT callbacks, timer fires) are
//! represented as one tagged [`LinkEvent`] enum consumed by a single
//! state-machine step function, instead of mutable state scattered across
//! callback closures. The step function answers with [`LinkCommand`]s that
//! the platform driver executes.

use std::time::Duration;

/// A peripheral seen during a scan. Ephemeral: only the address survives a
/// successful connect, as the persisted "last known device".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralHandle {
    pub address: String,
    pub name: Option<String>,
}

impl PeripheralHandle {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed")
    }
}

/// Scan discovery modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Steady-state reconnect scan, filtered on the focus service UUID.
    /// The first match is connected to immediately.
    TargetService,
    /// Unfiltered first-pairing scan. Results are surfaced as
    /// [`ConnectionEvent::DeviceFound`] and never auto-connected; the scan
    /// auto-stops after the pairing window.
    AnyDevice,
}

/// Inputs to the connection state machine. Everything that can move the
/// link arrives here, serialized through one queue.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Supervisor asked the manager to establish the steady-state link.
    Start,
    /// UI asked for an unfiltered pairing scan.
    PairingScanRequested,
    /// UI picked a device from the pairing list.
    ConnectRequested { address: String },
    /// Supervisor asked for full cleanup.
    DisconnectRequested,

    /// A scan result arrived.
    DeviceDiscovered(PeripheralHandle),
    /// The adapter reported a scan failure.
    ScanFailed { code: i32 },
    /// The pairing scan window elapsed.
    ScanWindowElapsed { generation: u64 },

    /// GATT connect callback: success.
    GattConnected,
    /// The remote end disconnected, or a close completed.
    GattDisconnected,
    /// GATT callback with an error status.
    GattError { status: i32 },
    /// Service discovery finished; reports whether the trigger
    /// characteristic was found.
    ServicesDiscovered { trigger_characteristic: bool },
    /// The CCC descriptor write completed and notifications are flowing.
    NotificationsEnabled,
    /// A characteristic-changed payload arrived.
    Notification(Vec<u8>),

    /// The connect deadline fired. Stale fires carry a superseded
    /// generation and are ignored.
    ConnectTimeout { generation: u64 },
}

/// Effects the platform driver must perform on behalf of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    StartScan { mode: DiscoveryMode },
    StopScan,
    Connect(PeripheralHandle),
    /// Close and drop any open GATT handle. Idempotent on the driver side.
    CloseLink,
    /// Run service discovery after the settle delay.
    ScheduleDiscovery { settle: Duration },
    /// Write the CCC descriptor on the trigger characteristic.
    EnableNotifications,
    ArmConnectTimeout { generation: u64, after: Duration },
    ArmScanWindow { generation: u64, after: Duration },
    /// Persist the address to bias future auto-reconnect.
    PersistLastDevice { address: String },
}

/// Events surfaced to collaborators (UI layer, supervisor).
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A device showed up during a pairing scan.
    DeviceFound { name: Option<String>, address: String },
    /// Human-readable connection progress plus the link flag.
    ConnectionStatus { message: String, is_connected: bool },
    /// Decoded UTF-8 payload from the trigger characteristic.
    Trigger(String),
}
