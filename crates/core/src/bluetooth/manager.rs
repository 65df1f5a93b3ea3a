//! Connection manager - single-link BLE state machine.
//!
//! Keeps exactly one active subscription to the focus-switch service on a
//! single peripheral, re-establishing it whenever lost. All inputs arrive
//! as [`LinkEvent`]s through [`ConnectionManager::step`], which must be
//! driven from one sequential task so that a timeout can never race a late
//! connect callback. Every failure path is non-fatal and lands back in
//! `Scanning`; only an explicit disconnect parks the machine in `Idle`.

use super::constants::timing;
use super::events::{
    ConnectionEvent, DiscoveryMode, LinkCommand, LinkEvent, PeripheralHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Connection lifecycle states. Exactly one instance lives per process,
/// owned by the manager and mutated only inside `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Scanning { mode: DiscoveryMode, generation: u64 },
    Connecting { peripheral: PeripheralHandle, generation: u64 },
    Connected { peripheral: PeripheralHandle },
    Disconnecting,
}

/// Single-link connection state machine.
pub struct ConnectionManager {
    state: ConnectionState,
    /// Monotonic token stamped onto timers; a fire with a superseded
    /// generation is stale and must not transition anything.
    generation: u64,
    /// Whether a Connect command is outstanding without a matching
    /// CloseLink. At most one GATT handle may ever be open.
    link_open: bool,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ConnectionManager {
    pub fn new(event_tx: mpsc::UnboundedSender<ConnectionEvent>) -> Self {
        Self {
            state: ConnectionState::Idle,
            generation: 0,
            link_open: false,
            event_tx,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// True while a Connect has been issued without a matching CloseLink.
    pub fn link_open(&self) -> bool {
        self.link_open
    }

    /// Advance the state machine by one event. Returns the commands the
    /// platform driver must execute, in order.
    pub fn step(&mut self, event: LinkEvent) -> Vec<LinkCommand> {
        let mut cmds = Vec::new();
        match event {
            LinkEvent::Start => self.on_start(&mut cmds),
            LinkEvent::PairingScanRequested => self.on_pairing_scan(&mut cmds),
            LinkEvent::ConnectRequested { address } => self.on_connect_requested(address, &mut cmds),
            LinkEvent::DisconnectRequested => self.on_disconnect(&mut cmds),
            LinkEvent::DeviceDiscovered(handle) => self.on_device_discovered(handle, &mut cmds),
            LinkEvent::ScanFailed { code } => self.on_scan_failed(code),
            LinkEvent::ScanWindowElapsed { generation } => {
                self.on_scan_window_elapsed(generation, &mut cmds)
            }
            LinkEvent::GattConnected => self.on_gatt_connected(&mut cmds),
            LinkEvent::GattDisconnected => self.on_gatt_disconnected(&mut cmds),
            LinkEvent::GattError { status } => self.on_gatt_error(status, &mut cmds),
            LinkEvent::ServicesDiscovered { trigger_characteristic } => {
                self.on_services_discovered(trigger_characteristic, &mut cmds)
            }
            LinkEvent::NotificationsEnabled => {
                debug!("notifications enabled on trigger characteristic");
            }
            LinkEvent::Notification(payload) => self.on_notification(payload),
            LinkEvent::ConnectTimeout { generation } => {
                self.on_connect_timeout(generation, &mut cmds)
            }
        }
        cmds
    }

    // --- event handlers -----------------------------------------------

    fn on_start(&mut self, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Idle => {
                self.emit_status("Scanning for smart case...", false);
                self.begin_scan(DiscoveryMode::TargetService, cmds);
            }
            // One active scan session at a time; overlapping requests are
            // ignored, as are starts while a link is being established.
            _ => debug!(state = ?self.state, "start ignored"),
        }
    }

    fn on_pairing_scan(&mut self, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Scanning { .. } => cmds.push(LinkCommand::StopScan),
            _ => {
                debug!(state = ?self.state, "pairing scan ignored while link active");
                return;
            }
        }
        self.emit_status("Scanning for devices...", false);
        self.begin_scan(DiscoveryMode::AnyDevice, cmds);
    }

    fn on_connect_requested(&mut self, address: String, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Scanning { .. } => cmds.push(LinkCommand::StopScan),
            _ => {
                debug!(state = ?self.state, "connect request ignored");
                return;
            }
        }
        let handle = PeripheralHandle { address, name: None };
        self.start_connect(handle, cmds);
    }

    fn on_disconnect(&mut self, cmds: &mut Vec<LinkCommand>) {
        // Invalidate any pending timer regardless of state.
        self.generation += 1;
        match self.state {
            ConnectionState::Idle | ConnectionState::Disconnecting => {
                debug!("disconnect is a no-op in {:?}", self.state);
            }
            ConnectionState::Scanning { .. } => {
                cmds.push(LinkCommand::StopScan);
                self.state = ConnectionState::Idle;
                self.emit_status("Disconnected", false);
            }
            ConnectionState::Connecting { .. } | ConnectionState::Connected { .. } => {
                cmds.push(LinkCommand::CloseLink);
                self.link_open = false;
                self.state = ConnectionState::Disconnecting;
            }
        }
    }

    fn on_device_discovered(&mut self, handle: PeripheralHandle, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Scanning { mode: DiscoveryMode::TargetService, .. } => {
                debug!(
                    "device found: {} at {}",
                    handle.display_name(),
                    handle.address
                );
                // At most one connection attempt per scan cycle.
                cmds.push(LinkCommand::StopScan);
                self.start_connect(handle, cmds);
            }
            ConnectionState::Scanning { mode: DiscoveryMode::AnyDevice, .. } => {
                self.emit(ConnectionEvent::DeviceFound {
                    name: handle.name,
                    address: handle.address,
                });
            }
            // Late results after the scan was stopped.
            _ => debug!("ignoring scan result in {:?}", self.state),
        }
    }

    fn on_scan_failed(&mut self, code: i32) {
        if let ConnectionState::Scanning { .. } = self.state {
            warn!("scan failed with adapter code {}", code);
            self.state = ConnectionState::Idle;
            self.emit_status("Scan failed.", false);
        }
    }

    fn on_scan_window_elapsed(&mut self, generation: u64, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Scanning { mode: DiscoveryMode::AnyDevice, generation: g }
                if g == generation =>
            {
                cmds.push(LinkCommand::StopScan);
                self.state = ConnectionState::Idle;
                self.emit_status("Scan finished.", false);
            }
            _ => debug!("stale scan window fire ignored"),
        }
    }

    fn on_gatt_connected(&mut self, cmds: &mut Vec<LinkCommand>) {
        match std::mem::replace(&mut self.state, ConnectionState::Idle) {
            ConnectionState::Connecting { peripheral, .. } => {
                debug!("connected to {}", peripheral.address);
                // Invalidate the connect deadline.
                self.generation += 1;
                cmds.push(LinkCommand::ScheduleDiscovery {
                    settle: timing::DISCOVERY_SETTLE_DELAY,
                });
                cmds.push(LinkCommand::PersistLastDevice {
                    address: peripheral.address.clone(),
                });
                self.emit_status("Connected to smart case", true);
                self.state = ConnectionState::Connected { peripheral };
            }
            other => {
                // A connect that lands after its timeout already rescanned.
                // The handle it opened is spurious; close it.
                warn!("late connect in {:?}, closing spurious handle", other);
                cmds.push(LinkCommand::CloseLink);
                self.state = other;
            }
        }
    }

    fn on_gatt_disconnected(&mut self, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Connected { .. } | ConnectionState::Connecting { .. } => {
                warn!("link lost");
                self.force_reconnect("Disconnected. Searching...", cmds);
            }
            ConnectionState::Disconnecting => {
                self.state = ConnectionState::Idle;
                self.emit_status("Disconnected", false);
            }
            // Close confirmations after a failure path already rescanned.
            _ => debug!("ignoring disconnect in {:?}", self.state),
        }
    }

    fn on_gatt_error(&mut self, status: i32, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Connected { .. } | ConnectionState::Connecting { .. } => {
                // All GATT statuses are retried uniformly at this layer.
                warn!("gatt error status {}", status);
                self.force_reconnect("Connection failed. Searching...", cmds);
            }
            _ => debug!("ignoring gatt error {} in {:?}", status, self.state),
        }
    }

    fn on_services_discovered(&mut self, trigger_characteristic: bool, cmds: &mut Vec<LinkCommand>) {
        if !matches!(self.state, ConnectionState::Connected { .. }) {
            debug!("ignoring discovery result in {:?}", self.state);
            return;
        }
        if trigger_characteristic {
            cmds.push(LinkCommand::EnableNotifications);
        } else {
            warn!("trigger characteristic missing after discovery");
            self.force_reconnect("Connection failed. Searching...", cmds);
        }
    }

    fn on_notification(&mut self, payload: Vec<u8>) {
        if !matches!(self.state, ConnectionState::Connected { .. }) {
            return;
        }
        match String::from_utf8(payload) {
            Ok(message) => {
                debug!("received trigger payload: {}", message);
                self.emit(ConnectionEvent::Trigger(message));
            }
            Err(_) => debug!("discarding undecodable trigger payload"),
        }
    }

    fn on_connect_timeout(&mut self, generation: u64, cmds: &mut Vec<LinkCommand>) {
        match self.state {
            ConnectionState::Connecting { generation: g, .. } if g == generation => {
                warn!("connect attempt timed out");
                self.force_reconnect("Connection timed out. Searching...", cmds);
            }
            _ => debug!("stale connect timeout ignored"),
        }
    }

    // --- transition helpers -------------------------------------------

    fn begin_scan(&mut self, mode: DiscoveryMode, cmds: &mut Vec<LinkCommand>) {
        self.generation += 1;
        cmds.push(LinkCommand::StartScan { mode });
        if mode == DiscoveryMode::AnyDevice {
            cmds.push(LinkCommand::ArmScanWindow {
                generation: self.generation,
                after: timing::PAIRING_SCAN_WINDOW,
            });
        }
        self.state = ConnectionState::Scanning {
            mode,
            generation: self.generation,
        };
    }

    fn start_connect(&mut self, handle: PeripheralHandle, cmds: &mut Vec<LinkCommand>) {
        // Never hold two handles: close a partially-open one first.
        if self.link_open {
            cmds.push(LinkCommand::CloseLink);
            self.link_open = false;
        }
        self.generation += 1;
        cmds.push(LinkCommand::Connect(handle.clone()));
        self.link_open = true;
        cmds.push(LinkCommand::ArmConnectTimeout {
            generation: self.generation,
            after: timing::CONNECT_TIMEOUT,
        });
        self.emit_status("Connecting to smart case...", false);
        self.state = ConnectionState::Connecting {
            peripheral: handle,
            generation: self.generation,
        };
    }

    fn force_reconnect(&mut self, status: &str, cmds: &mut Vec<LinkCommand>) {
        cmds.push(LinkCommand::CloseLink);
        self.link_open = false;
        self.emit_status(status, false);
        self.begin_scan(DiscoveryMode::TargetService, cmds);
    }

    fn emit_status(&self, message: &str, is_connected: bool) {
        self.emit(ConnectionEvent::ConnectionStatus {
            message: message.to_string(),
            is_connected,
        });
    }

    fn emit(&self, event: ConnectionEvent) {
        // Channel closed means shutdown; nothing to do.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> (ConnectionManager, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionManager::new(tx), rx)
    }

    fn case() -> PeripheralHandle {
        PeripheralHandle {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            name: Some("SmartCase".to_string()),
        }
    }

    fn armed_generation(cmds: &[LinkCommand]) -> u64 {
        cmds.iter()
            .find_map(|c| match c {
                LinkCommand::ArmConnectTimeout { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("no connect timeout armed")
    }

    /// Drive a sequence and check the at-most-one-open-handle invariant
    /// against a model of the driver.
    fn assert_single_handle(mgr: &mut ConnectionManager, events: Vec<LinkEvent>) {
        let mut handle_open = false;
        for event in events {
            for cmd in mgr.step(event) {
                match cmd {
                    LinkCommand::Connect(_) => {
                        assert!(!handle_open, "second handle opened while one was live");
                        handle_open = true;
                    }
                    LinkCommand::CloseLink => handle_open = false,
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_start_scans_then_connects_on_match() {
        let (mut m, _rx) = mgr();
        let cmds = m.step(LinkEvent::Start);
        assert_eq!(
            cmds,
            vec![LinkCommand::StartScan { mode: DiscoveryMode::TargetService }]
        );

        let cmds = m.step(LinkEvent::DeviceDiscovered(case()));
        assert_eq!(cmds[0], LinkCommand::StopScan);
        assert_eq!(cmds[1], LinkCommand::Connect(case()));
        assert!(matches!(cmds[2], LinkCommand::ArmConnectTimeout { .. }));
        assert!(matches!(m.state(), ConnectionState::Connecting { .. }));
    }

    #[test]
    fn test_overlapping_scan_requests_ignored() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let cmds = m.step(LinkEvent::Start);
        assert!(cmds.is_empty()); // one active scan session at a time
    }

    #[test]
    fn test_connect_success_schedules_discovery_and_persists_address() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        let cmds = m.step(LinkEvent::GattConnected);
        assert_eq!(
            cmds,
            vec![
                LinkCommand::ScheduleDiscovery { settle: timing::DISCOVERY_SETTLE_DELAY },
                LinkCommand::PersistLastDevice { address: case().address },
            ]
        );
        assert!(m.is_connected());
    }

    #[test]
    fn test_connect_timeout_rescans_exactly_once() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let generation = armed_generation(&m.step(LinkEvent::DeviceDiscovered(case())));

        let cmds = m.step(LinkEvent::ConnectTimeout { generation });
        assert_eq!(cmds[0], LinkCommand::CloseLink);
        assert!(cmds.contains(&LinkCommand::StartScan { mode: DiscoveryMode::TargetService }));
        assert!(matches!(
            m.state(),
            ConnectionState::Scanning { mode: DiscoveryMode::TargetService, .. }
        ));

        // The close confirmation and a duplicate fire must not rescan again.
        assert!(m.step(LinkEvent::GattDisconnected).is_empty());
        assert!(m.step(LinkEvent::ConnectTimeout { generation }).is_empty());
    }

    #[test]
    fn test_stale_timeout_after_connect_is_ignored() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let generation = armed_generation(&m.step(LinkEvent::DeviceDiscovered(case())));
        m.step(LinkEvent::GattConnected);

        let cmds = m.step(LinkEvent::ConnectTimeout { generation });
        assert!(cmds.is_empty());
        assert!(m.is_connected());
    }

    #[test]
    fn test_late_connect_after_timeout_closes_spurious_handle() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let generation = armed_generation(&m.step(LinkEvent::DeviceDiscovered(case())));
        m.step(LinkEvent::ConnectTimeout { generation });

        let cmds = m.step(LinkEvent::GattConnected);
        assert_eq!(cmds, vec![LinkCommand::CloseLink]);
        assert!(!m.is_connected());
    }

    #[test]
    fn test_link_loss_closes_and_rescans() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);

        let cmds = m.step(LinkEvent::GattDisconnected);
        assert_eq!(cmds[0], LinkCommand::CloseLink);
        assert!(cmds.contains(&LinkCommand::StartScan { mode: DiscoveryMode::TargetService }));
        assert!(!m.link_open());
    }

    #[test]
    fn test_gatt_error_treated_like_link_loss() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);

        let cmds = m.step(LinkEvent::GattError { status: 133 });
        assert_eq!(cmds[0], LinkCommand::CloseLink);
        assert!(cmds.contains(&LinkCommand::StartScan { mode: DiscoveryMode::TargetService }));
    }

    #[test]
    fn test_discovery_enables_notifications() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);

        let cmds = m.step(LinkEvent::ServicesDiscovered { trigger_characteristic: true });
        assert_eq!(cmds, vec![LinkCommand::EnableNotifications]);
    }

    #[test]
    fn test_missing_characteristic_rescans() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);

        let cmds = m.step(LinkEvent::ServicesDiscovered { trigger_characteristic: false });
        assert_eq!(cmds[0], LinkCommand::CloseLink);
        assert!(cmds.contains(&LinkCommand::StartScan { mode: DiscoveryMode::TargetService }));
    }

    #[test]
    fn test_notifications_forwarded_as_triggers() {
        let (mut m, mut rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);
        while rx.try_recv().is_ok() {} // drain status events

        m.step(LinkEvent::Notification(b"LED is ON".to_vec()));
        match rx.try_recv() {
            Ok(ConnectionEvent::Trigger(msg)) => assert_eq!(msg, "LED is ON"),
            other => panic!("expected trigger, got {:?}", other),
        }

        // Undecodable bytes are discarded, not surfaced.
        m.step(LinkEvent::Notification(vec![0xff, 0xfe]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_pairing_scan_lists_devices_without_connecting() {
        let (mut m, mut rx) = mgr();
        let cmds = m.step(LinkEvent::PairingScanRequested);
        assert_eq!(cmds[0], LinkCommand::StartScan { mode: DiscoveryMode::AnyDevice });
        assert!(matches!(cmds[1], LinkCommand::ArmScanWindow { .. }));
        while rx.try_recv().is_ok() {}

        let other = PeripheralHandle { address: "11:22:33:44:55:66".into(), name: None };
        let cmds = m.step(LinkEvent::DeviceDiscovered(case()));
        assert!(cmds.is_empty());
        let cmds = m.step(LinkEvent::DeviceDiscovered(other));
        assert!(cmds.is_empty());

        let mut found = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConnectionEvent::DeviceFound { .. }) {
                found += 1;
            }
        }
        assert_eq!(found, 2);
        assert!(!m.link_open());
    }

    #[test]
    fn test_pairing_scan_window_autostops() {
        let (mut m, _rx) = mgr();
        let cmds = m.step(LinkEvent::PairingScanRequested);
        let generation = match cmds[1] {
            LinkCommand::ArmScanWindow { generation, .. } => generation,
            _ => panic!("no scan window armed"),
        };

        let cmds = m.step(LinkEvent::ScanWindowElapsed { generation });
        assert_eq!(cmds, vec![LinkCommand::StopScan]);
        assert_eq!(m.state(), &ConnectionState::Idle);

        // A stale window fire after a new scan started must not stop it.
        let cmds = m.step(LinkEvent::PairingScanRequested);
        assert!(cmds.contains(&LinkCommand::StartScan { mode: DiscoveryMode::AnyDevice }));
        assert!(m.step(LinkEvent::ScanWindowElapsed { generation }).is_empty());
    }

    #[test]
    fn test_connect_requested_from_pairing_list() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::PairingScanRequested);
        let cmds = m.step(LinkEvent::ConnectRequested { address: case().address });
        assert_eq!(cmds[0], LinkCommand::StopScan);
        assert!(matches!(cmds[1], LinkCommand::Connect(_)));
        assert!(matches!(m.state(), ConnectionState::Connecting { .. }));
    }

    #[test]
    fn test_disconnect_is_idempotent_from_all_states() {
        // From idle.
        let (mut m, _rx) = mgr();
        assert!(m.step(LinkEvent::DisconnectRequested).is_empty());

        // From scanning.
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let cmds = m.step(LinkEvent::DisconnectRequested);
        assert_eq!(cmds, vec![LinkCommand::StopScan]);
        assert!(m.step(LinkEvent::DisconnectRequested).is_empty());

        // From connected: close, then settle on the confirmation.
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        m.step(LinkEvent::GattConnected);
        let cmds = m.step(LinkEvent::DisconnectRequested);
        assert_eq!(cmds, vec![LinkCommand::CloseLink]);
        assert!(m.step(LinkEvent::DisconnectRequested).is_empty());
        assert!(m.step(LinkEvent::GattDisconnected).is_empty());
        assert_eq!(m.state(), &ConnectionState::Idle);
    }

    #[test]
    fn test_scan_failure_goes_idle() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        let cmds = m.step(LinkEvent::ScanFailed { code: 2 });
        assert!(cmds.is_empty());
        assert_eq!(m.state(), &ConnectionState::Idle);

        // The next start scans again.
        let cmds = m.step(LinkEvent::Start);
        assert_eq!(
            cmds,
            vec![LinkCommand::StartScan { mode: DiscoveryMode::TargetService }]
        );
    }

    #[test]
    fn test_late_scan_result_ignored_while_connecting() {
        let (mut m, _rx) = mgr();
        m.step(LinkEvent::Start);
        m.step(LinkEvent::DeviceDiscovered(case()));
        let cmds = m.step(LinkEvent::DeviceDiscovered(case()));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_never_two_open_handles_across_failure_storm() {
        let (mut m, _rx) = mgr();
        let generation_probe = |m: &mut ConnectionManager| {
            armed_generation(&m.step(LinkEvent::DeviceDiscovered(case())))
        };
        m.step(LinkEvent::Start);
        let g1 = generation_probe(&mut m);
        assert_single_handle(
            &mut m,
            vec![
                LinkEvent::ConnectTimeout { generation: g1 },
                LinkEvent::GattDisconnected,
                LinkEvent::DeviceDiscovered(case()),
                LinkEvent::GattConnected,
                LinkEvent::GattError { status: 8 },
                LinkEvent::DeviceDiscovered(case()),
                LinkEvent::GattConnected,
                LinkEvent::ServicesDiscovered { trigger_characteristic: false },
                LinkEvent::GattDisconnected,
                LinkEvent::DeviceDiscovered(case()),
                LinkEvent::GattConnected,
                LinkEvent::DisconnectRequested,
                LinkEvent::GattDisconnected,
            ],
        );
        assert!(!m.link_open());
        assert_eq!(m.state(), &ConnectionState::Idle);
    }
}
