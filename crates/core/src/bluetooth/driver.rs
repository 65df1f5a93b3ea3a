//! btleplug driver - executes [`LinkCommand`]s and feeds adapter activity
//! back into the state machine as [`LinkEvent`]s.
//!
//! The driver owns the only GATT handle in the process. It never makes
//! connection decisions itself; everything it does is a command from the
//! [`ConnectionManager`](super::ConnectionManager), and everything the
//! adapter reports goes back through the same event queue.

use super::constants::{FOCUS_SERVICE, TRIGGER_CHARACTERISTIC};
use super::events::{DiscoveryMode, LinkCommand, LinkEvent, PeripheralHandle};
use crate::error::{FocusError, Result};
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Platform BLE driver. Create with [`BleDriver::new`], then hand it a
/// command receiver via [`BleDriver::run`].
pub struct BleDriver {
    adapter: Adapter,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    /// The single open peripheral handle, if any.
    peripheral: Option<Peripheral>,
    /// Id of the open peripheral, shared with the central-event pump so
    /// that foreign disconnect reports are not mistaken for ours.
    open_id: Arc<Mutex<Option<PeripheralId>>>,
    notify_task: Option<JoinHandle<()>>,
    connect_task: Option<JoinHandle<()>>,
    pump_task: JoinHandle<()>,
}

impl BleDriver {
    /// Open the first Bluetooth adapter and start the central-event pump.
    pub async fn new(link_tx: mpsc::UnboundedSender<LinkEvent>) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_| FocusError::AdapterUnavailable)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|_| FocusError::AdapterUnavailable)?
            .into_iter()
            .next()
            .ok_or(FocusError::AdapterUnavailable)?;

        let open_id = Arc::new(Mutex::new(None));
        let pump_task = Self::spawn_event_pump(adapter.clone(), link_tx.clone(), Arc::clone(&open_id)).await?;

        Ok(Self {
            adapter,
            link_tx,
            peripheral: None,
            open_id,
            notify_task: None,
            connect_task: None,
            pump_task,
        })
    }

    /// Forward adapter activity into the event queue for the lifetime of
    /// the driver.
    async fn spawn_event_pump(
        adapter: Adapter,
        link_tx: mpsc::UnboundedSender<LinkEvent>,
        open_id: Arc<Mutex<Option<PeripheralId>>>,
    ) -> Result<JoinHandle<()>> {
        let mut events = adapter
            .events()
            .await
            .map_err(|_| FocusError::AdapterUnavailable)?;
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDiscovered(id) => {
                        let Ok(peripheral) = adapter.peripheral(&id).await else {
                            continue;
                        };
                        let name = peripheral
                            .properties()
                            .await
                            .ok()
                            .flatten()
                            .and_then(|p| p.local_name);
                        let handle = PeripheralHandle {
                            address: peripheral.address().to_string(),
                            name,
                        };
                        let _ = link_tx.send(LinkEvent::DeviceDiscovered(handle));
                    }
                    CentralEvent::DeviceDisconnected(id) => {
                        let ours = open_id
                            .lock()
                            .ok()
                            .map(|guard| guard.as_ref() == Some(&id))
                            .unwrap_or(false);
                        if ours {
                            let _ = link_tx.send(LinkEvent::GattDisconnected);
                        }
                    }
                    _ => {}
                }
            }
            debug!("central event stream ended");
        }))
    }

    /// Execute commands until the channel closes.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<LinkCommand>) {
        while let Some(command) = commands.recv().await {
            self.execute(command).await;
        }
        self.pump_task.abort();
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
    }

    async fn execute(&mut self, command: LinkCommand) {
        debug!(?command, "executing link command");
        match command {
            LinkCommand::StartScan { mode } => self.start_scan(mode).await,
            LinkCommand::StopScan => {
                if let Err(e) = self.adapter.stop_scan().await {
                    warn!("stop_scan failed: {}", e);
                }
            }
            LinkCommand::Connect(handle) => self.connect(handle).await,
            LinkCommand::CloseLink => self.close_link(),
            LinkCommand::ScheduleDiscovery { settle } => self.schedule_discovery(settle),
            LinkCommand::EnableNotifications => self.enable_notifications().await,
            LinkCommand::ArmConnectTimeout { generation, after } => {
                let tx = self.link_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(LinkEvent::ConnectTimeout { generation });
                });
            }
            LinkCommand::ArmScanWindow { generation, after } => {
                let tx = self.link_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(LinkEvent::ScanWindowElapsed { generation });
                });
            }
            // Persistence is handled by the supervisor before commands
            // reach the driver.
            LinkCommand::PersistLastDevice { .. } => {}
        }
    }

    async fn start_scan(&mut self, mode: DiscoveryMode) {
        let filter = match mode {
            DiscoveryMode::TargetService => ScanFilter {
                services: vec![FOCUS_SERVICE],
            },
            DiscoveryMode::AnyDevice => ScanFilter::default(),
        };
        if let Err(e) = self.adapter.start_scan(filter).await {
            warn!("start_scan failed: {}", e);
            let _ = self.link_tx.send(LinkEvent::ScanFailed { code: -1 });
        }
    }

    async fn connect(&mut self, handle: PeripheralHandle) {
        let peripheral = match self.find_peripheral(&handle.address).await {
            Some(p) => p,
            None => {
                warn!("peripheral {} no longer visible", handle.address);
                let _ = self.link_tx.send(LinkEvent::GattError { status: -1 });
                return;
            }
        };
        if let Ok(mut guard) = self.open_id.lock() {
            *guard = Some(peripheral.id());
        }
        self.peripheral = Some(peripheral.clone());

        // The connect may hang until the manager's deadline fires, so it
        // must not block command execution.
        let tx = self.link_tx.clone();
        self.connect_task = Some(tokio::spawn(async move {
            match peripheral.connect().await {
                Ok(()) => {
                    let _ = tx.send(LinkEvent::GattConnected);
                }
                Err(e) => {
                    warn!("connect to {} failed: {}", handle.address, e);
                    let _ = tx.send(LinkEvent::GattError { status: -1 });
                }
            }
        }));
    }

    async fn find_peripheral(&self, address: &str) -> Option<Peripheral> {
        let peripherals = self.adapter.peripherals().await.ok()?;
        for peripheral in peripherals {
            if peripheral.address().to_string().eq_ignore_ascii_case(address) {
                return Some(peripheral);
            }
        }
        None
    }

    fn close_link(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Ok(mut guard) = self.open_id.lock() {
            *guard = None;
        }
        let Some(peripheral) = self.peripheral.take() else {
            return;
        };
        let tx = self.link_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = peripheral.disconnect().await {
                debug!("disconnect failed: {}", e);
            }
            // Confirm the close whether or not the stack cooperated; the
            // handle is dropped either way.
            let _ = tx.send(LinkEvent::GattDisconnected);
        });
    }

    fn schedule_discovery(&mut self, settle: std::time::Duration) {
        let Some(peripheral) = self.peripheral.clone() else {
            warn!("discovery scheduled without an open handle");
            return;
        };
        let tx = self.link_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            match peripheral.discover_services().await {
                Ok(()) => {
                    let found = peripheral
                        .characteristics()
                        .iter()
                        .any(|c| c.uuid == TRIGGER_CHARACTERISTIC);
                    let _ = tx.send(LinkEvent::ServicesDiscovered {
                        trigger_characteristic: found,
                    });
                }
                Err(e) => {
                    warn!("service discovery failed: {}", e);
                    let _ = tx.send(LinkEvent::GattError { status: -1 });
                }
            }
        });
    }

    async fn enable_notifications(&mut self) {
        let Some(peripheral) = self.peripheral.clone() else {
            warn!("notification enable without an open handle");
            return;
        };
        let Some(characteristic) = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == TRIGGER_CHARACTERISTIC)
        else {
            let _ = self.link_tx.send(LinkEvent::ServicesDiscovered {
                trigger_characteristic: false,
            });
            return;
        };

        // subscribe() writes the CCC descriptor for us.
        if let Err(e) = peripheral.subscribe(&characteristic).await {
            warn!("subscribe failed: {}", e);
            let _ = self.link_tx.send(LinkEvent::GattError { status: -1 });
            return;
        }
        let _ = self.link_tx.send(LinkEvent::NotificationsEnabled);

        let notifications = match peripheral.notifications().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("notification stream unavailable: {}", e);
                let _ = self.link_tx.send(LinkEvent::GattError { status: -1 });
                return;
            }
        };
        let tx = self.link_tx.clone();
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        self.notify_task = Some(tokio::spawn(async move {
            let mut notifications = notifications;
            while let Some(data) = notifications.next().await {
                if data.uuid == TRIGGER_CHARACTERISTIC {
                    let _ = tx.send(LinkEvent::Notification(data.value));
                }
            }
            debug!("notification stream ended");
        }));
    }
}
