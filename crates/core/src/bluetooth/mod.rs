//! Bluetooth Low Energy link to the focus-switch case.

pub mod constants;
pub mod events;
pub mod manager;

#[cfg(feature = "bluetooth")]
pub mod driver;

pub use events::{ConnectionEvent, DiscoveryMode, LinkCommand, LinkEvent, PeripheralHandle};
pub use manager::{ConnectionManager, ConnectionState};

#[cfg(feature = "bluetooth")]
pub use driver::BleDriver;
