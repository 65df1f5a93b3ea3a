//! Bluetooth constants for the focus-switch peripheral.
//!
//! The service and characteristic UUIDs must match the case firmware
//! exactly; the peripheral advertises a single service with one
//! notify-only trigger characteristic.

use uuid::Uuid;

/// Focus-switch service advertised by the case firmware.
pub const FOCUS_SERVICE: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Trigger characteristic carrying the mode payloads.
pub const TRIGGER_CHARACTERISTIC: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// Standard client-characteristic-configuration descriptor, written to
/// enable notifications.
pub const CCC_DESCRIPTOR: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Deadline for a single GATT connect attempt.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(15_000);

    /// Settle delay between connect and service discovery. Discovery races
    /// were observed on some peripherals when started immediately.
    pub const DISCOVERY_SETTLE_DELAY: Duration = Duration::from_millis(600);

    /// Auto-stop window for unfiltered first-pairing scans.
    pub const PAIRING_SCAN_WINDOW: Duration = Duration::from_millis(10_000);

    /// Minimum gap between two accepted trigger messages.
    pub const TRIGGER_DEBOUNCE: Duration = Duration::from_millis(1_000);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_match_firmware_contract() {
        assert_eq!(
            FOCUS_SERVICE.to_string(),
            "4fafc201-1fb5-459e-8fcc-c5c9c331914b"
        );
        assert_eq!(
            TRIGGER_CHARACTERISTIC.to_string(),
            "beb5483e-36e1-4688-b7f5-ea07361b26a8"
        );
        assert_eq!(
            CCC_DESCRIPTOR.to_string(),
            "00002902-0000-1000-8000-00805f9b34fb"
        );
    }
}
