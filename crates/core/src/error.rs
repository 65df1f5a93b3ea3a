//! Error taxonomy for the focus-case core.
//!
//! Link-level failures are non-fatal by design: the connection manager
//! answers every one of them with a rescan. The variants here exist so
//! boundary implementations and logs can say precisely what went wrong.

use thiserror::Error;

/// Errors produced by the focus-case core and its boundary traits.
#[derive(Debug, Error)]
pub enum FocusError {
    /// No usable Bluetooth adapter on this host.
    #[error("no Bluetooth adapter available")]
    AdapterUnavailable,

    /// The adapter refused to start scanning.
    #[error("scan failed with adapter code {0}")]
    ScanFailed(i32),

    /// A GATT connect attempt exceeded its deadline.
    #[error("connect attempt timed out")]
    ConnectTimeout,

    /// A GATT connect attempt failed outright.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A GATT operation reported an error status.
    #[error("gatt error status {0}")]
    Gatt(i32),

    /// Service discovery completed without the trigger characteristic.
    #[error("trigger characteristic not found on peripheral")]
    CharacteristicMissing,

    /// A contact could not be resolved to phone numbers.
    #[error("failed to resolve contact {contact_id}: {message}")]
    Resolution { contact_id: String, message: String },

    /// The settings store rejected a read or write.
    #[error("settings store error: {0}")]
    Store(String),

    /// [`FocusCore::start`](crate::FocusCore::start) was called twice.
    #[error("core already started")]
    AlreadyStarted,

    /// An internal channel closed during shutdown.
    #[error("link channel closed")]
    ChannelClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FocusError {
    /// True for failures the connection manager recovers from by
    /// rescanning rather than surfacing to the caller.
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            FocusError::ScanFailed(_)
                | FocusError::ConnectTimeout
                | FocusError::ConnectFailed(_)
                | FocusError::Gatt(_)
                | FocusError::CharacteristicMissing
        )
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_errors_are_classified() {
        assert!(FocusError::ConnectTimeout.is_link_error());
        assert!(FocusError::Gatt(133).is_link_error());
        assert!(FocusError::CharacteristicMissing.is_link_error());
        assert!(!FocusError::AdapterUnavailable.is_link_error());
        assert!(!FocusError::Store("full".into()).is_link_error());
    }

    #[test]
    fn test_display_names_the_failure() {
        let e = FocusError::Resolution {
            contact_id: "C7".into(),
            message: "cursor closed".into(),
        };
        assert_eq!(e.to_string(), "failed to resolve contact C7: cursor closed");
        assert_eq!(FocusError::Gatt(8).to_string(), "gatt error status 8");
    }
}
