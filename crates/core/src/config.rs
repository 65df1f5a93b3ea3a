//! Settings store.
//!
//! The core consumes three named settings: the current app mode, the last
//! known peripheral address, and the active profile id. The store behind
//! the trait is an external collaborator; a typed JSON-file implementation
//! is provided for headless deployments, replacing the pipe-delimited
//! preference strings the product shipped with.

use crate::error::{FocusError, Result};
use crate::mode::AppMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Current settings-record version.
const SETTINGS_VERSION: u32 = 1;

/// Persisted settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub app_mode: AppMode,
    pub last_peripheral_address: Option<String>,
    pub active_profile_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            app_mode: AppMode::Normal,
            last_peripheral_address: None,
            active_profile_id: None,
            updated_at: Utc::now(),
        }
    }
}

/// Named-settings access used by the core.
pub trait ConfigStore: Send + Sync {
    fn app_mode(&self) -> AppMode;
    fn set_app_mode(&self, mode: AppMode) -> Result<()>;

    fn last_peripheral_address(&self) -> Option<String>;
    fn set_last_peripheral_address(&self, address: &str) -> Result<()>;

    fn active_profile_id(&self) -> Option<String>;
    fn set_active_profile_id(&self, id: Option<&str>) -> Result<()>;
}

/// Default data directory for focuscase files.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("focuscase")
}

/// JSON-file-backed settings store.
pub struct JsonConfigStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl JsonConfigStore {
    /// Open the store at `path`, creating a default record if the file
    /// does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            Settings::default()
        };
        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        if settings.version > SETTINGS_VERSION {
            return Err(FocusError::Store(format!(
                "settings version {} is newer than supported {}",
                settings.version, SETTINGS_VERSION
            )));
        }
        Ok(settings)
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut settings = self.settings.lock().expect("settings lock poisoned");
        apply(&mut settings);
        settings.updated_at = Utc::now();
        self.persist(&settings)
    }
}

impl ConfigStore for JsonConfigStore {
    fn app_mode(&self) -> AppMode {
        self.settings.lock().expect("settings lock poisoned").app_mode
    }

    fn set_app_mode(&self, mode: AppMode) -> Result<()> {
        self.update(|s| s.app_mode = mode)
    }

    fn last_peripheral_address(&self) -> Option<String> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .last_peripheral_address
            .clone()
    }

    fn set_last_peripheral_address(&self, address: &str) -> Result<()> {
        self.update(|s| s.last_peripheral_address = Some(address.to_string()))
    }

    fn active_profile_id(&self) -> Option<String> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .active_profile_id
            .clone()
    }

    fn set_active_profile_id(&self, id: Option<&str>) -> Result<()> {
        self.update(|s| s.active_profile_id = id.map(str::to_string))
    }
}

/// In-memory settings store for tests and embedding.
#[derive(Default)]
pub struct MemoryConfigStore {
    settings: Mutex<Settings>,
}

impl ConfigStore for MemoryConfigStore {
    fn app_mode(&self) -> AppMode {
        self.settings.lock().expect("settings lock poisoned").app_mode
    }

    fn set_app_mode(&self, mode: AppMode) -> Result<()> {
        self.settings.lock().expect("settings lock poisoned").app_mode = mode;
        Ok(())
    }

    fn last_peripheral_address(&self) -> Option<String> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .last_peripheral_address
            .clone()
    }

    fn set_last_peripheral_address(&self, address: &str) -> Result<()> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .last_peripheral_address = Some(address.to_string());
        Ok(())
    }

    fn active_profile_id(&self) -> Option<String> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .active_profile_id
            .clone()
    }

    fn set_active_profile_id(&self, id: Option<&str>) -> Result<()> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .active_profile_id = id.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("focuscase-test-{}", std::process::id()));
        let path = dir.join("settings.json");
        let _ = std::fs::remove_file(&path);

        let store = JsonConfigStore::open(&path).unwrap();
        assert_eq!(store.app_mode(), AppMode::Normal);
        store.set_app_mode(AppMode::Focus).unwrap();
        store.set_last_peripheral_address("AA:BB:CC:DD:EE:FF").unwrap();
        store.set_active_profile_id(Some("p1")).unwrap();

        // Reopen and observe the persisted record.
        let reopened = JsonConfigStore::open(&path).unwrap();
        assert_eq!(reopened.app_mode(), AppMode::Focus);
        assert_eq!(
            reopened.last_peripheral_address().as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert_eq!(reopened.active_profile_id().as_deref(), Some("p1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_newer_settings_version_rejected() {
        let dir = std::env::temp_dir().join(format!("focuscase-vtest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(
            &path,
            r#"{"version":99,"app_mode":"normal","last_peripheral_address":null,"active_profile_id":null,"updated_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(JsonConfigStore::open(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
