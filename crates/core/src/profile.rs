//! Profile snapshot types.
//!
//! Profiles are created and edited by the presentation layer; this core
//! only reads the active profile's call-policy fields and is told when
//! they change. The store behind the trait is an external collaborator.

use crate::contacts::ContactId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;

/// Identifier of an application in the profile's allow-list.
pub type AppId = String;

/// A named focus profile ("space").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app_allow_list: HashSet<AppId>,
    #[serde(default)]
    pub dnd_enabled: bool,
    #[serde(default)]
    pub call_blocking_enabled: bool,
    #[serde(default)]
    pub allowed_contact_ids: HashSet<ContactId>,
}

/// Read-only view of the profile store. The core pulls a fresh snapshot
/// whenever it is notified of a change.
pub trait ProfileStore: Send + Sync {
    /// Snapshot of the currently active profile, if one is selected.
    fn active_profile(&self) -> Option<Profile>;
}

/// In-memory profile store for tests and embedding.
#[derive(Default)]
pub struct MemoryProfileStore {
    active: Mutex<Option<Profile>>,
}

impl MemoryProfileStore {
    pub fn with_active(profile: Profile) -> Self {
        Self {
            active: Mutex::new(Some(profile)),
        }
    }

    pub fn set_active(&self, profile: Option<Profile>) {
        *self.active.lock().expect("profile lock poisoned") = profile;
    }
}

impl ProfileStore for MemoryProfileStore {
    fn active_profile(&self) -> Option<Profile> {
        self.active.lock().expect("profile lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = Profile {
            id: "p1".into(),
            name: "Deep Work".into(),
            app_allow_list: ["com.example.notes".to_string()].into_iter().collect(),
            dnd_enabled: true,
            call_blocking_enabled: true,
            allowed_contact_ids: ["C1".to_string()].into_iter().collect(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_missing_policy_fields_default_off() {
        let profile: Profile =
            serde_json::from_str(r#"{"id":"p1","name":"Minimal"}"#).unwrap();
        assert!(!profile.call_blocking_enabled);
        assert!(!profile.dnd_enabled);
        assert!(profile.allowed_contact_ids.is_empty());
    }
}
