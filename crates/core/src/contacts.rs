//! Contact number cache.
//!
//! Maps the active profile's allowed contact ids to their canonicalized
//! phone numbers so the call gate never queries the directory per call.
//! Rebuilds construct a fresh map and swap it in as a single `Arc`
//! reference update; readers clone the reference out and only ever observe
//! a complete map, old or new.

use crate::error::{FocusError, Result};
use crate::numbers::{are_same, canonicalize, NormalizedNumber};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Identifier of a contact in the platform address book.
pub type ContactId = String;

type NumberMap = HashMap<ContactId, HashSet<NormalizedNumber>>;

/// Resolves a contact id to its raw phone numbers. Implemented by the
/// platform address-book collaborator; may block, so it is only called
/// from the rebuild worker.
pub trait ContactResolver: Send + Sync {
    fn phone_numbers(&self, contact_id: &str) -> Result<Vec<String>>;
}

/// Whitelist cache read concurrently by the call gate and rebuilt
/// wholesale whenever the allowed-contact set changes.
pub struct ContactNumberCache {
    map: RwLock<Arc<NumberMap>>,
    region: String,
}

impl ContactNumberCache {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            map: RwLock::new(Arc::new(NumberMap::new())),
            region: region.into(),
        }
    }

    /// Rebuild the cache for the given allowed-contact set. Resolution
    /// failures for individual contacts are skipped; the remaining
    /// contacts still make it into the new map. Last rebuild wins.
    pub fn rebuild(&self, contact_ids: &HashSet<ContactId>, resolver: &dyn ContactResolver) {
        let mut fresh = NumberMap::with_capacity(contact_ids.len());
        for contact_id in contact_ids {
            let numbers = match resolver.phone_numbers(contact_id) {
                Ok(numbers) => numbers,
                Err(e) => {
                    warn!("skipping contact {}: {}", contact_id, e);
                    continue;
                }
            };
            let canonical: HashSet<NormalizedNumber> = numbers
                .iter()
                .filter_map(|raw| canonicalize(raw, &self.region))
                .collect();
            if !canonical.is_empty() {
                fresh.insert(contact_id.clone(), canonical);
            }
        }
        debug!(
            "contact number cache rebuilt: {} contacts with numbers",
            fresh.len()
        );
        // Atomic swap: readers holding the old Arc keep a complete map.
        *self.map.write().expect("cache lock poisoned") = Arc::new(fresh);
    }

    /// Complete-map snapshot for the read path.
    pub fn snapshot(&self) -> Arc<NumberMap> {
        Arc::clone(&self.map.read().expect("cache lock poisoned"))
    }

    /// True iff the incoming number region-aware-matches any cached
    /// number. An empty cache deterministically yields `false`.
    pub fn contains(&self, incoming_number: &str) -> bool {
        let Some(incoming) = canonicalize(incoming_number, &self.region) else {
            return false;
        };
        let snapshot = self.snapshot();
        snapshot
            .values()
            .any(|numbers| numbers.iter().any(|n| are_same(n, &incoming)))
    }
}

/// Convenience resolver error constructor used by boundary impls.
pub fn resolution_error(contact_id: &str, message: impl Into<String>) -> FocusError {
    FocusError::Resolution {
        contact_id: contact_id.to_string(),
        message: message.into(),
    }
}
