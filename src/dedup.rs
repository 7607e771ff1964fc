//! Delivery deduplication.
//!
//! The same logical gift wrap routinely arrives from several relays; each
//! distinct event id must be processed at most once per listener instance.

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of event ids this listener has already admitted.
///
/// Owned by one listener instance, never shared process-wide, discarded on
/// teardown. The check-and-insert is a single critical section so a race on
/// the same id can never admit it twice.
#[derive(Debug, Default)]
pub struct SeenEvents {
    ids: Mutex<HashSet<String>>,
}

impl SeenEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an event id. Returns true iff this is the first admission of
    /// that id; later calls with the same id return false with no other
    /// side effect. Callers reject empty ids before reaching here.
    pub fn admit(&self, id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(id.to_string())
    }

    /// Number of ids admitted so far.
    pub fn len(&self) -> usize {
        let ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
