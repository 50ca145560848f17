use std::fmt::Display;

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::kv::KeyValueStorage;

/// Every piece of state the store mirrors to storage, one slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    EventLog,
    SleepLog,
    Status,
    LastAction,
}

impl SlotKey {
    pub const ALL: [SlotKey; 4] = [
        SlotKey::EventLog,
        SlotKey::SleepLog,
        SlotKey::Status,
        SlotKey::LastAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKey::EventLog => "event_log",
            SlotKey::SleepLog => "sleep_log",
            SlotKey::Status => "status",
            SlotKey::LastAction => "last_action",
        }
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reads and decodes a slot. Failures are logged and read as `None`, so callers fall back to
/// their defaults. A snapshot that doesn't parse is treated the same as one that can't be read.
pub async fn read_slot<T: DeserializeOwned>(
    storage: &impl KeyValueStorage,
    key: SlotKey,
) -> Option<T> {
    let raw = match storage.get(key.as_str()).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("Slot {key} is empty");
            return None;
        }
        Err(e) => {
            error!("Failed to read slot {key}: {e:?}");
            return None;
        }
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Slot {key} holds an illegal snapshot, using defaults: {e}");
            None
        }
    }
}
