use std::fmt::Display;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{entities::SleepRecord, log::EventLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTransition {
    Sleep,
    Wake,
}

impl Display for SleepTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SleepTransition::Sleep => write!(f, "sleep"),
            SleepTransition::Wake => write!(f, "wake"),
        }
    }
}

/// Sleep always opens a new record. Wake closes the newest record if it is still open, otherwise
/// it starts a wake-only record. Older open records are never looked at, so pressing sleep twice
/// leaves two open records behind.
pub fn apply_transition(
    log: &mut EventLog<SleepRecord>,
    transition: SleepTransition,
    at: DateTime<Utc>,
    id: i64,
) -> SleepRecord {
    let record = match transition {
        SleepTransition::Wake => {
            if let Some(head) = log.newest_mut().filter(|v| v.is_open()) {
                head.set_wake(at);
                return head.clone();
            }
            SleepRecord::awake(id, at)
        }
        SleepTransition::Sleep => {
            let already_open = log.iter().filter(|v| v.is_open()).count();
            if already_open > 0 {
                warn!("Recording sleep while {already_open} record(s) are still open");
            }
            SleepRecord::asleep(id, at)
        }
    };
    log.push(record.clone());
    record
}
