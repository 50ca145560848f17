use std::fmt::Display;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{clock::Clock, time::format_span};

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Unlock,
    Sleep,
    Wake,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Unlock => write!(f, "unlock"),
            EventKind::Sleep => write!(f, "sleep"),
            EventKind::Wake => write!(f, "wake"),
        }
    }
}

/// Whether an event was triggered by the user or by the app coming back to the foreground.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Manual,
    Foreground,
}

impl Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Manual => write!(f, "manual"),
            EventSource::Foreground => write!(f, "foreground"),
        }
    }
}

/// A single timestamped occurrence. Only the instant is stored, everything shown to the user is
/// derived from it when read.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub id: i64,
    pub kind: EventKind,
    #[serde(default = "default_source")]
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
}

fn default_source() -> EventSource {
    EventSource::Manual
}

/// Local projections of an [Event].
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct EventDisplay {
    pub time: String,
    pub date: String,
    pub day_of_week: String,
}

impl Event {
    pub fn local(&self, clock: &dyn Clock) -> DateTime<FixedOffset> {
        clock.local(self.timestamp)
    }

    pub fn local_date(&self, clock: &dyn Clock) -> NaiveDate {
        self.local(clock).date_naive()
    }

    pub fn display(&self, clock: &dyn Clock) -> EventDisplay {
        let local = self.local(clock);
        EventDisplay {
            time: local.format("%H:%M:%S").to_string(),
            date: local.format("%Y-%m-%d").to_string(),
            day_of_week: local.format("%A").to_string(),
        }
    }
}

/// A sleep/wake pair. Either side may be missing; `duration` only exists once both are set.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct SleepRecord {
    pub id: i64,
    pub sleep_timestamp: Option<DateTime<Utc>>,
    pub wake_timestamp: Option<DateTime<Utc>>,
    #[serde(with = "optional_duration_ser", default)]
    pub duration: Option<Duration>,
}

impl SleepRecord {
    pub fn asleep(id: i64, at: DateTime<Utc>) -> Self {
        Self {
            id,
            sleep_timestamp: Some(at),
            wake_timestamp: None,
            duration: None,
        }
    }

    pub fn awake(id: i64, at: DateTime<Utc>) -> Self {
        Self {
            id,
            sleep_timestamp: None,
            wake_timestamp: Some(at),
            duration: None,
        }
    }

    /// Open records are waiting for a wake time.
    pub fn is_open(&self) -> bool {
        self.wake_timestamp.is_none()
    }

    pub fn set_wake(&mut self, at: DateTime<Utc>) {
        self.wake_timestamp = Some(at);
        self.recompute_duration();
    }

    fn recompute_duration(&mut self) {
        self.duration = match (self.sleep_timestamp, self.wake_timestamp) {
            (Some(sleep), Some(wake)) => Some(wake - sleep),
            _ => None,
        };
    }

    /// The date a record belongs to: the night it started, or the morning if the sleep side is
    /// unknown.
    pub fn local_date(&self, clock: &dyn Clock) -> Option<NaiveDate> {
        self.sleep_timestamp
            .or(self.wake_timestamp)
            .map(|v| clock.local(v).date_naive())
    }

    pub fn duration_label(&self) -> Option<String> {
        self.duration.map(format_span)
    }
}

mod optional_duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(v) => serializer.serialize_some(&v.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<i64>::deserialize(deserializer)?;
        Ok(s.map(Duration::seconds))
    }
}

/// Cached summary of the latest recording, kept in its own slot.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct LastAction {
    pub kind: EventKind,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
}

impl From<&Event> for LastAction {
    fn from(event: &Event) -> Self {
        LastAction {
            kind: event.kind,
            source: event.source,
            timestamp: event.timestamp,
        }
    }
}

/// Gates whether foreground transitions are recorded.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Tracking,
    Paused,
}

impl TrackingState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            TrackingState::Tracking
        } else {
            TrackingState::Paused
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingState::Tracking)
    }
}

impl Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Tracking => write!(f, "tracking"),
            TrackingState::Paused => write!(f, "paused"),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct StatusSnapshot {
    pub tracking: TrackingState,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{Event, EventKind, EventSource, SleepRecord};

    const NIGHT: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
    );

    #[test]
    fn test_sleep_record_duration_only_when_paired() {
        let sleep = Utc.from_utc_datetime(&NIGHT);
        let mut record = SleepRecord::asleep(1, sleep);
        assert!(record.is_open());
        assert_eq!(record.duration, None);

        record.set_wake(sleep + Duration::minutes(450));
        assert!(!record.is_open());
        assert_eq!(record.duration, Some(Duration::minutes(450)));
        assert_eq!(record.duration_label().as_deref(), Some("7h 30m"));
    }

    #[test]
    fn test_sleep_record_storage_format() -> anyhow::Result<()> {
        let sleep = Utc.from_utc_datetime(&NIGHT);
        let mut record = SleepRecord::asleep(1, sleep);
        record.set_wake(sleep + Duration::hours(8));

        let json = serde_json::to_value(&record)?;
        assert_eq!(json["duration"], 8 * 60 * 60);
        assert_eq!(json["sleep_timestamp"], "2024-04-05T23:00:00Z");
        Ok(())
    }

    #[test]
    fn test_event_without_source_reads_as_manual() -> anyhow::Result<()> {
        let event: Event = serde_json::from_str(
            r#"{"id":1,"kind":"unlock","timestamp":"2024-04-05T23:00:00Z"}"#,
        )?;
        assert_eq!(event.kind, EventKind::Unlock);
        assert_eq!(event.source, EventSource::Manual);
        Ok(())
    }
}
