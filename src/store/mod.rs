//! The event log store. It is the single owner of everything the app knows:
//!  - a bounded, newest-first log of unlock events,
//!  - an unbounded, newest-first log of sleep records,
//!  - the tracking flag and the last-action cache.
//!
//! Every mutation updates memory first and then queues a full snapshot of the touched slots for
//! the [PersistenceModule](crate::persistence::PersistenceModule). The in-memory state stays
//! authoritative no matter how persistence goes.

pub mod entities;
pub mod log;
pub mod sleep;
pub mod views;

use chrono::{DateTime, NaiveDate, Utc};
use entities::{Event, EventKind, EventSource, LastAction, SleepRecord, StatusSnapshot, TrackingState};
use log::EventLog;
use serde::Serialize;
use sleep::SleepTransition;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use views::{DailySummary, DayGroup};

use crate::{
    persistence::command::PersistCommand,
    storage::{
        kv::KeyValueStorage,
        slots::{read_slot, SlotKey},
    },
    utils::clock::Clock,
};

pub const DEFAULT_EVENT_RETENTION: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub event_retention: Option<usize>,
    pub sleep_retention: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_retention: Some(DEFAULT_EVENT_RETENTION),
            sleep_retention: None,
        }
    }
}

pub struct EventLogStore {
    events: EventLog<Event>,
    sleep_records: EventLog<SleepRecord>,
    tracking: TrackingState,
    last_action: Option<LastAction>,
    clock: Box<dyn Clock>,
    persist: UnboundedSender<PersistCommand>,
}

impl EventLogStore {
    /// Creates an empty store.
    pub fn new(
        clock: Box<dyn Clock>,
        config: StoreConfig,
        persist: UnboundedSender<PersistCommand>,
    ) -> Self {
        Self {
            events: EventLog::new(config.event_retention),
            sleep_records: EventLog::new(config.sleep_retention),
            tracking: TrackingState::default(),
            last_action: None,
            clock,
            persist,
        }
    }

    /// Restores a store from storage. Each slot falls back to its default on its own when it
    /// can't be read.
    pub async fn load(
        storage: &impl KeyValueStorage,
        clock: Box<dyn Clock>,
        config: StoreConfig,
        persist: UnboundedSender<PersistCommand>,
    ) -> Self {
        let events = read_slot::<Vec<Event>>(storage, SlotKey::EventLog)
            .await
            .unwrap_or_default();
        let sleep_records = read_slot::<Vec<SleepRecord>>(storage, SlotKey::SleepLog)
            .await
            .unwrap_or_default();
        let status = read_slot::<StatusSnapshot>(storage, SlotKey::Status)
            .await
            .unwrap_or_default();
        let last_action = read_slot::<Option<LastAction>>(storage, SlotKey::LastAction)
            .await
            .flatten();

        info!(
            "Loaded {} events and {} sleep records, {}",
            events.len(),
            sleep_records.len(),
            status.tracking
        );

        Self {
            events: EventLog::from_entries(events, config.event_retention),
            sleep_records: EventLog::from_entries(sleep_records, config.sleep_retention),
            tracking: status.tracking,
            last_action,
            clock,
            persist,
        }
    }

    pub fn events(&self) -> &[Event] {
        self.events.entries()
    }

    pub fn sleep_records(&self) -> &[SleepRecord] {
        self.sleep_records.entries()
    }

    pub fn last_action(&self) -> Option<&LastAction> {
        self.last_action.as_ref()
    }

    pub fn tracking(&self) -> TrackingState {
        self.tracking
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn open_sleep_records(&self) -> usize {
        self.sleep_records.iter().filter(|v| v.is_open()).count()
    }

    /// Stamps a new event with the current time and puts it at the head of the log.
    pub fn record_event(&mut self, kind: EventKind, source: EventSource) -> Event {
        let timestamp = self.clock.time();
        let event = Event {
            id: next_id(self.events.newest().map(|v| v.id), timestamp),
            kind,
            source,
            timestamp,
        };
        let dropped = self.events.push(event.clone());
        if dropped > 0 {
            debug!("Dropped {dropped} events past retention");
        }
        debug!("Recorded event {:?}", event);

        self.last_action = Some(LastAction::from(&event));
        self.persist_events();
        self.persist_last_action();
        event
    }

    /// Records an unlock caused by the app coming to the foreground. Nothing is recorded while
    /// tracking is paused.
    pub fn record_foreground(&mut self) -> Option<Event> {
        if !self.tracking.is_tracking() {
            debug!("Tracking is paused, ignoring foreground transition");
            return None;
        }
        Some(self.record_event(EventKind::Unlock, EventSource::Foreground))
    }

    pub fn record_sleep_transition(&mut self, transition: SleepTransition) -> SleepRecord {
        let timestamp = self.clock.time();
        let id = next_id(self.sleep_records.newest().map(|v| v.id), timestamp);
        let record = sleep::apply_transition(&mut self.sleep_records, transition, timestamp, id);
        debug!("Recorded {transition} into {:?}", record);

        let kind = match transition {
            SleepTransition::Sleep => EventKind::Sleep,
            SleepTransition::Wake => EventKind::Wake,
        };
        self.last_action = Some(LastAction {
            kind,
            source: EventSource::Manual,
            timestamp,
        });
        self.persist_sleep_records();
        self.persist_last_action();
        record
    }

    pub fn set_tracking(&mut self, enabled: bool) {
        let tracking = TrackingState::from_enabled(enabled);
        if tracking != self.tracking {
            info!("Tracking changed from {} to {}", self.tracking, tracking);
        }
        self.tracking = tracking;
        self.persist_status();
    }

    /// Forgets everything, in memory and in storage.
    pub fn clear_all(&mut self) {
        info!(
            "Clearing {} events and {} sleep records",
            self.events.len(),
            self.sleep_records.len()
        );
        self.events.clear();
        self.sleep_records.clear();
        self.tracking = TrackingState::default();
        self.last_action = None;
        for key in SlotKey::ALL {
            self.send(PersistCommand::Remove { key });
        }
    }

    pub fn group_by_day(&self) -> Vec<DayGroup> {
        views::group_by_day(self.events.iter(), self.clock.as_ref())
    }

    pub fn daily_summary(&self, date: NaiveDate) -> Option<DailySummary> {
        let day = self
            .events
            .iter()
            .filter(|v| v.local_date(self.clock.as_ref()) == date)
            .cloned()
            .collect::<Vec<_>>();
        views::daily_summary(&day)
    }

    pub fn today_count(&self) -> usize {
        views::today_count(self.events.iter(), self.clock.as_ref())
    }

    fn persist_events(&self) {
        self.persist_snapshot(SlotKey::EventLog, self.events.entries());
    }

    fn persist_sleep_records(&self) {
        self.persist_snapshot(SlotKey::SleepLog, self.sleep_records.entries());
    }

    fn persist_status(&self) {
        self.persist_snapshot(
            SlotKey::Status,
            &StatusSnapshot {
                tracking: self.tracking,
            },
        );
    }

    fn persist_last_action(&self) {
        self.persist_snapshot(SlotKey::LastAction, &self.last_action);
    }

    fn persist_snapshot<T: Serialize + ?Sized>(&self, key: SlotKey, value: &T) {
        match serde_json::to_string(value) {
            Ok(snapshot) => self.send(PersistCommand::Write { key, snapshot }),
            Err(e) => error!("Failed to serialize slot {key}: {e}"),
        }
    }

    fn send(&self, command: PersistCommand) {
        if let Err(e) = self.persist.send(command) {
            warn!("Persistence is not running, slot {} stays stale", e.0.key());
        }
    }
}

/// Ids come from wall-clock milliseconds, bumped past the newest id when the clock hasn't moved
/// or went backwards.
fn next_id(newest: Option<i64>, now: DateTime<Utc>) -> i64 {
    let candidate = now.timestamp_millis();
    match newest {
        Some(newest) if newest >= candidate => newest + 1,
        Some(_) | None => candidate,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::{
        persistence::{command::PersistCommand, writer::StorageWriter, PersistenceModule},
        storage::{
            kv::{KeyValueStorage, MemoryKeyValueStorage},
            slots::SlotKey,
        },
        utils::{clock::ManualClock, logging::TEST_LOGGING},
    };

    use super::{
        entities::{EventKind, EventSource, TrackingState},
        sleep::SleepTransition,
        EventLogStore, StoreConfig,
    };

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(
            date,
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        ))
    }

    fn test_store(
        start: DateTime<Utc>,
        config: StoreConfig,
    ) -> (EventLogStore, ManualClock, UnboundedReceiver<PersistCommand>) {
        let clock = ManualClock::utc(start);
        let (sender, receiver) = mpsc::unbounded_channel();
        let store = EventLogStore::new(Box::new(clock.clone()), config, sender);
        (store, clock, receiver)
    }

    fn drain(receiver: &mut UnboundedReceiver<PersistCommand>) -> Vec<PersistCommand> {
        let mut commands = vec![];
        while let Ok(command) = receiver.try_recv() {
            commands.push(command);
        }
        commands
    }

    #[test]
    fn test_record_event_newest_first_within_bound() {
        let config = StoreConfig {
            event_retention: Some(5),
            ..Default::default()
        };
        let (mut store, clock, _receiver) = test_store(at(TEST_DATE, 8, 0), config);

        let mut recorded = vec![];
        for _ in 0..12 {
            recorded.push(store.record_event(EventKind::Unlock, EventSource::Manual));
            clock.advance(Duration::minutes(1));
            assert!(store.events().len() <= 5);
        }

        assert_eq!(store.events().len(), 5);
        assert!(store
            .events()
            .windows(2)
            .all(|pair| pair[0].timestamp > pair[1].timestamp && pair[0].id > pair[1].id));
        recorded.reverse();
        assert_eq!(store.events(), &recorded[..5]);
    }

    #[test]
    fn test_default_retention_is_one_thousand() {
        let (mut store, _clock, _receiver) = test_store(at(TEST_DATE, 8, 0), StoreConfig::default());
        for _ in 0..1005 {
            store.record_event(EventKind::Unlock, EventSource::Manual);
        }
        assert_eq!(store.events().len(), 1000);
    }

    #[test]
    fn test_ids_stay_unique_when_clock_stands_still() {
        let (mut store, _clock, _receiver) = test_store(at(TEST_DATE, 8, 0), StoreConfig::default());
        let a = store.record_event(EventKind::Unlock, EventSource::Manual);
        let b = store.record_event(EventKind::Unlock, EventSource::Manual);
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(b.id, a.id + 1);
    }

    #[test]
    fn test_record_event_persists_log_and_last_action() -> Result<()> {
        let (mut store, _clock, mut receiver) =
            test_store(at(TEST_DATE, 8, 0), StoreConfig::default());

        let event = store.record_event(EventKind::Unlock, EventSource::Manual);

        let commands = drain(&mut receiver);
        assert_eq!(
            commands.iter().map(PersistCommand::key).collect::<Vec<_>>(),
            vec![SlotKey::EventLog, SlotKey::LastAction]
        );
        let PersistCommand::Write { snapshot, .. } = &commands[0] else {
            panic!("Expected a write, got {:?}", commands[0]);
        };
        let stored: Vec<super::entities::Event> = serde_json::from_str(snapshot)?;
        assert_eq!(stored, vec![event]);
        Ok(())
    }

    #[test]
    fn test_sleep_then_wake_through_store() {
        let (mut store, clock, _receiver) = test_store(at(TEST_DATE, 23, 0), StoreConfig::default());

        store.record_sleep_transition(SleepTransition::Sleep);
        assert_eq!(store.open_sleep_records(), 1);
        clock.set(at(TEST_DATE.succ_opt().unwrap(), 6, 30));
        let record = store.record_sleep_transition(SleepTransition::Wake);

        assert_eq!(store.sleep_records().len(), 1);
        assert_eq!(store.open_sleep_records(), 0);
        assert_eq!(record.duration_label().as_deref(), Some("7h 30m"));
        assert_eq!(store.last_action().map(|v| v.kind), Some(EventKind::Wake));
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_nights_pair_up_after_stray_wake() {
        let (mut store, clock, _receiver) = test_store(at(TEST_DATE, 7, 0), StoreConfig::default());

        store.record_sleep_transition(SleepTransition::Wake);
        clock.set(at(TEST_DATE, 23, 0));
        store.record_sleep_transition(SleepTransition::Sleep);
        clock.set(at(TEST_DATE.succ_opt().unwrap(), 7, 0));
        let night = store.record_sleep_transition(SleepTransition::Wake);

        assert_eq!(night.duration_label().as_deref(), Some("8h 0m"));
        assert_eq!(store.sleep_records().len(), 2);
        assert_eq!(store.sleep_records()[0], night);
        assert_eq!(store.open_sleep_records(), 0);

        clock.set(at(TEST_DATE.succ_opt().unwrap(), 22, 30));
        store.record_sleep_transition(SleepTransition::Sleep);
        clock.advance(Duration::hours(7) + Duration::minutes(45));
        let next_night = store.record_sleep_transition(SleepTransition::Wake);

        assert_eq!(next_night.duration_label().as_deref(), Some("7h 45m"));
        assert_eq!(store.sleep_records().len(), 3);
    }

    #[test]
    fn test_tracking_gates_foreground_only() {
        let (mut store, _clock, _receiver) = test_store(at(TEST_DATE, 8, 0), StoreConfig::default());

        assert_eq!(store.tracking(), TrackingState::Tracking);
        assert!(store.record_foreground().is_some());

        store.set_tracking(false);
        assert_eq!(store.tracking(), TrackingState::Paused);
        assert!(store.record_foreground().is_none());
        store.record_event(EventKind::Unlock, EventSource::Manual);
        assert_eq!(store.events().len(), 2);

        store.set_tracking(true);
        let event = store.record_foreground().unwrap();
        assert_eq!(event.source, EventSource::Foreground);
        assert_eq!(store.events().len(), 3);
    }

    #[test]
    fn test_clear_all_resets_everything() {
        let (mut store, clock, mut receiver) =
            test_store(at(TEST_DATE, 8, 0), StoreConfig::default());
        store.record_event(EventKind::Unlock, EventSource::Manual);
        store.record_sleep_transition(SleepTransition::Sleep);
        store.set_tracking(false);
        drain(&mut receiver);

        store.clear_all();

        assert!(store.events().is_empty());
        assert!(store.sleep_records().is_empty());
        assert!(store.group_by_day().is_empty());
        assert_eq!(store.today_count(), 0);
        assert_eq!(store.last_action(), None);
        assert_eq!(store.tracking(), TrackingState::Tracking);
        assert_eq!(
            drain(&mut receiver),
            SlotKey::ALL
                .into_iter()
                .map(|key| PersistCommand::Remove { key })
                .collect::<Vec<_>>()
        );

        clock.advance(Duration::minutes(1));
        let event = store.record_event(EventKind::Unlock, EventSource::Manual);
        assert_eq!(store.events(), &[event.clone()]);
        assert_eq!(event.id, at(TEST_DATE, 8, 1).timestamp_millis());
    }

    #[test]
    fn test_today_count_and_summary() {
        let yesterday = TEST_DATE.pred_opt().unwrap();
        let (mut store, clock, _receiver) = test_store(at(yesterday, 9, 0), StoreConfig::default());
        store.record_event(EventKind::Unlock, EventSource::Manual);
        clock.set(at(yesterday, 21, 0));
        store.record_event(EventKind::Unlock, EventSource::Manual);
        for (h, m) in [(10, 0), (12, 15), (14, 30)] {
            clock.set(at(TEST_DATE, h, m));
            store.record_event(EventKind::Unlock, EventSource::Foreground);
        }

        assert_eq!(store.today_count(), 3);
        assert_eq!(store.group_by_day().len(), 2);
        let summary = store.daily_summary(TEST_DATE).unwrap();
        assert_eq!(summary.active_span_label(), "4h 30m");
        assert_eq!(
            store.daily_summary(yesterday).unwrap().active_span_label(),
            "12h 0m"
        );
        assert!(store.daily_summary(TEST_DATE.succ_opt().unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_store_round_trips_through_storage() -> Result<()> {
        *TEST_LOGGING;
        let storage = Arc::new(MemoryKeyValueStorage::new());
        let clock = ManualClock::utc(at(TEST_DATE, 22, 0));

        let (sender, receiver) = mpsc::unbounded_channel();
        let persistence = PersistenceModule::new(receiver, StorageWriter::new(storage.clone()));
        let mut store =
            EventLogStore::load(&storage, Box::new(clock.clone()), StoreConfig::default(), sender)
                .await;
        assert!(store.events().is_empty());

        store.record_event(EventKind::Unlock, EventSource::Manual);
        store.record_sleep_transition(SleepTransition::Sleep);
        store.set_tracking(false);
        let events = store.events().to_vec();
        let records = store.sleep_records().to_vec();
        drop(store);
        persistence.run().await?;

        let (sender, _receiver) = mpsc::unbounded_channel();
        let restored =
            EventLogStore::load(&storage, Box::new(clock), StoreConfig::default(), sender).await;

        assert_eq!(restored.events(), &events[..]);
        assert_eq!(restored.sleep_records(), &records[..]);
        assert_eq!(restored.tracking(), TrackingState::Paused);
        assert_eq!(restored.last_action().map(|v| v.kind), Some(EventKind::Sleep));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_falls_back_per_slot() -> Result<()> {
        *TEST_LOGGING;
        let storage = MemoryKeyValueStorage::new();
        storage.set("event_log", "[{\"id\":".into()).await?;
        storage.set("status", "{\"tracking\":\"paused\"}".into()).await?;

        let (sender, _receiver) = mpsc::unbounded_channel();
        let store = EventLogStore::load(
            &storage,
            Box::new(ManualClock::utc(at(TEST_DATE, 8, 0))),
            StoreConfig::default(),
            sender,
        )
        .await;

        assert!(store.events().is_empty());
        assert_eq!(store.tracking(), TrackingState::Paused);
        assert_eq!(store.last_action(), None);
        Ok(())
    }

    #[test]
    fn test_mutations_survive_missing_persistence() {
        *TEST_LOGGING;
        let (mut store, _clock, receiver) = test_store(at(TEST_DATE, 8, 0), StoreConfig::default());
        drop(receiver);

        store.record_event(EventKind::Unlock, EventSource::Manual);
        store.set_tracking(false);

        assert_eq!(store.events().len(), 1);
        assert_eq!(store.tracking(), TrackingState::Paused);
    }
}
