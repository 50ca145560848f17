use chrono::{Duration, NaiveDate};

use crate::utils::{clock::Clock, time::format_span};

use super::entities::Event;

/// Events sharing one local date, in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub events: Vec<Event>,
}

/// First and last event of a day and the time between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub first: Event,
    pub last: Event,
    pub active_span: Duration,
}

impl DailySummary {
    pub fn active_span_label(&self) -> String {
        format_span(self.active_span)
    }
}

/// Buckets events by their local date. Buckets come out in the order their first event was seen,
/// which for a newest-first log means newest day first.
pub fn group_by_day<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    clock: &dyn Clock,
) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = vec![];
    for event in events {
        let date = event.local_date(clock);
        match groups.iter_mut().find(|group| group.date == date) {
            Some(group) => group.events.push(event.clone()),
            None => groups.push(DayGroup {
                date,
                events: vec![event.clone()],
            }),
        }
    }
    groups
}

/// Returns `None` when the day has fewer than two events.
pub fn daily_summary(events: &[Event]) -> Option<DailySummary> {
    if events.len() < 2 {
        return None;
    }
    let mut sorted = events.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|v| v.timestamp);

    let first = sorted.first()?;
    let last = sorted.last()?;
    Some(DailySummary {
        first: (*first).clone(),
        last: (*last).clone(),
        active_span: last.timestamp - first.timestamp,
    })
}

pub fn today_count<'a>(events: impl IntoIterator<Item = &'a Event>, clock: &dyn Clock) -> usize {
    let today = clock.local(clock.time()).date_naive();
    events
        .into_iter()
        .filter(|v| v.local_date(clock) == today)
        .count()
}
