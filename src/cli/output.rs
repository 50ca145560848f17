use ansi_term::{Colour, Style};

use crate::{
    store::{
        entities::{Event, SleepRecord},
        EventLogStore,
    },
    utils::clock::Clock,
};

pub fn print_recorded(event: &Event, store: &EventLogStore) {
    let display = event.display(store.clock());
    println!(
        "Logged {} at {} on {}, {} today",
        event.kind,
        display.time,
        display.day_of_week,
        store.today_count()
    );
}

pub fn print_sleep_record(record: &SleepRecord, clock: &dyn Clock) {
    let time = |v: Option<chrono::DateTime<chrono::Utc>>| {
        v.map(|v| clock.local(v).format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".into())
    };
    let date = record
        .local_date(clock)
        .map(|v| v.format("%a %d %b %Y").to_string())
        .unwrap_or_default();
    println!(
        "{}\t{} -> {}\t{}",
        date,
        time(record.sleep_timestamp),
        time(record.wake_timestamp),
        record.duration_label().unwrap_or_else(|| "-".into())
    );
}

pub fn print_status(store: &EventLogStore) {
    let tracking = store.tracking();
    let tracking_style = if tracking.is_tracking() {
        Colour::Green.normal()
    } else {
        Colour::Yellow.normal()
    };
    println!("Tracking:\t{}", tracking_style.paint(tracking.to_string()));
    match store.last_action() {
        Some(action) => {
            let local = store.clock().local(action.timestamp);
            println!(
                "Last action:\t{} ({}) at {}",
                action.kind,
                action.source,
                local.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("Last action:\tnone"),
    }
    println!("Today:\t\t{}", store.today_count());
    println!("Logged:\t\t{}", store.events().len());
    println!("Sleep records:\t{}", store.sleep_records().len());
}

pub fn day_header(text: &str) -> String {
    Style::new().bold().paint(text).to_string()
}
