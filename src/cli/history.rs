use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    store::{views::daily_summary, EventLogStore},
    utils::time::date_to_key,
};

use super::{output::day_header, Args};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Only show events from this point on. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take the start as a whole day. For example \"yesterday\" then includes yesterday morning"
    )]
    treat_as_days: bool,
}

/// Prints every day that has events, newest first, with its first/last event and the span
/// between them.
pub fn process_history_command(
    HistoryCommand {
        start_date,
        date_style,
        treat_as_days,
    }: HistoryCommand,
    store: &EventLogStore,
) -> Result<()> {
    let start = parse_start(start_date, date_style, treat_as_days)?;
    let clock = store.clock();

    let groups = store
        .group_by_day()
        .into_iter()
        .filter_map(|mut group| {
            if let Some(start) = start {
                group.events.retain(|v| v.timestamp >= start);
            }
            (!group.events.is_empty()).then_some(group)
        })
        .collect::<Vec<_>>();

    if groups.is_empty() {
        println!("Nothing logged yet");
        return Ok(());
    }

    for group in groups {
        let first = &group.events[0];
        let display = first.display(clock);
        println!(
            "{}",
            day_header(&format!(
                "{} {}\t{} events",
                display.day_of_week,
                date_to_key(group.date),
                group.events.len()
            ))
        );
        match daily_summary(&group.events) {
            Some(summary) => println!(
                "  first {}  last {}  active {}",
                summary.first.display(clock).time,
                summary.last.display(clock).time,
                summary.active_span_label()
            ),
            None => println!("  not enough events for a summary"),
        }
        for event in &group.events {
            println!(
                "  {}\t{}\t{}",
                event.display(clock).time,
                event.kind,
                event.source
            );
        }
        println!();
    }
    Ok(())
}

fn parse_start(
    start_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
) -> Result<Option<DateTime<Utc>>> {
    let Some(start_date) = start_date else {
        return Ok(None);
    };
    let dialect: chrono_english::Dialect = date_style.into();
    let mut start = match parse_date_string(&start_date, Local::now(), dialect) {
        Ok(v) => v,
        Err(e) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
    };
    if treat_as_days {
        start = start.beginning_of_day();
    }
    Ok(Some(start.with_timezone(&Utc)))
}
