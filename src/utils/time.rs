use chrono::{Duration, NaiveDate};

/// This is the standard way of converting a date to a string in daymark.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a span as whole hours plus the remaining whole minutes, e.g. `7h 30m`. Seconds are
/// floored away.
pub fn format_span(span: Duration) -> String {
    let minutes = span.num_minutes();
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    format!("{sign}{}h {}m", minutes / 60, minutes % 60)
}
