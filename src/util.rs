use chrono::{DateTime, Utc};
use time_humanize::{Accuracy, HumanTime, Tense};

/// `MM:SS` under an hour, `H:MM:SS` from then on.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    match hours {
        0 => format!("{:02}:{:02}", minutes, seconds),
        _ => format!("{}:{:02}:{:02}", hours, minutes, seconds),
    }
}

/// "5 minutes ago" style description of `then` relative to `now`.
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let ago = now
        .signed_duration_since(then)
        .to_std()
        .unwrap_or_default();
    HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past)
}
