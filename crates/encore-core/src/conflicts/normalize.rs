//! Event record normalization
//!
//! Every date/time representation in an [`Event`] funnels through here once,
//! producing a [`NormalizedInterval`] the detector works with. Days are kept
//! timezone-naive: the calendar date as written is the event's day, and no
//! offset conversion is applied.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::{Event, EventDate};

const MINUTES_PER_DAY: u32 = 24 * 60;

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Canonical scheduling data for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedInterval {
    pub day: NaiveDate,
    /// Minutes since midnight; `None` when unknown
    pub start_minutes: Option<u32>,
    /// Minutes since midnight of `day`; may exceed 1440 for events past midnight
    pub end_minutes: Option<u32>,
}

/// Why an event cannot take part in detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingDate,
    UnparseableDate(String),
}

/// Outcome of normalizing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Interval(NormalizedInterval),
    Excluded(ExclusionReason),
}

impl Normalized {
    #[must_use]
    pub const fn interval(&self) -> Option<&NormalizedInterval> {
        match self {
            Self::Interval(interval) => Some(interval),
            Self::Excluded(_) => None,
        }
    }
}

/// Normalize an event's date and times.
///
/// An unusable day excludes the event; unusable times only become `None`.
#[must_use]
pub fn normalize(event: &Event) -> Normalized {
    let Some(date) = event.date.as_ref() else {
        tracing::debug!(event = %event.event_ref(), "Excluding event without a date");
        return Normalized::Excluded(ExclusionReason::MissingDate);
    };

    let Some(day) = normalize_day(date) else {
        let raw = date.to_storage();
        tracing::debug!(event = %event.event_ref(), date = %raw, "Excluding event with unparseable date");
        return Normalized::Excluded(ExclusionReason::UnparseableDate(raw));
    };

    let start_minutes = event.start_time.as_deref().and_then(parse_clock_time);
    let end_minutes = event
        .end_time
        .as_deref()
        .and_then(parse_clock_time)
        .map(|end| match start_minutes {
            // An end at or before the start finishes after midnight
            Some(start) if end <= start => end + MINUTES_PER_DAY,
            _ => end,
        });

    Normalized::Interval(NormalizedInterval {
        day,
        start_minutes,
        end_minutes,
    })
}

/// Resolve any [`EventDate`] to its calendar day.
#[must_use]
pub fn normalize_day(date: &EventDate) -> Option<NaiveDate> {
    match date {
        EventDate::Day(day) => Some(*day),
        EventDate::Timestamp(timestamp) => Some(timestamp.date_naive()),
        EventDate::Text(text) => parse_day(text),
    }
}

/// Parse a textual date: `YYYY-MM-DD`, RFC 3339, or a naive ISO datetime.
#[must_use]
pub fn parse_day(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }
    if let Some(date_time) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(date_time.date());
    }

    // Timestamps with offsets chrono won't take (e.g. `+0100`, trailing zone names)
    let head = text.get(..10)?;
    if text[10..].starts_with(['T', ' ']) {
        return NaiveDate::parse_from_str(head, "%Y-%m-%d").ok();
    }
    None
}

/// Parse `HH:MM`, `H:MM`, `HH:MM:SS`, optionally with an `am`/`pm` suffix.
///
/// Returns minutes since midnight, or `None` for anything else.
#[must_use]
pub fn parse_clock_time(text: &str) -> Option<u32> {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    let re = CLOCK.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::\d{2})?\s*([AaPp][Mm])?$").expect("Invalid regex")
    });

    let caps = re.captures(text.trim())?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    let hours = match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            match (meridiem.as_str(), hours) {
                ("am", 12) => 0,
                ("pm", 12) => 12,
                ("pm", h) => h + 12,
                (_, h) => h,
            }
        }
        None if hours < 24 => hours,
        None => return None,
    };

    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDraft, OwnerId};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(draft: EventDraft) -> Event {
        Event::from_draft(OwnerId::new("owner").unwrap(), 1, draft)
    }

    #[test]
    fn test_parse_day_formats() {
        assert_eq!(parse_day("2025-08-02"), Some(day(2025, 8, 2)));
        assert_eq!(parse_day(" 2025-08-02 "), Some(day(2025, 8, 2)));
        assert_eq!(parse_day("2025-08-02T14:00:00.000Z"), Some(day(2025, 8, 2)));
        assert_eq!(parse_day("2025-08-02 14:00:00"), Some(day(2025, 8, 2)));
        assert_eq!(parse_day("2025-08-02T14:00"), Some(day(2025, 8, 2)));
        assert_eq!(parse_day("2025-08-02T14:00:00+0100"), Some(day(2025, 8, 2)));
    }

    #[test]
    fn test_parse_day_keeps_written_date_despite_offset() {
        // 23:30 at +01:00 is already the 3rd in UTC; the written day wins
        assert_eq!(parse_day("2025-08-02T23:30:00+01:00"), Some(day(2025, 8, 2)));
        assert_eq!(parse_day("2025-08-02T00:30:00-05:00"), Some(day(2025, 8, 2)));
    }

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("TBC"), None);
        assert_eq!(parse_day("2025-13-40"), None);
        assert_eq!(parse_day("02/08/2025"), None);
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("14:00"), Some(840));
        assert_eq!(parse_clock_time("9:05"), Some(545));
        assert_eq!(parse_clock_time("19:30:00"), Some(1170));
        assert_eq!(parse_clock_time("7:30 pm"), Some(1170));
        assert_eq!(parse_clock_time("12:00AM"), Some(0));
        assert_eq!(parse_clock_time("12:15pm"), Some(735));
    }

    #[test]
    fn test_parse_clock_time_free_text_is_unknown() {
        assert_eq!(parse_clock_time("evening"), None);
        assert_eq!(parse_clock_time("after the speeches"), None);
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("10:75"), None);
        assert_eq!(parse_clock_time("13:00 pm"), None);
    }

    #[test]
    fn test_normalize_with_times() {
        let normalized = normalize(&event(EventDraft::booking("2025-08-02").times("14:00", "16:00")));
        assert_eq!(
            normalized,
            Normalized::Interval(NormalizedInterval {
                day: day(2025, 8, 2),
                start_minutes: Some(840),
                end_minutes: Some(960),
            })
        );
    }

    #[test]
    fn test_normalize_end_past_midnight() {
        let normalized = normalize(&event(EventDraft::booking("2025-08-02").times("22:00", "01:00")));
        let interval = normalized.interval().unwrap();
        assert_eq!(interval.start_minutes, Some(1320));
        assert_eq!(interval.end_minutes, Some(1500));
    }

    #[test]
    fn test_normalize_free_text_time_becomes_unknown() {
        let normalized = normalize(&event(EventDraft::enquiry("2025-08-02").starting("evening")));
        assert_eq!(normalized.interval().unwrap().start_minutes, None);
    }

    #[test]
    fn test_normalize_excludes_missing_and_bad_dates() {
        let mut draft = EventDraft::new(crate::models::EventKind::Enquiry);
        assert_eq!(
            normalize(&event(draft.clone())),
            Normalized::Excluded(ExclusionReason::MissingDate)
        );

        draft.date = Some(EventDate::Text("sometime soon".to_string()));
        assert_eq!(
            normalize(&event(draft)),
            Normalized::Excluded(ExclusionReason::UnparseableDate("sometime soon".to_string()))
        );
    }

    #[test]
    fn test_normalize_timestamp_date() {
        let stamp = DateTime::parse_from_rfc3339("2025-12-25T00:00:00+00:00").unwrap();
        let normalized = normalize(&event(EventDraft::booking(EventDate::Timestamp(stamp))));
        assert_eq!(normalized.interval().unwrap().day, day(2025, 12, 25));
    }
}
