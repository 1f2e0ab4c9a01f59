//! Event model: enquiries and bookings on a performer's calendar

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::{ConflictEntry, ConflictSummary};
use crate::error::Error;

/// The performer account every event belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner id, rejecting blank values
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Owner id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Kind of calendar record
///
/// Variant order is significant: bookings sort before enquiries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A confirmed engagement
    Booking,
    /// An unconfirmed prospective booking
    Enquiry,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Enquiry => "enquiry",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booking" | "bookings" => Ok(Self::Booking),
            "enquiry" | "enquiries" | "inquiry" => Ok(Self::Enquiry),
            other => Err(Error::InvalidInput(format!("Unknown event kind: {other}"))),
        }
    }
}

/// Identity of an event within one owner's calendar
///
/// Ordering is bookings first, then ascending id. Serializes as `kind:id`
/// so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventRef {
    pub kind: EventKind,
    pub id: i64,
}

impl EventRef {
    #[must_use]
    pub const fn new(kind: EventKind, id: i64) -> Self {
        Self { kind, id }
    }

    #[must_use]
    pub const fn booking(id: i64) -> Self {
        Self::new(EventKind::Booking, id)
    }

    #[must_use]
    pub const fn enquiry(id: i64) -> Self {
        Self::new(EventKind::Enquiry, id)
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for EventRef {
    type Err = Error;

    /// Parse `kind:id`, e.g. `booking:12`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("Expected kind:id, got '{s}'")))?;
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("Invalid event id in '{s}'")))?;
        Ok(Self::new(kind.parse()?, id))
    }
}

impl Serialize for EventRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A calendar date as supplied by the CRUD layer
///
/// Source records are inconsistent: some carry a date-only string, some a
/// full timestamp, some free text. Normalization happens in
/// [`crate::conflicts::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDate {
    /// A native calendar date
    Day(NaiveDate),
    /// A timestamp with offset; only the written calendar date is used
    Timestamp(DateTime<FixedOffset>),
    /// Unparsed text
    Text(String),
}

impl EventDate {
    /// Classify a stored value without ever failing
    #[must_use]
    pub fn from_storage(value: &str) -> Self {
        if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Self::Day(day);
        }
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
            return Self::Timestamp(timestamp);
        }
        Self::Text(value.to_string())
    }

    /// Text form written to the `events.event_date` column
    #[must_use]
    pub fn to_storage(&self) -> String {
        match self {
            Self::Day(day) => day.format("%Y-%m-%d").to_string(),
            Self::Timestamp(timestamp) => timestamp.to_rfc3339(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl From<NaiveDate> for EventDate {
    fn from(value: NaiveDate) -> Self {
        Self::Day(value)
    }
}

impl From<&str> for EventDate {
    fn from(value: &str) -> Self {
        Self::from_storage(value)
    }
}

/// An enquiry or booking, including the derived conflict fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub owner_id: OwnerId,
    pub kind: EventKind,
    pub id: i64,
    pub client_name: Option<String>,
    pub date: Option<EventDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    /// Travel time from the performer's reference point
    pub travel_minutes: Option<u32>,
    /// Distance from the performer's reference point
    pub distance_miles: Option<f64>,
    pub status: String,
    pub has_conflicts: bool,
    pub conflict_count: u32,
    pub conflict_details: Vec<ConflictEntry>,
    pub conflicts_resolved: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Event {
    /// Build an event from a draft, with empty conflict fields
    #[must_use]
    pub fn from_draft(owner_id: OwnerId, id: i64, draft: EventDraft) -> Self {
        let now = crate::util::unix_millis_now();
        Self {
            owner_id,
            kind: draft.kind,
            id,
            client_name: draft.client_name,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            venue_name: draft.venue_name,
            venue_address: draft.venue_address,
            travel_minutes: draft.travel_minutes,
            distance_miles: draft.distance_miles,
            status: draft.status,
            has_conflicts: false,
            conflict_count: 0,
            conflict_details: Vec::new(),
            conflicts_resolved: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn event_ref(&self) -> EventRef {
        EventRef::new(self.kind, self.id)
    }

    /// Whether the event's lifecycle status removes it from conflict detection
    ///
    /// Bookings always count as confirmed.
    #[must_use]
    pub fn is_status_excluded(&self, excluded_enquiry_statuses: &[String]) -> bool {
        self.kind == EventKind::Enquiry
            && excluded_enquiry_statuses
                .iter()
                .any(|status| status.eq_ignore_ascii_case(self.status.trim()))
    }

    /// Whether the persisted conflict fields already equal `summary`
    #[must_use]
    pub fn summary_matches(&self, summary: &ConflictSummary) -> bool {
        self.has_conflicts == summary.has_conflicts
            && self.conflict_count == summary.conflict_count
            && self.conflicts_resolved == summary.resolved
            && self.conflict_details == summary.conflict_details
    }

    /// The caller-supplied fields of this event, for partial updates
    #[must_use]
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            kind: self.kind,
            client_name: self.client_name.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            venue_name: self.venue_name.clone(),
            venue_address: self.venue_address.clone(),
            travel_minutes: self.travel_minutes,
            distance_miles: self.distance_miles,
            status: self.status.clone(),
        }
    }
}

/// Caller-supplied fields for creating or replacing an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub kind: EventKind,
    pub client_name: Option<String>,
    pub date: Option<EventDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub travel_minutes: Option<u32>,
    pub distance_miles: Option<f64>,
    pub status: String,
}

impl EventDraft {
    /// Start a draft of the given kind with no scheduling data
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        let status = match kind {
            EventKind::Booking => "confirmed",
            EventKind::Enquiry => "new",
        };
        Self {
            kind,
            client_name: None,
            date: None,
            start_time: None,
            end_time: None,
            venue_name: None,
            venue_address: None,
            travel_minutes: None,
            distance_miles: None,
            status: status.to_string(),
        }
    }

    #[must_use]
    pub fn booking(date: impl Into<EventDate>) -> Self {
        Self::new(EventKind::Booking).on(date)
    }

    #[must_use]
    pub fn enquiry(date: impl Into<EventDate>) -> Self {
        Self::new(EventKind::Enquiry).on(date)
    }

    #[must_use]
    pub fn on(mut self, date: impl Into<EventDate>) -> Self {
        self.date = Some(date.into());
        self
    }

    #[must_use]
    pub fn starting(mut self, start: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self
    }

    #[must_use]
    pub fn times(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }

    #[must_use]
    pub fn client(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn venue(mut self, name: impl Into<String>) -> Self {
        self.venue_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn travel(mut self, minutes: u32) -> Self {
        self.travel_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub const fn distance(mut self, miles: f64) -> Self {
        self.distance_miles = Some(miles);
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}
