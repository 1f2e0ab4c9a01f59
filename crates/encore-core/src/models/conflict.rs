//! Conflict result models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{EventKind, EventRef};
use crate::error::Error;

/// How likely a collision is to be a real double-booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Near-certain double-booking
    Critical,
    /// Plausible risk given incomplete data or tight travel time
    Warning,
    /// Same day, low practical risk
    Manageable,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Manageable => "manageable",
        }
    }

    /// Highest severity among `entries`, `Critical` ranking first
    #[must_use]
    pub fn worst(entries: &[ConflictEntry]) -> Option<Self> {
        [Self::Critical, Self::Warning, Self::Manageable]
            .into_iter()
            .find(|severity| entries.iter().any(|entry| entry.severity == *severity))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One colliding counterpart, as persisted in `conflict_details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    pub kind: EventKind,
    pub counterpart_id: i64,
    pub counterpart_name: Option<String>,
    pub counterpart_time: Option<String>,
    pub counterpart_status: String,
    pub counterpart_venue: Option<String>,
    pub severity: Severity,
}

impl ConflictEntry {
    #[must_use]
    pub const fn counterpart(&self) -> EventRef {
        EventRef::new(self.kind, self.counterpart_id)
    }
}

/// Freshly computed conflict state for one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub has_conflicts: bool,
    pub conflict_count: u32,
    pub conflict_details: Vec<ConflictEntry>,
    /// The event's conflict group matches an active resolution
    pub resolved: bool,
}

impl ConflictSummary {
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        Severity::worst(&self.conflict_details)
    }
}

/// Canonical identity of one connected collision cluster
///
/// Members are always sorted and deduplicated, so two groups with the same
/// member set produce the same [`ConflictGroup::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictGroup {
    members: Vec<EventRef>,
    pub conflict_date: NaiveDate,
}

impl ConflictGroup {
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = EventRef>, conflict_date: NaiveDate) -> Self {
        let mut members = members.into_iter().collect::<Vec<_>>();
        members.sort_unstable();
        members.dedup();
        Self {
            members,
            conflict_date,
        }
    }

    #[must_use]
    pub fn members(&self) -> &[EventRef] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ledger key, e.g. `booking:3,enquiry:7`
    #[must_use]
    pub fn key(&self) -> String {
        group_key(&self.members)
    }

    /// Ledger key for an arbitrary member list, canonicalizing first
    #[must_use]
    pub fn key_of(members: &[EventRef]) -> String {
        let mut members = members.to_vec();
        members.sort_unstable();
        members.dedup();
        group_key(&members)
    }

    /// Parse the member list back out of a ledger key
    pub fn parse_key(key: &str) -> crate::Result<Vec<EventRef>> {
        key.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(EventRef::from_str)
            .collect()
    }
}

/// Join already-canonical members into a ledger key
fn group_key(members: &[EventRef]) -> String {
    members
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "warning" => Ok(Self::Warning),
            "manageable" => Ok(Self::Manageable),
            other => Err(Error::InvalidInput(format!("Unknown severity: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()
    }

    #[test]
    fn test_group_key_is_order_independent() {
        let a = ConflictGroup::new(
            [EventRef::enquiry(7), EventRef::booking(3), EventRef::enquiry(7)],
            day(),
        );
        let b = ConflictGroup::new([EventRef::booking(3), EventRef::enquiry(7)], day());

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.key(), "booking:3,enquiry:7");
    }

    #[test]
    fn test_group_key_differs_when_member_added() {
        let pair = ConflictGroup::new([EventRef::booking(1), EventRef::booking(2)], day());
        let triple = ConflictGroup::new(
            [EventRef::booking(1), EventRef::booking(2), EventRef::enquiry(3)],
            day(),
        );
        assert_ne!(pair.key(), triple.key());
        assert_eq!(
            ConflictGroup::key_of(&[EventRef::booking(2), EventRef::booking(1)]),
            pair.key()
        );
    }

    #[test]
    fn test_parse_key_round_trips_members() {
        let group = ConflictGroup::new([EventRef::enquiry(4), EventRef::booking(10)], day());
        let members = ConflictGroup::parse_key(&group.key()).unwrap();
        assert_eq!(members, group.members());
    }

    #[test]
    fn test_conflict_entry_serializes_camel_case() {
        let entry = ConflictEntry {
            kind: EventKind::Booking,
            counterpart_id: 5,
            counterpart_name: Some("Ann".to_string()),
            counterpart_time: Some("14:00 - 16:00".to_string()),
            counterpart_status: "confirmed".to_string(),
            counterpart_venue: None,
            severity: Severity::Critical,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "booking");
        assert_eq!(json["counterpartId"], 5);
        assert_eq!(json["severity"], "critical");
        assert!(json["counterpartVenue"].is_null());
    }

    #[test]
    fn test_worst_severity() {
        let mut summary = ConflictSummary::default();
        assert_eq!(summary.worst_severity(), None);

        for severity in [Severity::Manageable, Severity::Warning] {
            summary.conflict_details.push(ConflictEntry {
                kind: EventKind::Enquiry,
                counterpart_id: 1,
                counterpart_name: None,
                counterpart_time: None,
                counterpart_status: "new".to_string(),
                counterpart_venue: None,
                severity,
            });
        }
        assert_eq!(summary.worst_severity(), Some(Severity::Warning));
        assert_eq!(Severity::worst(&summary.conflict_details[..1]), Some(Severity::Manageable));
    }
}
