//! Resolution model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ConflictGroup, OwnerId};
use crate::error::Error;

/// A unique identifier for a resolution, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionId(Uuid);

impl ResolutionId {
    /// Create a new unique resolution ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ResolutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResolutionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// What the user decided about a conflict group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    /// Both engagements will go ahead as planned
    #[default]
    Accepted,
    /// Not a real conflict
    Dismissed,
    /// One of the events will move; silence until it does
    Rescheduled,
    Other,
}

impl ResolutionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Dismissed => "dismissed",
            Self::Rescheduled => "rescheduled",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" | "accept" => Ok(Self::Accepted),
            "dismissed" | "dismiss" => Ok(Self::Dismissed),
            "rescheduled" | "reschedule" => Ok(Self::Rescheduled),
            "other" => Ok(Self::Other),
            other => Err(Error::InvalidInput(format!(
                "Unknown resolution type: {other}"
            ))),
        }
    }
}

/// A persisted user decision to stop surfacing one exact conflict group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub id: ResolutionId,
    pub owner_id: OwnerId,
    pub group: ConflictGroup,
    /// Resolution timestamp (Unix ms)
    pub resolved_at: i64,
    pub resolved_by: String,
    pub resolution_type: ResolutionType,
    pub notes: Option<String>,
    /// After this timestamp (Unix ms) the resolution no longer suppresses
    pub expires_at: Option<i64>,
}

impl Resolution {
    /// Whether the resolution still suppresses alerting at `now_ms`
    #[must_use]
    pub fn is_active(&self, now_ms: i64) -> bool {
        !matches!(self.expires_at, Some(expires_at) if now_ms >= expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRef;
    use chrono::NaiveDate;

    fn resolution(expires_at: Option<i64>) -> Resolution {
        Resolution {
            id: ResolutionId::new(),
            owner_id: OwnerId::new("owner").unwrap(),
            group: ConflictGroup::new(
                [EventRef::booking(1), EventRef::enquiry(2)],
                NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
            ),
            resolved_at: 1_000,
            resolved_by: "sam".to_string(),
            resolution_type: ResolutionType::Accepted,
            notes: None,
            expires_at,
        }
    }

    #[test]
    fn test_resolution_id_parse() {
        let id = ResolutionId::new();
        let parsed: ResolutionId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_resolution_type_parse() {
        assert_eq!(
            "Dismissed".parse::<ResolutionType>().unwrap(),
            ResolutionType::Dismissed
        );
        assert!("ignored".parse::<ResolutionType>().is_err());
    }

    #[test]
    fn test_resolution_expiry() {
        assert!(resolution(None).is_active(i64::MAX));
        assert!(resolution(Some(5_000)).is_active(4_999));
        assert!(!resolution(Some(5_000)).is_active(5_000));
    }
}
