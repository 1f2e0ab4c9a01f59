//! Pairwise collision detection
//!
//! [`detect`] is a pure, symmetric function of two normalized events: the
//! same pair always yields the same answer regardless of argument order,
//! which the aggregator relies on for idempotent output and stable groups.

use crate::config::EngineConfig;
use crate::models::{Event, Severity};
use crate::util::venue_key;

use super::normalize::NormalizedInterval;

/// A normalized event ready for comparison
#[derive(Debug, Clone, Copy)]
pub struct Slot<'a> {
    pub event: &'a Event,
    pub interval: NormalizedInterval,
}

impl<'a> Slot<'a> {
    #[must_use]
    pub const fn new(event: &'a Event, interval: NormalizedInterval) -> Self {
        Self { event, interval }
    }

    /// Concrete `[start, end)` in minutes, filling a missing end with the default duration
    fn span(&self, default_duration: u32) -> Option<(u32, u32)> {
        let start = self.interval.start_minutes?;
        let end = self
            .interval
            .end_minutes
            .unwrap_or_else(|| start.saturating_add(default_duration));
        Some((start, end))
    }
}

/// Decide whether two events collide and how badly.
///
/// Returns `None` when they do not collide.
#[must_use]
pub fn detect(a: &Slot<'_>, b: &Slot<'_>, config: &EngineConfig) -> Option<Severity> {
    if a.interval.day != b.interval.day {
        return None;
    }

    let spans = (
        a.span(config.default_duration_minutes),
        b.span(config.default_duration_minutes),
    );
    let ((a_start, a_end), (b_start, b_end)) = match spans {
        (None, None) => return Some(Severity::Critical),
        (Some(_), None) | (None, Some(_)) => return Some(Severity::Warning),
        (Some(a_span), Some(b_span)) => (a_span, b_span),
    };

    if a_start < b_end && b_start < a_end {
        return Some(Severity::Critical);
    }

    let gap = if a_end <= b_start {
        b_start - a_end
    } else {
        a_start - b_end
    };

    let travel = estimate_travel_minutes(a.event, b.event, config.average_speed_mph)?;
    if f64::from(gap) < travel {
        Some(Severity::Warning)
    } else {
        Some(Severity::Manageable)
    }
}

/// Estimated minutes needed to get from one venue to the other.
///
/// Same venue needs no travel. Otherwise route through the performer's
/// reference point, summing whichever legs are known. `None` means there is
/// no spatial data at all.
#[must_use]
pub fn estimate_travel_minutes(a: &Event, b: &Event, average_speed_mph: f64) -> Option<f64> {
    if same_venue(a, b) {
        return Some(0.0);
    }

    match (
        leg_minutes(a, average_speed_mph),
        leg_minutes(b, average_speed_mph),
    ) {
        (Some(a_leg), Some(b_leg)) => Some(a_leg + b_leg),
        (Some(leg), None) | (None, Some(leg)) => Some(leg),
        (None, None) => None,
    }
}

fn same_venue(a: &Event, b: &Event) -> bool {
    let matches = |left: Option<&str>, right: Option<&str>| match (left, right) {
        (Some(left), Some(right)) => {
            let left = venue_key(left);
            !left.is_empty() && left == venue_key(right)
        }
        _ => false,
    };

    matches(a.venue_name.as_deref(), b.venue_name.as_deref())
        || matches(a.venue_address.as_deref(), b.venue_address.as_deref())
}

fn leg_minutes(event: &Event, average_speed_mph: f64) -> Option<f64> {
    event.travel_minutes.map(f64::from).or_else(|| {
        event
            .distance_miles
            .filter(|miles| miles.is_finite() && *miles >= 0.0)
            .map(|miles| miles / average_speed_mph * 60.0)
    })
}
