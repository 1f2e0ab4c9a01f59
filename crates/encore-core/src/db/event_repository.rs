//! Event repository implementation

use crate::conflicts::ConflictSummaryStore;
use crate::error::{Error, Result};
use crate::models::{
    ConflictSummary, Event, EventDate, EventDraft, EventKind, EventRef, OwnerId,
};
use crate::util::{normalize_text_option, unix_millis_now};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const EVENT_COLUMNS: &str = "id, owner_id, kind, client_name, event_date, start_time, end_time,
    venue_name, venue_address, travel_minutes, distance_miles, status,
    has_conflicts, conflict_count, conflict_details, conflicts_resolved, created_at, updated_at";

/// Trait for owner-scoped event storage operations
pub trait EventRepository {
    /// Create a new event
    fn create(&self, owner: &OwnerId, draft: &EventDraft) -> Result<Event>;

    /// Get an event by reference
    fn get(&self, owner: &OwnerId, event: EventRef) -> Result<Option<Event>>;

    /// Replace an event's caller-owned fields; conflict fields are kept
    fn update(&self, owner: &OwnerId, event: EventRef, draft: &EventDraft) -> Result<Event>;

    /// Delete an event
    fn delete(&self, owner: &OwnerId, event: EventRef) -> Result<()>;

    /// All enquiries and bookings of one owner, including excluded ones
    fn fetch_events_for_owner(&self, owner: &OwnerId) -> Result<Vec<Event>>;
}

/// `SQLite` implementation of `EventRepository`
pub struct SqliteEventRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteEventRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an event from a database row
    fn parse_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
        let owner_id: String = row.get(1)?;
        let kind: String = row.get(2)?;
        let event_date: Option<String> = row.get(4)?;
        let details: String = row.get(14)?;

        Ok(Event {
            id: row.get(0)?,
            owner_id: OwnerId::new(owner_id).map_err(|e| conversion_error(1, e))?,
            kind: kind
                .parse::<EventKind>()
                .map_err(|e| conversion_error(2, e))?,
            client_name: row.get(3)?,
            date: event_date.as_deref().map(EventDate::from_storage),
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            venue_name: row.get(7)?,
            venue_address: row.get(8)?,
            travel_minutes: row.get(9)?,
            distance_miles: row.get(10)?,
            status: row.get(11)?,
            has_conflicts: row.get::<_, i32>(12)? != 0,
            conflict_count: row.get(13)?,
            conflict_details: serde_json::from_str(&details)
                .map_err(|e| conversion_error(14, e))?,
            conflicts_resolved: row.get::<_, i32>(15)? != 0,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }
}

fn conversion_error(
    column: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

/// Draft fields as stored, with blank text collapsed to NULL
struct DraftColumns {
    client_name: Option<String>,
    event_date: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    venue_name: Option<String>,
    venue_address: Option<String>,
    status: String,
}

impl DraftColumns {
    fn from_draft(draft: &EventDraft) -> Result<Self> {
        let status = normalize_text_option(Some(draft.status.clone()))
            .ok_or_else(|| Error::InvalidInput("Event status cannot be empty".into()))?;
        Ok(Self {
            client_name: normalize_text_option(draft.client_name.clone()),
            event_date: normalize_text_option(draft.date.as_ref().map(EventDate::to_storage)),
            start_time: normalize_text_option(draft.start_time.clone()),
            end_time: normalize_text_option(draft.end_time.clone()),
            venue_name: normalize_text_option(draft.venue_name.clone()),
            venue_address: normalize_text_option(draft.venue_address.clone()),
            status,
        })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create(&self, owner: &OwnerId, draft: &EventDraft) -> Result<Event> {
        let columns = DraftColumns::from_draft(draft)?;
        let now = unix_millis_now();

        self.conn.execute(
            "INSERT INTO events (owner_id, kind, client_name, event_date, start_time, end_time,
                venue_name, venue_address, travel_minutes, distance_miles, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                owner.as_str(),
                draft.kind.as_str(),
                columns.client_name,
                columns.event_date,
                columns.start_time,
                columns.end_time,
                columns.venue_name,
                columns.venue_address,
                draft.travel_minutes,
                draft.distance_miles,
                columns.status,
                now,
                now
            ],
        )?;

        let event = EventRef::new(draft.kind, self.conn.last_insert_rowid());
        self.get(owner, event)?
            .ok_or_else(|| Error::NotFound(event.to_string()))
    }

    fn get(&self, owner: &OwnerId, event: EventRef) -> Result<Option<Event>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = ? AND kind = ? AND id = ?"),
                params![owner.as_str(), event.kind.as_str(), event.id],
                Self::parse_event,
            )
            .optional()?;
        Ok(found)
    }

    fn update(&self, owner: &OwnerId, event: EventRef, draft: &EventDraft) -> Result<Event> {
        if draft.kind != event.kind {
            return Err(Error::InvalidInput(format!(
                "Cannot change {event} into a {}",
                draft.kind
            )));
        }
        let columns = DraftColumns::from_draft(draft)?;

        let rows = self.conn.execute(
            "UPDATE events SET client_name = ?, event_date = ?, start_time = ?, end_time = ?,
                venue_name = ?, venue_address = ?, travel_minutes = ?, distance_miles = ?,
                status = ?, updated_at = ?
             WHERE owner_id = ? AND kind = ? AND id = ?",
            params![
                columns.client_name,
                columns.event_date,
                columns.start_time,
                columns.end_time,
                columns.venue_name,
                columns.venue_address,
                draft.travel_minutes,
                draft.distance_miles,
                columns.status,
                unix_millis_now(),
                owner.as_str(),
                event.kind.as_str(),
                event.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(event.to_string()));
        }

        self.get(owner, event)?
            .ok_or_else(|| Error::NotFound(event.to_string()))
    }

    fn delete(&self, owner: &OwnerId, event: EventRef) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM events WHERE owner_id = ? AND kind = ? AND id = ?",
            params![owner.as_str(), event.kind.as_str(), event.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(event.to_string()));
        }

        Ok(())
    }

    fn fetch_events_for_owner(&self, owner: &OwnerId) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = ? ORDER BY kind ASC, id ASC"
        ))?;

        let events = stmt
            .query_map(params![owner.as_str()], Self::parse_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }
}

impl ConflictSummaryStore for SqliteEventRepository<'_> {
    fn persist_conflict_summary(
        &self,
        owner: &OwnerId,
        event: EventRef,
        summary: &ConflictSummary,
    ) -> Result<()> {
        let details = serde_json::to_string(&summary.conflict_details)?;

        let rows = self.conn.execute(
            "UPDATE events SET has_conflicts = ?, conflict_count = ?, conflict_details = ?,
                conflicts_resolved = ?, updated_at = ?
             WHERE owner_id = ? AND kind = ? AND id = ?",
            params![
                i32::from(summary.has_conflicts),
                summary.conflict_count,
                details,
                i32::from(summary.resolved),
                unix_millis_now(),
                owner.as_str(),
                event.kind.as_str(),
                event.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(event.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ConflictEntry, Severity};
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());

        let draft = EventDraft::booking("2025-08-02")
            .times("14:00", "16:00")
            .client("Ann Smith")
            .venue("Town Hall")
            .travel(25);
        let event = repo.create(&owner("o"), &draft).unwrap();
        assert_eq!(event.kind, EventKind::Booking);
        assert_eq!(event.status, "confirmed");
        assert!(!event.has_conflicts);

        let fetched = repo.get(&owner("o"), event.event_ref()).unwrap().unwrap();
        assert_eq!(fetched, event);
        assert_eq!(fetched.travel_minutes, Some(25));
        assert_eq!(fetched.date, Some(EventDate::from_storage("2025-08-02")));
    }

    #[test]
    fn test_get_is_owner_and_kind_scoped() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());

        let event = repo
            .create(&owner("o"), &EventDraft::booking("2025-08-02"))
            .unwrap();
        assert!(repo.get(&owner("other"), event.event_ref()).unwrap().is_none());
        assert!(repo
            .get(&owner("o"), EventRef::enquiry(event.id))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_rejects_blank_status() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());

        let result = repo.create(&owner("o"), &EventDraft::enquiry("2025-08-02").status("  "));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_update_keeps_conflict_fields() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());
        let o = owner("o");

        let event = repo.create(&o, &EventDraft::enquiry("2025-08-02")).unwrap();
        let summary = ConflictSummary {
            has_conflicts: true,
            conflict_count: 1,
            conflict_details: vec![ConflictEntry {
                kind: EventKind::Booking,
                counterpart_id: 99,
                counterpart_name: None,
                counterpart_time: None,
                counterpart_status: "confirmed".to_string(),
                counterpart_venue: None,
                severity: Severity::Critical,
            }],
            resolved: false,
        };
        repo.persist_conflict_summary(&o, event.event_ref(), &summary)
            .unwrap();

        let updated = repo
            .update(
                &o,
                event.event_ref(),
                &EventDraft::enquiry("2025-08-03").starting("19:00"),
            )
            .unwrap();
        assert_eq!(updated.start_time.as_deref(), Some("19:00"));
        assert!(updated.summary_matches(&summary));
    }

    #[test]
    fn test_update_rejects_kind_change() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());
        let o = owner("o");

        let event = repo.create(&o, &EventDraft::enquiry("2025-08-02")).unwrap();
        let result = repo.update(&o, event.event_ref(), &EventDraft::booking("2025-08-02"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());
        let o = owner("o");

        let event = repo.create(&o, &EventDraft::booking("2025-08-02")).unwrap();
        repo.delete(&o, event.event_ref()).unwrap();

        assert!(repo.get(&o, event.event_ref()).unwrap().is_none());
        assert!(matches!(
            repo.delete(&o, event.event_ref()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_fetch_events_for_owner() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());

        repo.create(&owner("a"), &EventDraft::enquiry("2025-08-02"))
            .unwrap();
        repo.create(&owner("a"), &EventDraft::booking("2025-08-02"))
            .unwrap();
        repo.create(&owner("b"), &EventDraft::booking("2025-08-02"))
            .unwrap();
        repo.create(&owner("a"), &EventDraft::new(EventKind::Enquiry))
            .unwrap();

        let events = repo.fetch_events_for_owner(&owner("a")).unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|event| event.owner_id == owner("a")));
        assert_eq!(events[0].kind, EventKind::Booking);
    }

    #[test]
    fn test_persist_summary_for_missing_event_fails() {
        let db = setup();
        let repo = SqliteEventRepository::new(db.connection());

        let result = repo.persist_conflict_summary(
            &owner("o"),
            EventRef::booking(404),
            &ConflictSummary::default(),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
