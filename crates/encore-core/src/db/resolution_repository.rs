//! Resolution ledger implementation

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{ConflictGroup, EventRef, OwnerId, Resolution, ResolutionId, ResolutionType};
use crate::util::{normalize_text_option, unix_millis_now};

const RESOLUTION_COLUMNS: &str =
    "id, owner_id, group_key, conflict_date, resolved_at, resolved_by, resolution_type, notes, expires_at";

/// Trait for storing user decisions about conflict groups
///
/// Lookups are exact on the canonical member key; a group with one more or
/// one fewer member is a different group.
pub trait ResolutionLedger {
    /// Record (or refresh) a resolution that never expires
    fn record_resolution(
        &self,
        owner: &OwnerId,
        group: &ConflictGroup,
        resolved_by: &str,
        resolution_type: ResolutionType,
        notes: Option<&str>,
    ) -> Result<Resolution> {
        self.record_resolution_until(owner, group, resolved_by, resolution_type, notes, None)
    }

    /// Upsert keyed by `(owner, group key)`; a repeat call refreshes the
    /// timestamp, author, type, notes and expiry but keeps the id
    fn record_resolution_until(
        &self,
        owner: &OwnerId,
        group: &ConflictGroup,
        resolved_by: &str,
        resolution_type: ResolutionType,
        notes: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<Resolution>;

    /// Exact-match lookup
    fn lookup_resolution(&self, owner: &OwnerId, group: &ConflictGroup)
        -> Result<Option<Resolution>>;

    /// Remove a resolution; returns whether one existed
    fn delete_resolution(&self, owner: &OwnerId, group: &ConflictGroup) -> Result<bool>;

    /// Every resolution of one owner, by conflict date
    fn list_resolutions(&self, owner: &OwnerId) -> Result<Vec<Resolution>>;

    /// Remove every resolution whose group includes `event`
    fn delete_resolutions_involving(&self, owner: &OwnerId, event: EventRef) -> Result<usize>;
}

/// `SQLite` implementation of `ResolutionLedger`
pub struct SqliteResolutionLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteResolutionLedger<'a> {
    /// Create a new ledger with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a resolution from a database row
    fn parse_resolution(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resolution> {
        let id: String = row.get(0)?;
        let owner_id: String = row.get(1)?;
        let group_key: String = row.get(2)?;
        let conflict_date: String = row.get(3)?;
        let resolution_type: String = row.get(6)?;

        let members = ConflictGroup::parse_key(&group_key).map_err(|e| conversion_error(2, e))?;
        let conflict_date = NaiveDate::parse_from_str(&conflict_date, "%Y-%m-%d")
            .map_err(|e| conversion_error(3, e))?;

        Ok(Resolution {
            id: id.parse::<ResolutionId>().map_err(|e| conversion_error(0, e))?,
            owner_id: OwnerId::new(owner_id).map_err(|e| conversion_error(1, e))?,
            group: ConflictGroup::new(members, conflict_date),
            resolved_at: row.get(4)?,
            resolved_by: row.get(5)?,
            resolution_type: resolution_type
                .parse()
                .map_err(|e| conversion_error(6, e))?,
            notes: row.get(7)?,
            expires_at: row.get(8)?,
        })
    }
}

fn conversion_error(
    column: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

impl ResolutionLedger for SqliteResolutionLedger<'_> {
    fn record_resolution_until(
        &self,
        owner: &OwnerId,
        group: &ConflictGroup,
        resolved_by: &str,
        resolution_type: ResolutionType,
        notes: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<Resolution> {
        if group.len() < 2 {
            return Err(Error::InvalidResolution(format!(
                "a conflict group needs at least two members, got {}",
                group.len()
            )));
        }

        let group_key = group.key();
        let notes = normalize_text_option(notes.map(str::to_string));
        let tx = self.conn.unchecked_transaction()?;

        // Atomic upsert on the (owner_id, group_key) unique constraint
        let id: String = tx.query_row(
            "INSERT INTO conflict_resolutions
                (id, owner_id, group_key, conflict_date, resolved_at, resolved_by, resolution_type, notes, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(owner_id, group_key) DO UPDATE SET
                conflict_date = excluded.conflict_date,
                resolved_at = excluded.resolved_at,
                resolved_by = excluded.resolved_by,
                resolution_type = excluded.resolution_type,
                notes = excluded.notes,
                expires_at = excluded.expires_at
             RETURNING id",
            params![
                ResolutionId::new().as_str(),
                owner.as_str(),
                group_key,
                group.conflict_date.format("%Y-%m-%d").to_string(),
                unix_millis_now(),
                resolved_by.trim(),
                resolution_type.as_str(),
                notes,
                expires_at
            ],
            |row| row.get(0),
        )?;

        for member in group.members() {
            tx.execute(
                "INSERT OR IGNORE INTO conflict_resolution_members (resolution_id, owner_id, kind, event_id)
                 VALUES (?, ?, ?, ?)",
                params![id, owner.as_str(), member.kind.as_str(), member.id],
            )?;
        }
        tx.commit()?;

        tracing::debug!(owner = %owner, group = %group_key, "Recorded conflict resolution");
        self.lookup_resolution(owner, group)?
            .ok_or_else(|| Error::NotFound(group_key))
    }

    fn lookup_resolution(
        &self,
        owner: &OwnerId,
        group: &ConflictGroup,
    ) -> Result<Option<Resolution>> {
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RESOLUTION_COLUMNS} FROM conflict_resolutions WHERE owner_id = ? AND group_key = ?"
                ),
                params![owner.as_str(), group.key()],
                Self::parse_resolution,
            )
            .optional()?;
        Ok(found)
    }

    fn delete_resolution(&self, owner: &OwnerId, group: &ConflictGroup) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM conflict_resolutions WHERE owner_id = ? AND group_key = ?",
            params![owner.as_str(), group.key()],
        )?;
        Ok(rows > 0)
    }

    fn list_resolutions(&self, owner: &OwnerId) -> Result<Vec<Resolution>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOLUTION_COLUMNS} FROM conflict_resolutions
             WHERE owner_id = ?
             ORDER BY conflict_date ASC, group_key ASC"
        ))?;

        let resolutions = stmt
            .query_map(params![owner.as_str()], Self::parse_resolution)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(resolutions)
    }

    fn delete_resolutions_involving(&self, owner: &OwnerId, event: EventRef) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM conflict_resolutions
             WHERE owner_id = ?1 AND id IN (
                SELECT resolution_id FROM conflict_resolution_members
                WHERE owner_id = ?1 AND kind = ?2 AND event_id = ?3
             )",
            params![owner.as_str(), event.kind.as_str(), event.id],
        )?;
        if rows > 0 {
            tracing::info!(owner = %owner, event = %event, "Removed {rows} resolution(s) involving deleted event");
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn owner() -> OwnerId {
        OwnerId::new("performer-1").unwrap()
    }

    fn group(members: &[EventRef]) -> ConflictGroup {
        ConflictGroup::new(
            members.iter().copied(),
            NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
        )
    }

    #[test]
    fn test_record_and_lookup() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let pair = group(&[EventRef::enquiry(2), EventRef::booking(1)]);

        let recorded = ledger
            .record_resolution(&owner(), &pair, "sam", ResolutionType::Accepted, Some("both fine"))
            .unwrap();
        assert_eq!(recorded.group, pair);
        assert_eq!(recorded.notes.as_deref(), Some("both fine"));

        let found = ledger.lookup_resolution(&owner(), &pair).unwrap().unwrap();
        assert_eq!(found, recorded);
    }

    #[test]
    fn test_record_twice_updates_in_place() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let pair = group(&[EventRef::booking(1), EventRef::booking(2)]);

        let first = ledger
            .record_resolution(&owner(), &pair, "sam", ResolutionType::Accepted, None)
            .unwrap();
        let second = ledger
            .record_resolution(&owner(), &pair, "alex", ResolutionType::Dismissed, Some("checked"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.resolved_by, "alex");
        assert_eq!(second.resolution_type, ResolutionType::Dismissed);
        assert!(second.resolved_at >= first.resolved_at);
        assert_eq!(ledger.list_resolutions(&owner()).unwrap().len(), 1);
    }

    #[test]
    fn test_single_member_group_is_rejected() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let lonely = group(&[EventRef::booking(1), EventRef::booking(1)]);

        let result =
            ledger.record_resolution(&owner(), &lonely, "sam", ResolutionType::Accepted, None);
        assert!(matches!(result, Err(Error::InvalidResolution(_))));
    }

    #[test]
    fn test_lookup_is_exact() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let pair = group(&[EventRef::booking(1), EventRef::booking(2)]);
        let triple = group(&[EventRef::booking(1), EventRef::booking(2), EventRef::enquiry(3)]);

        ledger
            .record_resolution(&owner(), &triple, "sam", ResolutionType::Accepted, None)
            .unwrap();

        assert!(ledger.lookup_resolution(&owner(), &pair).unwrap().is_none());
        let other_owner = OwnerId::new("performer-2").unwrap();
        assert!(ledger
            .lookup_resolution(&other_owner, &triple)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_resolution() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let pair = group(&[EventRef::booking(1), EventRef::booking(2)]);

        ledger
            .record_resolution(&owner(), &pair, "sam", ResolutionType::Accepted, None)
            .unwrap();
        assert!(ledger.delete_resolution(&owner(), &pair).unwrap());
        assert!(!ledger.delete_resolution(&owner(), &pair).unwrap());
        assert!(ledger.lookup_resolution(&owner(), &pair).unwrap().is_none());
    }

    #[test]
    fn test_delete_resolutions_involving_event() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let first = group(&[EventRef::booking(1), EventRef::enquiry(12)]);
        let second = group(&[EventRef::booking(12), EventRef::enquiry(13)]);

        ledger
            .record_resolution(&owner(), &first, "sam", ResolutionType::Accepted, None)
            .unwrap();
        ledger
            .record_resolution(&owner(), &second, "sam", ResolutionType::Accepted, None)
            .unwrap();

        let removed = ledger
            .delete_resolutions_involving(&owner(), EventRef::enquiry(12))
            .unwrap();
        assert_eq!(removed, 1);

        let remaining = ledger.list_resolutions(&owner()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].group, second);
    }

    #[test]
    fn test_expiry_is_stored() {
        let db = setup();
        let ledger = SqliteResolutionLedger::new(db.connection());
        let pair = group(&[EventRef::booking(1), EventRef::booking(2)]);

        let recorded = ledger
            .record_resolution_until(
                &owner(),
                &pair,
                "sam",
                ResolutionType::Rescheduled,
                None,
                Some(42),
            )
            .unwrap();
        assert_eq!(recorded.expires_at, Some(42));
        assert!(!recorded.is_active(42));
    }
}
