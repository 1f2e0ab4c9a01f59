//! Conflict service: fetch, aggregate, and write back per owner.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::conflicts::{aggregate, apply, normalize, ConflictReport, WriteReport};
use crate::db::{
    Database, EventRepository, ResolutionLedger, SqliteEventRepository, SqliteResolutionLedger,
};
use crate::error::{Error, Result};
use crate::models::{
    ConflictGroup, Event, EventDraft, EventRef, OwnerId, Resolution, ResolutionType,
};
use crate::util::unix_millis_now;

/// Outcome of one full recompute for an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    pub conflicts: ConflictReport,
    pub writes: WriteReport,
}

/// Thread-safe service wrapping the conflict engine and its stores.
///
/// Recomputes for the same owner are serialized; different owners only
/// share the database lock, and aggregation itself runs outside it.
#[derive(Clone)]
pub struct ConflictService {
    db: Arc<Mutex<Database>>,
    config: Arc<EngineConfig>,
    owner_locks: Arc<std::sync::Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>>,
}

impl ConflictService {
    /// Wrap an already opened database.
    #[must_use]
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            owner_locks: Arc::default(),
        }
    }

    /// Open a service on the database at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(Database::open(&db_path)?, config))
    }

    /// Open an in-memory service (primarily for tests).
    pub fn open_in_memory(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, config))
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn owner_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        let mut locks = self
            .owner_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(owner.clone()).or_default())
    }

    /// Recompute and persist every conflict summary of `owner`.
    ///
    /// Fetch errors abort the run before anything is written; individual
    /// write failures are reported in [`WriteReport`].
    pub async fn recompute(&self, owner: &OwnerId) -> Result<RecomputeReport> {
        let lock = self.owner_lock(owner);
        let result = {
            let _serialized = lock.lock().await;
            self.recompute_serialized(owner).await
        };
        drop(lock);
        self.release_idle_owner_locks();
        result
    }

    /// Drop lock entries no recompute is holding or waiting on.
    fn release_idle_owner_locks(&self) {
        let mut locks = self
            .owner_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    async fn recompute_serialized(&self, owner: &OwnerId) -> Result<RecomputeReport> {
        let (events, resolutions) = self.snapshot(owner).await?;
        let conflicts = aggregate(
            owner,
            &events,
            &resolutions,
            &self.config,
            unix_millis_now(),
        );

        let writes = {
            let db = self.db.lock().await;
            let repo = SqliteEventRepository::new(db.connection());
            apply(&repo, owner, &events, &conflicts)
        };

        tracing::info!(
            owner = %owner,
            events = events.len(),
            conflicted = conflicts.conflicted_count(),
            groups = conflicts.groups.len(),
            updated = writes.updated,
            failed = writes.failed,
            "Recomputed booking conflicts"
        );

        Ok(RecomputeReport { conflicts, writes })
    }

    /// Compute the current conflict report without writing anything.
    pub async fn report(&self, owner: &OwnerId) -> Result<ConflictReport> {
        let (events, resolutions) = self.snapshot(owner).await?;
        Ok(aggregate(
            owner,
            &events,
            &resolutions,
            &self.config,
            unix_millis_now(),
        ))
    }

    async fn snapshot(&self, owner: &OwnerId) -> Result<(Vec<Event>, Vec<Resolution>)> {
        let db = self.db.lock().await;
        let events = SqliteEventRepository::new(db.connection()).fetch_events_for_owner(owner)?;
        let resolutions = SqliteResolutionLedger::new(db.connection()).list_resolutions(owner)?;
        Ok((events, resolutions))
    }

    /// List an owner's events with their last persisted conflict fields.
    pub async fn events(&self, owner: &OwnerId) -> Result<Vec<Event>> {
        let db = self.db.lock().await;
        SqliteEventRepository::new(db.connection()).fetch_events_for_owner(owner)
    }

    /// Fetch one event.
    pub async fn get_event(&self, owner: &OwnerId, event: EventRef) -> Result<Option<Event>> {
        let db = self.db.lock().await;
        SqliteEventRepository::new(db.connection()).get(owner, event)
    }

    /// Create an event and recompute; returns the event with fresh flags.
    pub async fn create_event(&self, owner: &OwnerId, draft: &EventDraft) -> Result<Event> {
        let created = {
            let db = self.db.lock().await;
            SqliteEventRepository::new(db.connection()).create(owner, draft)?
        };
        self.refreshed(owner, created.event_ref()).await
    }

    /// Replace an event's fields and recompute.
    pub async fn update_event(
        &self,
        owner: &OwnerId,
        event: EventRef,
        draft: &EventDraft,
    ) -> Result<Event> {
        {
            let db = self.db.lock().await;
            SqliteEventRepository::new(db.connection()).update(owner, event, draft)?;
        }
        self.refreshed(owner, event).await
    }

    async fn refreshed(&self, owner: &OwnerId, event: EventRef) -> Result<Event> {
        self.recompute(owner).await?;
        self.get_event(owner, event)
            .await?
            .ok_or_else(|| Error::NotFound(event.to_string()))
    }

    /// Delete an event, drop resolutions it was part of, and recompute.
    ///
    /// Returns the number of resolutions removed.
    pub async fn delete_event(&self, owner: &OwnerId, event: EventRef) -> Result<usize> {
        let removed = {
            let db = self.db.lock().await;
            let tx = db.connection().unchecked_transaction()?;
            let removed =
                SqliteResolutionLedger::new(&tx).delete_resolutions_involving(owner, event)?;
            SqliteEventRepository::new(&tx).delete(owner, event)?;
            tx.commit()?;
            removed
        };
        self.recompute(owner).await?;
        Ok(removed)
    }

    /// Record that the user accepted the conflict between `members`.
    ///
    /// Every member must currently exist for `owner` and share one usable
    /// calendar day.
    pub async fn resolve(
        &self,
        owner: &OwnerId,
        members: &[EventRef],
        resolved_by: &str,
        resolution_type: ResolutionType,
        notes: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<Resolution> {
        let resolution = {
            let db = self.db.lock().await;
            let events =
                SqliteEventRepository::new(db.connection()).fetch_events_for_owner(owner)?;
            let group = self.validated_group(&events, members)?;
            SqliteResolutionLedger::new(db.connection()).record_resolution_until(
                owner,
                &group,
                resolved_by,
                resolution_type,
                notes,
                expires_at,
            )?
        };
        self.recompute(owner).await?;
        Ok(resolution)
    }

    fn validated_group(&self, events: &[Event], members: &[EventRef]) -> Result<ConflictGroup> {
        let mut members = members.to_vec();
        members.sort_unstable();
        members.dedup();
        if members.len() < 2 {
            return Err(Error::InvalidResolution(format!(
                "a conflict group needs at least two members, got {}",
                members.len()
            )));
        }

        let by_ref = events
            .iter()
            .map(|event| (event.event_ref(), event))
            .collect::<HashMap<_, _>>();

        let mut day = None;
        for member in &members {
            let event = by_ref.get(member).ok_or_else(|| {
                Error::InvalidResolution(format!("{member} is not in this owner's calendar"))
            })?;
            if event.is_status_excluded(&self.config.excluded_enquiry_statuses) {
                return Err(Error::InvalidResolution(format!(
                    "{member} is {} and cannot be in conflict",
                    event.status
                )));
            }
            let member_day = normalize(event)
                .interval()
                .map(|interval| interval.day)
                .ok_or_else(|| {
                    Error::InvalidResolution(format!("{member} has no usable date"))
                })?;
            match day {
                None => day = Some(member_day),
                Some(existing) if existing != member_day => {
                    return Err(Error::InvalidResolution(format!(
                        "members fall on different days ({existing} and {member_day})"
                    )));
                }
                Some(_) => {}
            }
        }

        let day = day.ok_or_else(|| Error::InvalidResolution("empty conflict group".into()))?;
        Ok(ConflictGroup::new(members, day))
    }

    /// Remove the resolution for exactly `members`; returns whether one existed.
    pub async fn unresolve(&self, owner: &OwnerId, members: &[EventRef]) -> Result<bool> {
        let key = ConflictGroup::key_of(members);
        let removed = {
            let db = self.db.lock().await;
            let ledger = SqliteResolutionLedger::new(db.connection());
            match ledger
                .list_resolutions(owner)?
                .into_iter()
                .find(|resolution| resolution.group.key() == key)
            {
                Some(resolution) => ledger.delete_resolution(owner, &resolution.group)?,
                None => false,
            }
        };
        if removed {
            self.recompute(owner).await?;
        }
        Ok(removed)
    }

    /// List an owner's resolutions.
    pub async fn resolutions(&self, owner: &OwnerId) -> Result<Vec<Resolution>> {
        let db = self.db.lock().await;
        SqliteResolutionLedger::new(db.connection()).list_resolutions(owner)
    }
}
