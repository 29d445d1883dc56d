//! SQLite-backed store for contacts and deals.
//!
//! The database lives at `~/.dealdesk/dealdesk.db` unless `databasePath` is
//! set in the config. One connection is shared behind a mutex; every call
//! sleeps for its simulated latency first and only then takes the lock, so
//! no guard is ever held across an await.

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::entity::EntityKind;
use crate::error::CrmError;
use crate::store::{simulate_latency, DataService, Record, StoreOp};
use crate::types::{Contact, Deal, LatencyConfig};

mod contacts;
mod deals;
pub mod types;
pub use types::*;

/// Row mapping for a record type persisted in its own table.
pub trait SqlRecord: Record {
    /// Column list, `id` first, in the order `from_row` reads them.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Insert the record. `id: None` lets SQLite assign the next id.
    fn insert(&self, conn: &Connection, id: Option<u64>) -> rusqlite::Result<u64>;

    /// Overwrite every column of the existing row.
    fn write(&self, conn: &Connection) -> rusqlite::Result<usize>;

    fn with_id(self, id: u64) -> Self;
}

pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a `FromStr` failure on a text column into a rusqlite conversion error.
pub(crate) fn text_conversion(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
    latency: LatencyConfig,
    faults: Mutex<VecDeque<(EntityKind, StoreOp, String)>>,
}

impl SqliteStore {
    /// Open the database at the default location, creating it if needed.
    pub fn open(latency: LatencyConfig) -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path, latency)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf, latency: LatencyConfig) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        log::info!("Opened database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            latency,
            faults: Mutex::new(VecDeque::new()),
        })
    }

    /// Resolve the default database path: `~/.dealdesk/dealdesk.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".dealdesk").join("dealdesk.db"))
    }

    /// Load the seed data into empty tables. Tables that already hold rows are
    /// left alone. Seed ids are kept, so the id sequence resumes after them.
    pub fn seed_if_empty(&self, contacts: &[Contact], deals: &[Deal]) -> Result<usize, DbError> {
        let conn = self.conn.lock();
        let mut inserted = 0;
        inserted += seed_table(&conn, contacts)?;
        inserted += seed_table(&conn, deals)?;
        if inserted > 0 {
            log::info!("Seeded database with {} records", inserted);
        }
        Ok(inserted)
    }

    /// Make the next `op` call on `kind` fail with `CrmError::TransientIo`.
    pub fn inject_failure(&self, kind: EntityKind, op: StoreOp, message: impl Into<String>) {
        self.faults.lock().push_back((kind, op, message.into()));
    }

    fn take_fault(&self, kind: EntityKind, op: StoreOp) -> Result<(), CrmError> {
        let mut faults = self.faults.lock();
        if let Some(pos) = faults.iter().position(|(k, o, _)| *k == kind && *o == op) {
            if let Some((_, _, message)) = faults.remove(pos) {
                log::warn!("{} {}: injected failure", kind.label(), op.as_str());
                return Err(CrmError::TransientIo(message));
            }
        }
        Ok(())
    }

    async fn begin(&self, kind: EntityKind, op: StoreOp) -> Result<(), CrmError> {
        simulate_latency(&self.latency, op).await;
        self.take_fault(kind, op)
    }
}

fn seed_table<T: SqlRecord>(conn: &Connection, records: &[T]) -> Result<usize, DbError> {
    let table = T::KIND.table();
    let existing: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    if existing > 0 {
        return Ok(0);
    }
    with_transaction(conn, |conn| {
        for record in records {
            record.insert(conn, Some(record.id())).map_err(DbError::from)?;
        }
        Ok(records.len())
    })
}

/// Execute a closure within a SQLite transaction.
/// Commits on Ok, rolls back on Err.
fn with_transaction<F, R, E>(conn: &Connection, f: F) -> Result<R, E>
where
    F: FnOnce(&Connection) -> Result<R, E>,
    E: From<DbError>,
{
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| E::from(DbError::from(e)))?;
    match f(conn) {
        Ok(val) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| E::from(DbError::from(e)))?;
            Ok(val)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn select_one<T: SqlRecord>(conn: &Connection, id: u64) -> rusqlite::Result<Option<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        T::COLUMNS,
        T::KIND.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map([id as i64], |row| T::from_row(row))?;
    rows.next().transpose()
}

fn select_all<T: SqlRecord>(conn: &Connection) -> rusqlite::Result<Vec<T>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id",
        T::COLUMNS,
        T::KIND.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| T::from_row(row))?;
    rows.collect()
}

#[async_trait]
impl<T: SqlRecord> DataService<T> for SqliteStore {
    async fn get_all(&self) -> Result<Vec<T>, CrmError> {
        self.begin(T::KIND, StoreOp::GetAll).await?;
        let result = {
            let conn = self.conn.lock();
            select_all::<T>(&conn)
        };
        Ok(result.map_err(DbError::from)?)
    }

    async fn get_by_id(&self, id: u64) -> Result<T, CrmError> {
        self.begin(T::KIND, StoreOp::GetById).await?;
        let result = {
            let conn = self.conn.lock();
            select_one::<T>(&conn, id)
        };
        result
            .map_err(DbError::from)?
            .ok_or_else(|| CrmError::not_found(T::KIND, id))
    }

    async fn create(&self, draft: T::Draft) -> Result<T, CrmError> {
        self.begin(T::KIND, StoreOp::Create).await?;
        // Validate before touching the database; the real id comes from SQLite.
        let record = T::from_draft(0, draft, Utc::now())?;
        let result = {
            let conn = self.conn.lock();
            // Read back what was stored; timestamps are kept at millisecond precision.
            record
                .insert(&conn, None)
                .and_then(|id| select_one::<T>(&conn, id).map(|row| (id, row)))
        };
        let (id, stored) = result.map_err(DbError::from)?;
        log::info!("Created {} {}", T::KIND.as_str(), id);
        Ok(stored.unwrap_or_else(|| record.with_id(id)))
    }

    async fn update(&self, id: u64, patch: T::Patch) -> Result<T, CrmError> {
        self.begin(T::KIND, StoreOp::Update).await?;
        let conn = self.conn.lock();
        with_transaction(&conn, |conn| {
            let mut record = select_one::<T>(conn, id)
                .map_err(DbError::from)?
                .ok_or_else(|| CrmError::not_found(T::KIND, id))?;
            record.apply_patch(patch, Utc::now())?;
            record.write(conn).map_err(DbError::from)?;
            let stored = select_one::<T>(conn, id).map_err(DbError::from)?;
            Ok::<T, CrmError>(stored.unwrap_or(record))
        })
    }

    async fn delete(&self, id: u64) -> Result<bool, CrmError> {
        self.begin(T::KIND, StoreOp::Delete).await?;
        let result = {
            let conn = self.conn.lock();
            conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", T::KIND.table()),
                [id as i64],
            )
        };
        let removed = result.map_err(DbError::from)?;
        if removed == 0 {
            return Err(CrmError::not_found(T::KIND, id));
        }
        log::info!("Deleted {} {}", T::KIND.as_str(), id);
        Ok(true)
    }
}


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::test_store;
    use super::*;
    use crate::services::change_stage;
    use crate::types::{
        ContactPatch, ContactStatus, DealPatch, DealStage, NewContact, NewDeal,
    };
    use chrono::{NaiveDate, TimeZone};

    fn contact(id: u64, name: &str) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            company: "Acme".to_string(),
            email: format!("{}@acme.test", name.to_lowercase()),
            status: ContactStatus::New,
            assigned_rep: "Sam".to_string(),
            last_activity: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            created_at: None,
        }
    }

    fn deal(id: u64, stage: DealStage) -> Deal {
        Deal {
            id,
            contact_id: 1,
            value: 5_000.0,
            stage,
            stage_entered_at: Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap(),
            expected_close_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            probability: 40,
            assigned_rep: "Sam".to_string(),
            notes: "Intro call done".to_string(),
        }
    }

    fn seeded() -> SqliteStore {
        let store = test_store();
        let contacts: Vec<Contact> = (1..=5).map(|i| contact(i, &format!("C{}", i))).collect();
        let deals = vec![deal(1, DealStage::Connected), deal(3, DealStage::MeetingDone)];
        store.seed_if_empty(&contacts, &deals).expect("seed");
        store
    }

    #[tokio::test]
    async fn test_seed_round_trips_rows() {
        let store = seeded();
        let deals: Vec<Deal> = store.get_all().await.expect("deals");
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[1], deal(3, DealStage::MeetingDone));
    }

    #[tokio::test]
    async fn test_seed_skips_populated_tables() {
        let store = seeded();
        let again = store
            .seed_if_empty(&[contact(9, "Late")], &[deal(9, DealStage::Lost)])
            .expect("seed");
        assert_eq!(again, 0);
        let contacts: Vec<Contact> = store.get_all().await.expect("contacts");
        assert_eq!(contacts.len(), 5);
    }

    #[tokio::test]
    async fn test_create_continues_after_seed_ids() {
        let store = seeded();
        let created: Contact = store
            .create(NewContact {
                name: "Nina".to_string(),
                company: "Globex".to_string(),
                email: "nina@globex.test".to_string(),
                status: ContactStatus::New,
                assigned_rep: String::new(),
            })
            .await
            .expect("create");
        assert_eq!(created.id, 6);
        assert!(created.created_at.is_some());
    }

    #[tokio::test]
    async fn test_deleted_id_is_not_reused() {
        let store = seeded();
        assert!(DataService::<Contact>::delete(&store, 5).await.expect("delete"));
        let created: Contact = store
            .create(NewContact {
                name: "Omar".to_string(),
                company: "Initech".to_string(),
                email: "omar@initech.test".to_string(),
                status: ContactStatus::Working,
                assigned_rep: String::new(),
            })
            .await
            .expect("create");
        assert_eq!(created.id, 6);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = seeded();
        let err = DataService::<Deal>::get_by_id(&store, 999).await.unwrap_err();
        assert_eq!(err, CrmError::not_found(EntityKind::Deal, 999));

        let err = DataService::<Deal>::update(&store, 999, DealPatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = DataService::<Contact>::delete(&store, 999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_persists_merge() {
        let store = seeded();
        let updated: Contact = store
            .update(
                2,
                ContactPatch {
                    status: Some(ContactStatus::Qualified),
                    ..ContactPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.status, ContactStatus::Qualified);
        assert_eq!(updated.name, "C2");

        let reread: Contact = store.get_by_id(2).await.expect("get");
        assert_eq!(reread, updated);
    }

    #[tokio::test]
    async fn test_rejected_update_rolls_back() {
        let store = seeded();
        let patch = DealPatch {
            stage: Some(DealStage::Closed),
            value: Some(-1.0),
            ..DealPatch::default()
        };
        let err = DataService::<Deal>::update(&store, 1, patch).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));

        let unchanged: Deal = store.get_by_id(1).await.expect("get");
        assert_eq!(unchanged, deal(1, DealStage::Connected));
    }

    #[tokio::test]
    async fn test_stage_update_stamps_entry_time() {
        let store = seeded();
        let before: Deal = store.get_by_id(1).await.expect("get");
        let updated: Deal = store
            .update(1, DealPatch::stage(DealStage::Negotiation))
            .await
            .expect("update");
        assert!(updated.stage_entered_at > before.stage_entered_at);

        let reread: Deal = store.get_by_id(1).await.expect("get");
        assert_eq!(reread.stage, DealStage::Negotiation);
        assert_eq!(reread.stage_entered_at, updated.stage_entered_at);
    }

    #[tokio::test]
    async fn test_back_to_back_stage_changes_keep_advancing() {
        let store = seeded();
        let mut previous: Deal = store.get_by_id(1).await.expect("get");
        for round in 0..200 {
            let target = if round % 2 == 0 { "Locked" } else { "Connected" };
            let change = change_stage(&store, 1, target).await.expect("change");
            assert!(change.changed);

            let reread: Deal = store.get_by_id(1).await.expect("get");
            assert!(
                reread.stage_entered_at > previous.stage_entered_at,
                "round {}: {} is not after {}",
                round,
                reread.stage_entered_at,
                previous.stage_entered_at
            );
            assert_eq!(reread.stage_entered_at, change.deal.stage_entered_at);
            previous = reread;
        }
    }

    #[tokio::test]
    async fn test_create_rejects_bad_probability() {
        let store = seeded();
        let draft = NewDeal {
            contact_id: 1,
            value: 100.0,
            stage: DealStage::Connected,
            expected_close_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            probability: 101,
            assigned_rep: String::new(),
            notes: String::new(),
        };
        let err = DataService::<Deal>::create(&store, draft).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        let deals: Vec<Deal> = store.get_all().await.expect("deals");
        assert_eq!(deals.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_is_scoped_to_entity() {
        let store = seeded();
        store.inject_failure(EntityKind::Deal, StoreOp::GetAll, "disk hiccup");

        let contacts: Result<Vec<Contact>, _> = store.get_all().await;
        assert!(contacts.is_ok());

        let deals: Result<Vec<Deal>, _> = store.get_all().await;
        assert!(deals.unwrap_err().is_retryable());

        let deals: Vec<Deal> = store.get_all().await.expect("fault is consumed");
        assert_eq!(deals.len(), 2);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dealdesk.db");
        {
            let store = SqliteStore::open_at(path.clone(), LatencyConfig::none()).expect("open");
            store.seed_if_empty(&[contact(1, "Ada")], &[]).expect("seed");
        }
        let store = SqliteStore::open_at(path, LatencyConfig::none()).expect("reopen");
        let seeded = store.seed_if_empty(&[contact(2, "Bo")], &[]).expect("seed");
        assert_eq!(seeded, 0);
    }
}
