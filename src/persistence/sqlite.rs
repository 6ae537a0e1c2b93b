//! SQLite-backed implementation of the repository traits.
//!
//! Queries are bound at runtime; the schema is created idempotently by
//! [`SqliteStore::run_migrations`] at startup.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{
    Check, CheckId, Condition, Contact, MaintenanceKind, MaintenanceWindow, StateEntry, Transport,
};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{
    CheckRepository, ContactRepository, MaintenanceStore, StateStore,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS checks (
        id TEXT PRIMARY KEY,
        entity TEXT NOT NULL,
        name TEXT NOT NULL,
        tags TEXT NOT NULL,
        enabled INTEGER NOT NULL,
        failing INTEGER NOT NULL,
        ack_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS state_entries (
        check_id TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        condition TEXT NOT NULL,
        summary TEXT NOT NULL,
        details TEXT NOT NULL,
        perfdata TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_state_entries_check_ts
        ON state_entries (check_id, timestamp)",
    "CREATE TABLE IF NOT EXISTS maintenance_windows (
        id TEXT PRIMARY KEY,
        check_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        end_time INTEGER NOT NULL,
        summary TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_maintenance_check_kind_start
        ON maintenance_windows (check_id, kind, start_time)",
    "CREATE TABLE IF NOT EXISTS contacts (
        id TEXT PRIMARY KEY,
        payload TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sends (
        contact_id TEXT NOT NULL,
        transport TEXT NOT NULL,
        check_id TEXT NOT NULL,
        condition TEXT NOT NULL,
        sent_at INTEGER NOT NULL,
        PRIMARY KEY (contact_id, transport, check_id, condition)
    )",
    "CREATE TABLE IF NOT EXISTS alerting_media (
        contact_id TEXT NOT NULL,
        transport TEXT NOT NULL,
        check_id TEXT NOT NULL,
        PRIMARY KEY (contact_id, transport, check_id)
    )",
];

/// Repository implementation over a SQLite connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to the given database URL, creating the file if needed.
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Applies the schema. Safe to run on every startup.
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        }
        Ok(())
    }

    fn check_from_row(row: &SqliteRow) -> Result<Check, PersistenceError> {
        let entity: String = row.try_get("entity")?;
        let name: String = row.try_get("name")?;
        let tags_json: String = row.try_get("tags")?;
        Ok(Check {
            id: CheckId::new(entity, name),
            tags: serde_json::from_str(&tags_json)?,
            enabled: row.try_get("enabled")?,
            failing: row.try_get("failing")?,
            ack_hash: row.try_get("ack_hash")?,
        })
    }

    fn entry_from_row(row: &SqliteRow) -> Result<StateEntry, PersistenceError> {
        let condition: String = row.try_get("condition")?;
        Ok(StateEntry {
            condition: Condition::from_str(&condition)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?,
            timestamp: row.try_get("timestamp")?,
            summary: row.try_get("summary")?,
            details: row.try_get("details")?,
            perfdata: row.try_get("perfdata")?,
        })
    }

    fn window_from_row(row: &SqliteRow) -> Result<MaintenanceWindow, PersistenceError> {
        let id: String = row.try_get("id")?;
        Ok(MaintenanceWindow {
            id: Uuid::parse_str(&id)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            summary: row.try_get("summary")?,
        })
    }
}

#[async_trait]
impl CheckRepository for SqliteStore {
    async fn upsert_check(&self, check: &Check) -> Result<(), PersistenceError> {
        let tags = serde_json::to_string(&check.tags)?;
        sqlx::query(
            "INSERT OR REPLACE INTO checks (id, entity, name, tags, enabled, failing, ack_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(check.id.to_string())
        .bind(&check.id.entity)
        .bind(&check.id.name)
        .bind(tags)
        .bind(check.enabled)
        .bind(check.failing)
        .bind(&check.ack_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_check(&self, id: &CheckId) -> Result<Option<Check>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM checks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::check_from_row).transpose()
    }

    async fn checks_by_tag(&self, tag: &str) -> Result<Vec<Check>, PersistenceError> {
        // tags are a JSON array; membership is filtered here rather than in SQL
        let rows = sqlx::query("SELECT * FROM checks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut checks = Vec::new();
        for row in &rows {
            let check = Self::check_from_row(row)?;
            if check.tags.contains(tag) {
                checks.push(check);
            }
        }
        Ok(checks)
    }

    async fn all_checks(&self) -> Result<Vec<Check>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM checks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::check_from_row).collect()
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    #[tracing::instrument(skip(self, entry), level = "debug")]
    async fn append_entry(
        &self,
        check: &CheckId,
        entry: &StateEntry,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO state_entries (check_id, timestamp, condition, summary, details, perfdata)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(check.to_string())
        .bind(entry.timestamp)
        .bind(entry.condition.as_str())
        .bind(&entry.summary)
        .bind(&entry.details)
        .bind(&entry.perfdata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entries_in_range(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<StateEntry>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM state_entries
             WHERE check_id = ?
               AND (? IS NULL OR timestamp >= ?)
               AND (? IS NULL OR timestamp <= ?)
             ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(check.to_string())
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn latest_entry(
        &self,
        check: &CheckId,
    ) -> Result<Option<StateEntry>, PersistenceError> {
        let row = sqlx::query(
            "SELECT * FROM state_entries WHERE check_id = ?
             ORDER BY timestamp DESC, rowid DESC LIMIT 1",
        )
        .bind(check.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::entry_from_row).transpose()
    }

    async fn entry_before(
        &self,
        check: &CheckId,
        t: i64,
    ) -> Result<Option<StateEntry>, PersistenceError> {
        let row = sqlx::query(
            "SELECT * FROM state_entries WHERE check_id = ? AND timestamp < ?
             ORDER BY timestamp DESC, rowid DESC LIMIT 1",
        )
        .bind(check.to_string())
        .bind(t)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::entry_from_row).transpose()
    }
}

#[async_trait]
impl MaintenanceStore for SqliteStore {
    #[tracing::instrument(skip(self, window), level = "debug")]
    async fn add_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        window: &MaintenanceWindow,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO maintenance_windows (id, check_id, kind, start_time, end_time, summary)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(window.id.to_string())
        .bind(check.to_string())
        .bind(kind.to_string())
        .bind(window.start_time)
        .bind(window.end_time)
        .bind(&window.summary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<Option<MaintenanceWindow>, PersistenceError> {
        let row = sqlx::query(
            "SELECT * FROM maintenance_windows WHERE id = ? AND check_id = ? AND kind = ?",
        )
        .bind(id.to_string())
        .bind(check.to_string())
        .bind(kind.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::window_from_row).transpose()
    }

    async fn update_window_end(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
        end_time: i64,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE maintenance_windows SET end_time = ?
             WHERE id = ? AND check_id = ? AND kind = ?",
        )
        .bind(end_time)
        .bind(id.to_string())
        .bind(check.to_string())
        .bind(kind.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("{kind} maintenance {id}")));
        }
        Ok(())
    }

    async fn delete_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM maintenance_windows WHERE id = ? AND check_id = ? AND kind = ?")
            .bind(id.to_string())
            .bind(check.to_string())
            .bind(kind.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn windows_intersecting(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM maintenance_windows
             WHERE check_id = ? AND kind = ?
               AND (? IS NULL OR start_time < ?)
               AND (? IS NULL OR end_time > ?)
             ORDER BY start_time ASC",
        )
        .bind(check.to_string())
        .bind(kind.to_string())
        .bind(to)
        .bind(to)
        .bind(from)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::window_from_row).collect()
    }

    async fn open_windows_at(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        t: i64,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM maintenance_windows
             WHERE check_id = ? AND kind = ? AND start_time <= ? AND end_time > ?
             ORDER BY start_time ASC",
        )
        .bind(check.to_string())
        .bind(kind.to_string())
        .bind(t)
        .bind(t)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::window_from_row).collect()
    }
}

#[async_trait]
impl ContactRepository for SqliteStore {
    async fn upsert_contact(&self, contact: &Contact) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(contact)?;
        sqlx::query("INSERT OR REPLACE INTO contacts (id, payload) VALUES (?, ?)")
            .bind(contact.id.to_string())
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, PersistenceError> {
        let row = sqlx::query("SELECT payload FROM contacts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn all_contacts(&self) -> Result<Vec<Contact>, PersistenceError> {
        let rows = sqlx::query("SELECT payload FROM contacts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut contacts = Vec::new();
        for row in &rows {
            let payload: String = row.try_get("payload")?;
            contacts.push(serde_json::from_str(&payload)?);
        }
        Ok(contacts)
    }

    async fn record_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
        time: i64,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT OR REPLACE INTO sends (contact_id, transport, check_id, condition, sent_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(contact.to_string())
        .bind(transport.as_str())
        .bind(check.to_string())
        .bind(condition.as_str())
        .bind(time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
    ) -> Result<Option<i64>, PersistenceError> {
        let row = sqlx::query(
            "SELECT sent_at FROM sends
             WHERE contact_id = ? AND transport = ? AND check_id = ? AND condition = ?",
        )
        .bind(contact.to_string())
        .bind(transport.as_str())
        .bind(check.to_string())
        .bind(condition.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.try_get("sent_at")).transpose().map_err(PersistenceError::from)
    }

    async fn clear_sends(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM sends WHERE contact_id = ? AND transport = ? AND check_id = ?")
            .bind(contact.to_string())
            .bind(transport.as_str())
            .bind(check.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT OR REPLACE INTO alerting_media (contact_id, transport, check_id)
             VALUES (?, ?, ?)",
        )
        .bind(contact.to_string())
        .bind(transport.as_str())
        .bind(check.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "DELETE FROM alerting_media
             WHERE contact_id = ? AND transport = ? AND check_id = ?",
        )
        .bind(contact.to_string())
        .bind(transport.as_str())
        .bind(check.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn alerting_checks(
        &self,
        contact: Uuid,
        transport: Transport,
    ) -> Result<Vec<CheckId>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT check_id FROM alerting_media
             WHERE contact_id = ? AND transport = ? ORDER BY check_id",
        )
        .bind(contact.to_string())
        .bind(transport.as_str())
        .fetch_all(&self.pool)
        .await?;
        let mut checks = Vec::new();
        for row in &rows {
            let raw: String = row.try_get("check_id")?;
            checks.push(
                raw.parse::<CheckId>()
                    .map_err(|e| PersistenceError::Serialization(e.to_string()))?,
            );
        }
        Ok(checks)
    }
}
