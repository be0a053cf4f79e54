//! Persistent per-subject death counters backed by SQLite.
//!
//! Increments are a single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING`
//! statement, so concurrent writers serialise on SQLite's write lock and a
//! reader never observes half of an upsert. WAL mode lets the command
//! surface read while the tailer writes.
//!
//! Migration is applied inline via `include_str!` on first open.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::TailError;

/// Counter row for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Subject name, in the casing first recorded.
    pub subject: String,
    /// All-time count.
    pub total_count: u64,
    /// Count within the current season; 0 when no season is configured.
    pub period_count: u64,
    /// Season the period count belongs to.
    pub period_label: Option<String>,
}

impl DeathRecord {
    /// A zeroed record for a subject that has never been counted.
    pub fn unknown(subject: &str, period_label: Option<&str>) -> Self {
        Self {
            subject: subject.to_owned(),
            total_count: 0,
            period_count: 0,
            period_label: period_label.map(str::to_owned),
        }
    }
}

/// Raw row tuple from the `deaths` table.
type DeathRow = (String, i64, i64, Option<String>);

fn row_into_record(row: DeathRow) -> DeathRecord {
    let (subject, total, period, period_label) = row;
    DeathRecord {
        subject,
        total_count: u64::try_from(total).unwrap_or(0),
        period_count: u64::try_from(period).unwrap_or(0),
        period_label,
    }
}

/// Concurrency-safe subject → count store.
#[derive(Debug, Clone)]
pub struct CounterStore {
    pool: SqlitePool,
    season: Option<String>,
}

impl CounterStore {
    /// Open (or create) the store at `path` and apply the schema.
    ///
    /// `season` scopes the period counter. `None` selects the non-seasonal
    /// variant, where period counts stay at zero.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::StoreInit`] if the database cannot be opened,
    /// created, or migrated. Callers should abort startup.
    pub async fn open(path: &Path, season: Option<String>) -> Result<Self, TailError> {
        let init_err = |reason: String| TailError::StoreInit {
            path: path.to_owned(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| init_err(format!("failed to create {}: {e}", parent.display())))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("trusted_schema", "OFF");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| init_err(e.to_string()))?;

        let migration_sql = include_str!("../migrations/001_humbler_schema.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&pool)
            .await
            .map_err(|e| init_err(format!("schema migration failed: {e}")))?;

        let season = season
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(Self { pool, season })
    }

    /// Season label period counts are scoped to.
    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    /// Atomically add one death for `subject` and return the updated record.
    ///
    /// Creates the row with both counters at 1 when absent. A row carrying a
    /// different season label has its period counter restarted at 1.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::StoreWrite`] if the upsert fails. The event must
    /// not be reported as counted.
    pub async fn increment(&self, subject: &str) -> Result<DeathRecord, TailError> {
        let row: DeathRow = sqlx::query_as(
            r"INSERT INTO deaths (username, death_count, period_count, period_label)
              VALUES (?1, 1, CASE WHEN ?2 IS NULL THEN 0 ELSE 1 END, ?2)
              ON CONFLICT(username) DO UPDATE SET
                death_count = death_count + 1,
                period_count = CASE
                    WHEN ?2 IS NULL THEN period_count
                    WHEN period_label IS ?2 THEN period_count + 1
                    ELSE 1
                END,
                period_label = COALESCE(?2, period_label)
              RETURNING username, death_count, period_count, period_label",
        )
        .bind(subject)
        .bind(self.season.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|source| TailError::StoreWrite {
            subject: subject.to_owned(),
            source,
        })?;

        Ok(row_into_record(row))
    }

    /// Look up a subject, ignoring case.
    ///
    /// The period count reads as 0 when the row belongs to another season.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn get(&self, subject: &str) -> Result<Option<DeathRecord>, sqlx::Error> {
        let row: Option<DeathRow> = sqlx::query_as(
            "SELECT username, death_count,
                    CASE WHEN period_label IS ?2 THEN period_count ELSE 0 END,
                    ?2
             FROM deaths
             WHERE username = ?1",
        )
        .bind(subject)
        .bind(self.season.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_into_record))
    }

    /// Look up a subject, returning zeroed counts when it is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn counts_for(&self, subject: &str) -> Result<DeathRecord, sqlx::Error> {
        Ok(self
            .get(subject)
            .await?
            .unwrap_or_else(|| DeathRecord::unknown(subject, self.season.as_deref())))
    }

    /// All subjects, highest current-season count first.
    ///
    /// Ties break on total count, then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn list_all(&self) -> Result<Vec<DeathRecord>, sqlx::Error> {
        let rows: Vec<DeathRow> = sqlx::query_as(
            "SELECT username, death_count, period, ?1
             FROM (
                SELECT username, death_count,
                       CASE WHEN period_label IS ?1 THEN period_count ELSE 0 END AS period
                FROM deaths
             )
             ORDER BY period DESC, death_count DESC, username ASC",
        )
        .bind(self.season.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_into_record).collect())
    }
}
