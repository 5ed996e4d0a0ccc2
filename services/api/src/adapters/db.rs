//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `TrackerStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use series_learner_core::domain::{
    ContentType, Language, NewWatchLog, OwnerKey, Profile, Title, WatchLog,
};
use series_learner_core::ports::{PortError, PortResult, TrackerStore, TrackerTransaction};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TrackerStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl TrackerStore for DbAdapter {
    async fn begin(&self) -> PortResult<Box<dyn TrackerTransaction>> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(DbTransaction { tx }))
    }
}

/// One Postgres transaction. `sqlx` rolls it back when dropped uncommitted.
pub struct DbTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Connection-level failures surface as configuration errors; the rest are unexpected.
fn db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::Configuration(_)
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => PortError::Configuration(e.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    owner_key: String,
    display_name: String,
    learning_language_code: String,
    learning_language_label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            owner_key: OwnerKey::new(self.owner_key),
            display_name: self.display_name,
            learning_language_code: self.learning_language_code,
            learning_language_label: self.learning_language_label,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct LanguageRecord {
    code: String,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl LanguageRecord {
    fn to_domain(self) -> Language {
        Language {
            code: self.code,
            label: self.label,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TitleRecord {
    id: Uuid,
    owner_key: String,
    name: String,
    content_type: String,
    language_code: String,
    default_unit_minutes: Option<i64>,
    total_units: i64,
    total_minutes: i64,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl TitleRecord {
    fn to_domain(self) -> PortResult<Title> {
        let content_type = ContentType::parse(&self.content_type).ok_or_else(|| {
            PortError::Unexpected(format!(
                "Title {} has unknown content type '{}'",
                self.id, self.content_type
            ))
        })?;
        Ok(Title {
            id: self.id,
            owner_key: OwnerKey::new(self.owner_key),
            name: self.name,
            content_type,
            language_code: self.language_code,
            default_unit_minutes: self.default_unit_minutes,
            total_units: self.total_units,
            total_minutes: self.total_minutes,
            archived: self.archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct WatchLogRecord {
    id: Uuid,
    owner_key: String,
    title_id: Uuid,
    units: i64,
    unit_minutes: i64,
    total_minutes: i64,
    logged_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    insertion_order: i64,
}
impl WatchLogRecord {
    fn to_domain(self) -> WatchLog {
        WatchLog {
            id: self.id,
            owner_key: OwnerKey::new(self.owner_key),
            title_id: self.title_id,
            units: self.units,
            unit_minutes: self.unit_minutes,
            total_minutes: self.total_minutes,
            logged_at: self.logged_at,
            created_at: self.created_at,
            insertion_order: self.insertion_order,
        }
    }
}

const TITLE_COLUMNS: &str = "id, owner_key, name, content_type, language_code, default_unit_minutes, \
     total_units, total_minutes, archived, created_at, updated_at";

const WATCH_LOG_COLUMNS: &str =
    "id, owner_key, title_id, units, unit_minutes, total_minutes, logged_at, created_at, insertion_order";

//=========================================================================================
// `TrackerTransaction` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrackerTransaction for DbTransaction {
    async fn get_profile(&mut self, owner_key: &OwnerKey) -> PortResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT owner_key, display_name, learning_language_code, learning_language_label, \
             created_at, updated_at FROM profiles WHERE owner_key = $1",
        )
        .bind(owner_key.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(record.map(ProfileRecord::to_domain))
    }

    async fn save_profile(&mut self, profile: &Profile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO profiles (owner_key, display_name, learning_language_code, \
             learning_language_label, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (owner_key) DO UPDATE SET display_name = EXCLUDED.display_name, \
             learning_language_code = EXCLUDED.learning_language_code, \
             learning_language_label = EXCLUDED.learning_language_label, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(profile.owner_key.as_str())
        .bind(&profile.display_name)
        .bind(&profile.learning_language_code)
        .bind(&profile.learning_language_label)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_languages(&mut self) -> PortResult<Vec<Language>> {
        let records = sqlx::query_as::<_, LanguageRecord>(
            "SELECT code, label, created_at, updated_at FROM languages",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(records.into_iter().map(LanguageRecord::to_domain).collect())
    }

    async fn get_language(&mut self, code: &str) -> PortResult<Option<Language>> {
        let record = sqlx::query_as::<_, LanguageRecord>(
            "SELECT code, label, created_at, updated_at FROM languages WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(record.map(LanguageRecord::to_domain))
    }

    async fn save_language(&mut self, language: &Language) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO languages (code, label, created_at, updated_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE SET label = EXCLUDED.label, updated_at = EXCLUDED.updated_at",
        )
        .bind(&language.code)
        .bind(&language.label)
        .bind(language.created_at)
        .bind(language.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    /// Locks the row so concurrent log changes on one title recompute in turn.
    async fn get_title(&mut self, title_id: Uuid) -> PortResult<Option<Title>> {
        let record = sqlx::query_as::<_, TitleRecord>(&format!(
            "SELECT {TITLE_COLUMNS} FROM titles WHERE id = $1 FOR UPDATE"
        ))
        .bind(title_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        record.map(TitleRecord::to_domain).transpose()
    }

    async fn list_titles(&mut self, owner_key: &OwnerKey) -> PortResult<Vec<Title>> {
        let records = sqlx::query_as::<_, TitleRecord>(&format!(
            "SELECT {TITLE_COLUMNS} FROM titles WHERE owner_key = $1"
        ))
        .bind(owner_key.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;

        records.into_iter().map(TitleRecord::to_domain).collect()
    }

    async fn insert_title(&mut self, title: &Title) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO titles ({TITLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(title.id)
        .bind(title.owner_key.as_str())
        .bind(&title.name)
        .bind(title.content_type.as_str())
        .bind(&title.language_code)
        .bind(title.default_unit_minutes)
        .bind(title.total_units)
        .bind(title.total_minutes)
        .bind(title.archived)
        .bind(title.created_at)
        .bind(title.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_title(&mut self, title: &Title) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE titles SET name = $2, content_type = $3, language_code = $4, \
             default_unit_minutes = $5, total_units = $6, total_minutes = $7, archived = $8, \
             updated_at = $9 WHERE id = $1",
        )
        .bind(title.id)
        .bind(&title.name)
        .bind(title.content_type.as_str())
        .bind(&title.language_code)
        .bind(title.default_unit_minutes)
        .bind(title.total_units)
        .bind(title.total_minutes)
        .bind(title.archived)
        .bind(title.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Title {} not found.", title.id)));
        }
        Ok(())
    }

    async fn delete_title(&mut self, title_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(title_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get_watch_log(&mut self, log_id: Uuid) -> PortResult<Option<WatchLog>> {
        let record = sqlx::query_as::<_, WatchLogRecord>(&format!(
            "SELECT {WATCH_LOG_COLUMNS} FROM watch_logs WHERE id = $1"
        ))
        .bind(log_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(record.map(WatchLogRecord::to_domain))
    }

    async fn insert_watch_log(&mut self, log: NewWatchLog) -> PortResult<WatchLog> {
        let record = sqlx::query_as::<_, WatchLogRecord>(&format!(
            "INSERT INTO watch_logs (id, owner_key, title_id, units, unit_minutes, total_minutes, \
             logged_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {WATCH_LOG_COLUMNS}"
        ))
        .bind(log.id)
        .bind(log.owner_key.as_str())
        .bind(log.title_id)
        .bind(log.units)
        .bind(log.unit_minutes)
        .bind(log.total_minutes)
        .bind(log.logged_at)
        .bind(log.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;

        debug!(log_id = %record.id, insertion_order = record.insertion_order, "Inserted watch log");
        Ok(record.to_domain())
    }

    async fn list_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<Vec<WatchLog>> {
        let records = sqlx::query_as::<_, WatchLogRecord>(&format!(
            "SELECT {WATCH_LOG_COLUMNS} FROM watch_logs WHERE title_id = $1 ORDER BY insertion_order ASC"
        ))
        .bind(title_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(records.into_iter().map(WatchLogRecord::to_domain).collect())
    }

    async fn list_recent_watch_logs(
        &mut self,
        owner_key: &OwnerKey,
        limit: usize,
    ) -> PortResult<Vec<WatchLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = sqlx::query_as::<_, WatchLogRecord>(&format!(
            "SELECT {WATCH_LOG_COLUMNS} FROM watch_logs WHERE owner_key = $1 \
             ORDER BY logged_at DESC, insertion_order DESC LIMIT $2"
        ))
        .bind(owner_key.as_str())
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(records.into_iter().map(WatchLogRecord::to_domain).collect())
    }

    async fn delete_watch_log(&mut self, log_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM watch_logs WHERE id = $1")
            .bind(log_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM watch_logs WHERE title_id = $1")
            .bind(title_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        self.tx.commit().await.map_err(db_error)
    }
}
