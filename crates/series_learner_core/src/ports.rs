//! crates/series_learner_core/src/ports.rs
//!
//! Defines the storage contracts (traits) for the tracker's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete datastore.

use crate::domain::{Language, NewWatchLog, OwnerKey, Profile, Title, WatchLog};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all core operations and port calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// Input failed a structural or bounds check.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// The caller's owner key does not match the resource's owner key.
    #[error("{0}")]
    Permission(String),
    /// The datastore is unreachable or misconfigured.
    #[error("Storage is unavailable: {0}")]
    Configuration(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

/// Entry point to the datastore. Every core operation runs inside one transaction.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    async fn begin(&self) -> PortResult<Box<dyn TrackerTransaction>>;
}

/// A unit of work against the datastore.
///
/// Dropping a transaction without calling [`TrackerTransaction::commit`] discards
/// every write made through it.
#[async_trait]
pub trait TrackerTransaction: Send {
    // --- Profiles ---
    async fn get_profile(&mut self, owner_key: &OwnerKey) -> PortResult<Option<Profile>>;

    /// Inserts or replaces the profile stored under `profile.owner_key`.
    async fn save_profile(&mut self, profile: &Profile) -> PortResult<()>;

    // --- Languages ---
    async fn list_languages(&mut self) -> PortResult<Vec<Language>>;

    async fn get_language(&mut self, code: &str) -> PortResult<Option<Language>>;

    /// Inserts or replaces the language stored under `language.code`.
    async fn save_language(&mut self, language: &Language) -> PortResult<()>;

    // --- Titles ---
    async fn get_title(&mut self, title_id: Uuid) -> PortResult<Option<Title>>;

    async fn list_titles(&mut self, owner_key: &OwnerKey) -> PortResult<Vec<Title>>;

    async fn insert_title(&mut self, title: &Title) -> PortResult<()>;

    async fn update_title(&mut self, title: &Title) -> PortResult<()>;

    async fn delete_title(&mut self, title_id: Uuid) -> PortResult<()>;

    // --- Watch logs ---
    async fn get_watch_log(&mut self, log_id: Uuid) -> PortResult<Option<WatchLog>>;

    async fn insert_watch_log(&mut self, log: NewWatchLog) -> PortResult<WatchLog>;

    async fn list_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<Vec<WatchLog>>;

    /// The owner's logs ordered by `logged_at` descending, at most `limit` of them.
    async fn list_recent_watch_logs(
        &mut self,
        owner_key: &OwnerKey,
        limit: usize,
    ) -> PortResult<Vec<WatchLog>>;

    async fn delete_watch_log(&mut self, log_id: Uuid) -> PortResult<()>;

    /// Returns the number of deleted logs.
    async fn delete_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<u64>;

    async fn commit(self: Box<Self>) -> PortResult<()>;
}
