//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `TrackerStore` port, used when no
//! database is configured and by the test suites.

use async_trait::async_trait;
use series_learner_core::domain::{Language, NewWatchLog, OwnerKey, Profile, Title, WatchLog};
use series_learner_core::ports::{PortError, PortResult, TrackerStore, TrackerTransaction};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
struct MemoryState {
    profiles: HashMap<OwnerKey, Profile>,
    languages: BTreeMap<String, Language>,
    titles: HashMap<Uuid, Title>,
    watch_logs: HashMap<Uuid, WatchLog>,
    next_insertion_order: i64,
}

/// Keeps every record in memory behind a single lock.
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackerStore for MemoryAdapter {
    async fn begin(&self) -> PortResult<Box<dyn TrackerTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Holds the store lock for its whole lifetime, so transactions run one at a
/// time. Writes land in `working` and are published on commit.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl TrackerTransaction for MemoryTransaction {
    async fn get_profile(&mut self, owner_key: &OwnerKey) -> PortResult<Option<Profile>> {
        Ok(self.working.profiles.get(owner_key).cloned())
    }

    async fn save_profile(&mut self, profile: &Profile) -> PortResult<()> {
        self.working
            .profiles
            .insert(profile.owner_key.clone(), profile.clone());
        Ok(())
    }

    async fn list_languages(&mut self) -> PortResult<Vec<Language>> {
        Ok(self.working.languages.values().cloned().collect())
    }

    async fn get_language(&mut self, code: &str) -> PortResult<Option<Language>> {
        Ok(self.working.languages.get(code).cloned())
    }

    async fn save_language(&mut self, language: &Language) -> PortResult<()> {
        self.working
            .languages
            .insert(language.code.clone(), language.clone());
        Ok(())
    }

    async fn get_title(&mut self, title_id: Uuid) -> PortResult<Option<Title>> {
        Ok(self.working.titles.get(&title_id).cloned())
    }

    async fn list_titles(&mut self, owner_key: &OwnerKey) -> PortResult<Vec<Title>> {
        Ok(self
            .working
            .titles
            .values()
            .filter(|title| &title.owner_key == owner_key)
            .cloned()
            .collect())
    }

    async fn insert_title(&mut self, title: &Title) -> PortResult<()> {
        if self.working.titles.contains_key(&title.id) {
            return Err(PortError::Unexpected(format!(
                "Title {} already exists",
                title.id
            )));
        }
        self.working.titles.insert(title.id, title.clone());
        Ok(())
    }

    async fn update_title(&mut self, title: &Title) -> PortResult<()> {
        match self.working.titles.get_mut(&title.id) {
            Some(stored) => {
                *stored = title.clone();
                Ok(())
            }
            None => Err(PortError::NotFound(format!("Title {} not found.", title.id))),
        }
    }

    async fn delete_title(&mut self, title_id: Uuid) -> PortResult<()> {
        self.working.titles.remove(&title_id);
        Ok(())
    }

    async fn get_watch_log(&mut self, log_id: Uuid) -> PortResult<Option<WatchLog>> {
        Ok(self.working.watch_logs.get(&log_id).cloned())
    }

    async fn insert_watch_log(&mut self, log: NewWatchLog) -> PortResult<WatchLog> {
        self.working.next_insertion_order += 1;
        let stored = log.into_stored(self.working.next_insertion_order);
        self.working.watch_logs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<Vec<WatchLog>> {
        let mut logs: Vec<WatchLog> = self
            .working
            .watch_logs
            .values()
            .filter(|log| log.title_id == title_id)
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.insertion_order);
        Ok(logs)
    }

    async fn list_recent_watch_logs(
        &mut self,
        owner_key: &OwnerKey,
        limit: usize,
    ) -> PortResult<Vec<WatchLog>> {
        let mut logs: Vec<WatchLog> = self
            .working
            .watch_logs
            .values()
            .filter(|log| &log.owner_key == owner_key)
            .cloned()
            .collect();
        logs.sort_by(|a, b| {
            b.logged_at
                .cmp(&a.logged_at)
                .then_with(|| b.insertion_order.cmp(&a.insertion_order))
        });
        logs.truncate(limit);
        Ok(logs)
    }

    async fn delete_watch_log(&mut self, log_id: Uuid) -> PortResult<()> {
        self.working.watch_logs.remove(&log_id);
        Ok(())
    }

    async fn delete_watch_logs_for_title(&mut self, title_id: Uuid) -> PortResult<u64> {
        let before = self.working.watch_logs.len();
        self.working
            .watch_logs
            .retain(|_, log| log.title_id != title_id);
        Ok((before - self.working.watch_logs.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
