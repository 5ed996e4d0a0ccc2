//! crates/series_learner_core/src/service.rs
//!
//! The tracker's public operations. Each one opens a single transaction on the
//! store, and only commits once every write has succeeded; an early return on
//! error drops the transaction and with it every partial write.

use crate::dashboard::{
    build_dashboard_summary, enrich_logs, DashboardSummary, RecentLog, RECENT_LOGS_LIMIT,
};
use crate::domain::{
    ContentType, Language, NewWatchLog, OwnerKey, Profile, Title, UnitMinutesBounds, WatchLog,
    DEFAULT_LANGUAGES,
};
use crate::format::{compare_labels, normalize_language_code};
use crate::ports::{PortError, PortResult, TrackerStore, TrackerTransaction};
use crate::tracking::{
    recalculate_title_aggregates, resolve_unit_minutes, validate_units, whole_number,
    TitleAggregates,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Number of logs returned by [`Tracker::list_recent_logs`] when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

//=========================================================================================
// Operation Inputs and Outputs
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AddWatchLog {
    pub title_id: Uuid,
    pub units: f64,
    pub unit_minutes: Option<f64>,
    pub logged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedWatchLog {
    pub log_id: Uuid,
    pub aggregates: TitleAggregates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedWatchLog {
    pub title_id: Uuid,
    pub aggregates: TitleAggregates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedTitle {
    pub title_id: Uuid,
    pub deleted_logs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTitle {
    pub name: String,
    pub content_type: ContentType,
    pub language_code: String,
    pub language_label: Option<String>,
    pub initial_unit_minutes: Option<f64>,
}

/// A partial edit of a title. `None` leaves a field untouched;
/// `default_unit_minutes: Some(None)` clears the stored default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleUpdate {
    pub name: Option<String>,
    pub language_code: Option<String>,
    pub language_label: Option<String>,
    pub default_unit_minutes: Option<Option<f64>>,
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFilter {
    pub language_code: Option<String>,
    pub content_type: Option<ContentType>,
    pub archived: Option<bool>,
}

//=========================================================================================
// The Tracker
//=========================================================================================

/// Runs tracker operations against a [`TrackerStore`].
#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn TrackerStore>,
    bounds: UnitMinutesBounds,
}

impl Tracker {
    pub fn new(store: Arc<dyn TrackerStore>, bounds: UnitMinutesBounds) -> Self {
        Self { store, bounds }
    }

    // --- Watch logs ---

    /// Logs a watch session and refreshes the title's aggregates.
    ///
    /// The returned aggregates are the recalculated ones, while the title stores
    /// the minutes just used as its default.
    pub async fn add_watch_log(
        &self,
        owner_key: &OwnerKey,
        input: AddWatchLog,
    ) -> PortResult<AddedWatchLog> {
        let mut tx = self.store.begin().await?;

        let mut title = tx
            .get_title(input.title_id)
            .await?
            .ok_or_else(|| title_not_found(input.title_id))?;
        if &title.owner_key != owner_key {
            return Err(PortError::Permission(
                "You do not have permission to log time for this title.".to_string(),
            ));
        }

        let units = validate_units(input.units)?;
        let unit_minutes =
            resolve_unit_minutes(input.unit_minutes, title.default_unit_minutes, self.bounds)?;
        let total_minutes = units.checked_mul(unit_minutes).ok_or_else(|| {
            PortError::Validation("Units are too large to record.".to_string())
        })?;

        let now = Utc::now();
        let log = tx
            .insert_watch_log(NewWatchLog {
                id: Uuid::new_v4(),
                owner_key: owner_key.clone(),
                title_id: title.id,
                units,
                unit_minutes,
                total_minutes,
                logged_at: input.logged_at.unwrap_or(now),
                created_at: now,
            })
            .await?;

        let logs = tx.list_watch_logs_for_title(title.id).await?;
        let aggregates = recalculate_title_aggregates(&logs)?;

        // The stored default follows the minutes just used, even for a back-dated log.
        apply_aggregates(
            &mut title,
            TitleAggregates {
                default_unit_minutes: Some(unit_minutes),
                ..aggregates
            },
            now,
        );
        tx.update_title(&title).await?;
        tx.commit().await?;

        Ok(AddedWatchLog {
            log_id: log.id,
            aggregates,
        })
    }

    /// Deletes a log; a title that still exists gets its aggregates recomputed.
    pub async fn remove_watch_log(&self, log_id: Uuid) -> PortResult<RemovedWatchLog> {
        let mut tx = self.store.begin().await?;

        let log = tx
            .get_watch_log(log_id)
            .await?
            .ok_or_else(|| PortError::NotFound("Watch log not found.".to_string()))?;

        tx.delete_watch_log(log.id).await?;

        let aggregates = match tx.get_title(log.title_id).await? {
            Some(mut title) => {
                let logs = tx.list_watch_logs_for_title(title.id).await?;
                let aggregates = recalculate_title_aggregates(&logs)?;
                apply_aggregates(&mut title, aggregates, Utc::now());
                tx.update_title(&title).await?;
                aggregates
            }
            None => TitleAggregates::default(),
        };

        tx.commit().await?;

        Ok(RemovedWatchLog {
            title_id: log.title_id,
            aggregates,
        })
    }

    pub async fn list_recent_logs(
        &self,
        owner_key: &OwnerKey,
        limit: Option<usize>,
    ) -> PortResult<Vec<RecentLog>> {
        let limit = limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_RECENT_LIMIT);

        let mut tx = self.store.begin().await?;
        let logs = tx.list_recent_watch_logs(owner_key, limit).await?;
        let titles = titles_for_logs(tx.as_mut(), &logs).await?;
        tx.commit().await?;

        Ok(enrich_logs(&logs, &titles, limit))
    }

    // --- Titles ---

    pub async fn list_titles(
        &self,
        owner_key: &OwnerKey,
        filter: TitleFilter,
    ) -> PortResult<Vec<Title>> {
        let mut tx = self.store.begin().await?;
        let titles = tx.list_titles(owner_key).await?;
        tx.commit().await?;

        let language_code = filter.language_code.as_deref().map(normalize_language_code);

        let mut titles: Vec<Title> = titles
            .into_iter()
            .filter(|title| {
                language_code
                    .as_deref()
                    .map_or(true, |code| title.language_code == code)
            })
            .filter(|title| filter.content_type.map_or(true, |ct| title.content_type == ct))
            .filter(|title| filter.archived.map_or(true, |archived| title.archived == archived))
            .collect();

        titles.sort_by(|a, b| {
            a.language_code
                .cmp(&b.language_code)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| compare_labels(&a.name, &b.name))
        });
        Ok(titles)
    }

    pub async fn create_title(&self, owner_key: &OwnerKey, input: NewTitle) -> PortResult<Title> {
        let name = required_name(&input.name)?;
        let language_code = required_language_code(&input.language_code)?;
        let default_unit_minutes = input
            .initial_unit_minutes
            .map(|minutes| self.bounded_minutes(minutes, "Initial minutes"))
            .transpose()?;

        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        ensure_language(tx.as_mut(), &language_code, input.language_label.as_deref(), now).await?;

        let title = Title {
            id: Uuid::new_v4(),
            owner_key: owner_key.clone(),
            name,
            content_type: input.content_type,
            language_code,
            default_unit_minutes,
            total_units: 0,
            total_minutes: 0,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        tx.insert_title(&title).await?;
        tx.commit().await?;

        Ok(title)
    }

    pub async fn update_title(
        &self,
        owner_key: &OwnerKey,
        title_id: Uuid,
        update: TitleUpdate,
    ) -> PortResult<Title> {
        let mut tx = self.store.begin().await?;

        let mut title = tx
            .get_title(title_id)
            .await?
            .ok_or_else(|| title_not_found(title_id))?;
        if &title.owner_key != owner_key {
            return Err(PortError::Permission(
                "You do not have permission to edit this title.".to_string(),
            ));
        }

        let now = Utc::now();

        if let Some(name) = update.name.as_deref() {
            title.name = required_name(name)?;
        }

        if let Some(code) = update.language_code.as_deref() {
            let code = required_language_code(code)?;
            ensure_language(tx.as_mut(), &code, update.language_label.as_deref(), now).await?;
            title.language_code = code;
        }

        if let Some(default_unit_minutes) = update.default_unit_minutes {
            title.default_unit_minutes = default_unit_minutes
                .map(|minutes| self.bounded_minutes(minutes, "Default minutes"))
                .transpose()?;
        }

        if let Some(archived) = update.archived {
            title.archived = archived;
        }

        title.updated_at = now;
        tx.update_title(&title).await?;
        tx.commit().await?;

        Ok(title)
    }

    /// Deletes a title together with every log that references it.
    pub async fn remove_title(&self, owner_key: &OwnerKey, title_id: Uuid) -> PortResult<RemovedTitle> {
        let mut tx = self.store.begin().await?;

        let title = tx
            .get_title(title_id)
            .await?
            .ok_or_else(|| title_not_found(title_id))?;
        if &title.owner_key != owner_key {
            return Err(PortError::Permission(
                "You do not have permission to remove this title.".to_string(),
            ));
        }

        let deleted_logs = tx.delete_watch_logs_for_title(title.id).await?;
        tx.delete_title(title.id).await?;
        tx.commit().await?;

        Ok(RemovedTitle {
            title_id: title.id,
            deleted_logs,
        })
    }

    // --- Languages ---

    /// All languages sorted by label, or the defaults when none are stored.
    pub async fn list_languages(&self) -> PortResult<Vec<Language>> {
        let mut tx = self.store.begin().await?;
        let mut languages = tx.list_languages().await?;
        tx.commit().await?;

        if languages.is_empty() {
            return Ok(default_languages(DateTime::<Utc>::default()));
        }

        languages.sort_by(|a, b| compare_labels(&a.label, &b.label));
        Ok(languages)
    }

    pub async fn upsert_language(&self, code: &str, label: &str) -> PortResult<Language> {
        let code = required_language_code(code)?;
        let label = required_label(label)?;

        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let language = match tx.get_language(&code).await? {
            Some(existing) => Language {
                label,
                updated_at: now,
                ..existing
            },
            None => Language {
                code,
                label,
                created_at: now,
                updated_at: now,
            },
        };
        tx.save_language(&language).await?;
        tx.commit().await?;

        Ok(language)
    }

    // --- Profile ---

    pub async fn get_profile(&self, owner_key: &OwnerKey) -> PortResult<Profile> {
        let mut tx = self.store.begin().await?;
        let profile = tx.get_profile(owner_key).await?;
        tx.commit().await?;

        Ok(profile.unwrap_or_else(|| Profile::default_for(owner_key)))
    }

    /// Stores the default profile and languages when they are missing.
    pub async fn ensure_setup(&self, owner_key: &OwnerKey) -> PortResult<Profile> {
        let mut tx = self.store.begin().await?;
        let now = Utc::now();

        let profile = match tx.get_profile(owner_key).await? {
            Some(profile) => profile,
            None => {
                let profile = Profile {
                    created_at: now,
                    updated_at: now,
                    ..Profile::default_for(owner_key)
                };
                tx.save_profile(&profile).await?;
                profile
            }
        };

        for language in default_languages(now) {
            if tx.get_language(&language.code).await?.is_none() {
                tx.save_language(&language).await?;
            }
        }

        tx.commit().await?;
        Ok(profile)
    }

    pub async fn set_learning_language(
        &self,
        owner_key: &OwnerKey,
        code: &str,
        label: &str,
    ) -> PortResult<Profile> {
        let code = required_language_code(code)?;
        let label = required_label(label)?;

        let mut tx = self.store.begin().await?;
        let now = Utc::now();

        match tx.get_language(&code).await? {
            Some(language) if language.label == label => {}
            Some(language) => {
                tx.save_language(&Language {
                    label: label.clone(),
                    updated_at: now,
                    ..language
                })
                .await?;
            }
            None => {
                tx.save_language(&Language {
                    code: code.clone(),
                    label: label.clone(),
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            }
        }

        let profile = match tx.get_profile(owner_key).await? {
            Some(profile) => Profile {
                learning_language_code: code,
                learning_language_label: label,
                updated_at: now,
                ..profile
            },
            None => Profile {
                learning_language_code: code,
                learning_language_label: label,
                created_at: now,
                updated_at: now,
                ..Profile::default_for(owner_key)
            },
        };
        tx.save_profile(&profile).await?;
        tx.commit().await?;

        Ok(profile)
    }

    // --- Dashboard ---

    pub async fn dashboard_summary(&self, owner_key: &OwnerKey) -> PortResult<DashboardSummary> {
        let mut tx = self.store.begin().await?;
        let profile = tx
            .get_profile(owner_key)
            .await?
            .unwrap_or_else(|| Profile::default_for(owner_key));
        let titles = tx.list_titles(owner_key).await?;
        let languages = tx.list_languages().await?;
        let logs = tx.list_recent_watch_logs(owner_key, RECENT_LOGS_LIMIT).await?;
        tx.commit().await?;

        Ok(build_dashboard_summary(&titles, &languages, &profile, &logs))
    }

    fn bounded_minutes(&self, minutes: f64, field: &str) -> PortResult<i64> {
        whole_number(minutes)
            .filter(|minutes| self.bounds.contains(*minutes))
            .ok_or_else(|| {
                PortError::Validation(format!(
                    "{} must be an integer between {} and {}.",
                    field, self.bounds.min, self.bounds.max
                ))
            })
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn apply_aggregates(title: &mut Title, aggregates: TitleAggregates, now: DateTime<Utc>) {
    title.total_units = aggregates.total_units;
    title.total_minutes = aggregates.total_minutes;
    title.default_unit_minutes = aggregates.default_unit_minutes;
    title.updated_at = now;
}

fn title_not_found(title_id: Uuid) -> PortError {
    PortError::NotFound(format!("Title {} not found.", title_id))
}

fn required_name(name: &str) -> PortResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortError::Validation("Title name is required.".to_string()));
    }
    Ok(name.to_string())
}

fn required_language_code(code: &str) -> PortResult<String> {
    let code = normalize_language_code(code);
    if code.is_empty() {
        return Err(PortError::Validation("Language code is required.".to_string()));
    }
    Ok(code)
}

fn required_label(label: &str) -> PortResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(PortError::Validation("Language label is required.".to_string()));
    }
    Ok(label.to_string())
}

fn default_languages(now: DateTime<Utc>) -> Vec<Language> {
    DEFAULT_LANGUAGES
        .iter()
        .map(|(code, label)| Language {
            code: code.to_string(),
            label: label.to_string(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Makes sure `code` exists in the language table. A non-empty `label` that
/// differs from the stored one replaces it; a new language without a label is
/// named after its uppercased code.
async fn ensure_language(
    tx: &mut dyn TrackerTransaction,
    code: &str,
    label: Option<&str>,
    now: DateTime<Utc>,
) -> PortResult<()> {
    let label = label.map(str::trim).filter(|label| !label.is_empty());

    match tx.get_language(code).await? {
        None => {
            tx.save_language(&Language {
                code: code.to_string(),
                label: label.map(str::to_string).unwrap_or_else(|| code.to_uppercase()),
                created_at: now,
                updated_at: now,
            })
            .await
        }
        Some(existing) => match label {
            Some(label) if label != existing.label => {
                tx.save_language(&Language {
                    label: label.to_string(),
                    updated_at: now,
                    ..existing
                })
                .await
            }
            _ => Ok(()),
        },
    }
}

async fn titles_for_logs(
    tx: &mut dyn TrackerTransaction,
    logs: &[WatchLog],
) -> PortResult<Vec<Title>> {
    let mut ids: Vec<Uuid> = logs.iter().map(|log| log.title_id).collect();
    ids.sort();
    ids.dedup();

    let mut titles = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(title) = tx.get_title(id).await? {
            titles.push(title);
        }
    }
    Ok(titles)
}
