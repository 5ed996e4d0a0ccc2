//! crates/series_learner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the tracker.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// The owner key used when a caller does not supply one.
pub const LOCAL_OWNER_KEY: &str = "local";

pub const MIN_UNIT_MINUTES: i64 = 1;
pub const MAX_UNIT_MINUTES: i64 = 400;

/// Languages seeded by setup and returned when the language table is empty.
pub const DEFAULT_LANGUAGES: [(&str, &str); 2] = [("da", "Danish"), ("en", "English")];

pub const DEFAULT_DISPLAY_NAME: &str = "Local Learner";
pub const DEFAULT_LEARNING_LANGUAGE_CODE: &str = "da";
pub const DEFAULT_LEARNING_LANGUAGE_LABEL: &str = "Danish";

/// Scopes titles, logs and profiles to one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey(String);

impl OwnerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OwnerKey {
    fn default() -> Self {
        Self::new(LOCAL_OWNER_KEY)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive bounds a log's minutes-per-unit must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMinutesBounds {
    pub min: i64,
    pub max: i64,
}

impl UnitMinutesBounds {
    pub fn contains(&self, minutes: i64) -> bool {
        (self.min..=self.max).contains(&minutes)
    }
}

impl Default for UnitMinutesBounds {
    fn default() -> Self {
        Self {
            min: MIN_UNIT_MINUTES,
            max: MAX_UNIT_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Series,
    Movie,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Series => "series",
            ContentType::Movie => "movie",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "series" => Some(ContentType::Series),
            "movie" => Some(ContentType::Movie),
            _ => None,
        }
    }
}

/// A trackable series or movie.
///
/// `total_units` and `total_minutes` always mirror the title's watch logs; they
/// are only written from a full recalculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub id: Uuid,
    pub owner_key: OwnerKey,
    pub name: String,
    pub content_type: ContentType,
    pub language_code: String,
    pub default_unit_minutes: Option<i64>,
    pub total_units: i64,
    pub total_minutes: i64,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One logged watch session. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchLog {
    pub id: Uuid,
    pub owner_key: OwnerKey,
    pub title_id: Uuid,
    pub units: i64,
    pub unit_minutes: i64,
    pub total_minutes: i64,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Monotonic position assigned by the store on insert.
    pub insertion_order: i64,
}

/// A watch log that has not been stored yet; the store assigns `insertion_order`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWatchLog {
    pub id: Uuid,
    pub owner_key: OwnerKey,
    pub title_id: Uuid,
    pub units: i64,
    pub unit_minutes: i64,
    pub total_minutes: i64,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewWatchLog {
    pub fn into_stored(self, insertion_order: i64) -> WatchLog {
        WatchLog {
            id: self.id,
            owner_key: self.owner_key,
            title_id: self.title_id,
            units: self.units,
            unit_minutes: self.unit_minutes,
            total_minutes: self.total_minutes,
            logged_at: self.logged_at,
            created_at: self.created_at,
            insertion_order,
        }
    }
}

/// Shared reference data: a normalized language code and its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-owner settings, chiefly which language is being learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub owner_key: OwnerKey,
    pub display_name: String,
    pub learning_language_code: String,
    pub learning_language_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The profile assumed for an owner that has never been set up.
    pub fn default_for(owner_key: &OwnerKey) -> Self {
        Self {
            owner_key: owner_key.clone(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            learning_language_code: DEFAULT_LEARNING_LANGUAGE_CODE.to_string(),
            learning_language_label: DEFAULT_LEARNING_LANGUAGE_LABEL.to_string(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}
