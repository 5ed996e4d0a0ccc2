//! crates/series_learner_core/src/dashboard.rs
//!
//! Composes per-language totals, top titles, recent activity and the budget
//! into a single read-only summary.

use crate::budget::{calculate_budget_summary, BudgetSummary};
use crate::domain::{ContentType, Language, Profile, Title, WatchLog};
use crate::format::{compare_labels, fallback_language_label};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

pub const TOP_TITLES_LIMIT: usize = 8;
pub const RECENT_LOGS_LIMIT: usize = 12;

pub const UNKNOWN_TITLE_NAME: &str = "Unknown title";
pub const UNKNOWN_LANGUAGE_CODE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTotal {
    pub language_code: String,
    pub language_label: String,
    pub total_minutes: i64,
    pub title_count: usize,
}

/// Lightweight projection of a title for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTitle {
    pub id: Uuid,
    pub name: String,
    pub content_type: ContentType,
    pub language_code: String,
    pub total_units: i64,
    pub total_minutes: i64,
}

/// A watch log joined with the title it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentLog {
    pub id: Uuid,
    pub title_id: Uuid,
    pub title_name: String,
    pub content_type: ContentType,
    pub language_code: String,
    pub units: i64,
    pub unit_minutes: i64,
    pub total_minutes: i64,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub learning_language_code: String,
    pub learning_language_label: String,
    pub budget: BudgetSummary,
    pub totals_by_language: Vec<LanguageTotal>,
    pub top_titles: Vec<TopTitle>,
    pub recent_logs: Vec<RecentLog>,
}

/// Builds the dashboard from the owner's titles and the latest logs.
///
/// `titles` may include archived titles: they are left out of every aggregate
/// but still name the logs that reference them. `recent_logs` is trimmed to
/// the newest [`RECENT_LOGS_LIMIT`] entries by `logged_at`.
pub fn build_dashboard_summary(
    titles: &[Title],
    languages: &[Language],
    profile: &Profile,
    recent_logs: &[WatchLog],
) -> DashboardSummary {
    let active: Vec<&Title> = titles.iter().filter(|title| !title.archived).collect();

    let totals_by_language = totals_by_language(&active, languages);

    let learning_code = profile.learning_language_code.as_str();
    let learning_minutes: i64 = totals_by_language
        .iter()
        .filter(|entry| entry.language_code == learning_code)
        .map(|entry| entry.total_minutes)
        .fold(0, i64::saturating_add);
    let non_learning_minutes: i64 = totals_by_language
        .iter()
        .filter(|entry| entry.language_code != learning_code)
        .map(|entry| entry.total_minutes)
        .fold(0, i64::saturating_add);

    DashboardSummary {
        learning_language_code: profile.learning_language_code.clone(),
        learning_language_label: profile.learning_language_label.clone(),
        budget: calculate_budget_summary(learning_minutes as f64, non_learning_minutes as f64),
        totals_by_language,
        top_titles: top_titles(&active),
        recent_logs: enrich_logs(recent_logs, titles, RECENT_LOGS_LIMIT),
    }
}

fn totals_by_language(titles: &[&Title], languages: &[Language]) -> Vec<LanguageTotal> {
    let labels: HashMap<&str, &str> = languages
        .iter()
        .map(|language| (language.code.as_str(), language.label.as_str()))
        .collect();

    let mut totals: HashMap<&str, LanguageTotal> = HashMap::new();
    for title in titles {
        let code = title.language_code.as_str();
        let entry = totals.entry(code).or_insert_with(|| LanguageTotal {
            language_code: code.to_string(),
            language_label: labels
                .get(code)
                .map(|label| label.to_string())
                .unwrap_or_else(|| fallback_language_label(code)),
            total_minutes: 0,
            title_count: 0,
        });
        entry.total_minutes = entry.total_minutes.saturating_add(title.total_minutes);
        entry.title_count += 1;
    }

    let mut totals: Vec<LanguageTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| compare_labels(&a.language_label, &b.language_label))
            .then_with(|| a.language_code.cmp(&b.language_code))
    });
    totals
}

fn top_titles(titles: &[&Title]) -> Vec<TopTitle> {
    let mut ranked = titles.to_vec();
    ranked.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| compare_labels(&a.name, &b.name))
    });

    ranked
        .into_iter()
        .take(TOP_TITLES_LIMIT)
        .map(|title| TopTitle {
            id: title.id,
            name: title.name.clone(),
            content_type: title.content_type,
            language_code: title.language_code.clone(),
            total_units: title.total_units,
            total_minutes: title.total_minutes,
        })
        .collect()
}

/// Joins logs with their titles, newest first, keeping at most `limit`.
///
/// Logs whose title no longer exists are kept with placeholder title fields.
pub fn enrich_logs(logs: &[WatchLog], titles: &[Title], limit: usize) -> Vec<RecentLog> {
    let by_id: HashMap<Uuid, &Title> = titles.iter().map(|title| (title.id, title)).collect();

    let mut ordered: Vec<&WatchLog> = logs.iter().collect();
    ordered.sort_by(|a, b| {
        b.logged_at
            .cmp(&a.logged_at)
            .then_with(|| b.insertion_order.cmp(&a.insertion_order))
    });

    ordered
        .into_iter()
        .take(limit)
        .map(|log| {
            let title = by_id.get(&log.title_id);
            RecentLog {
                id: log.id,
                title_id: log.title_id,
                title_name: title
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| UNKNOWN_TITLE_NAME.to_string()),
                content_type: title.map(|t| t.content_type).unwrap_or(ContentType::Series),
                language_code: title
                    .map(|t| t.language_code.clone())
                    .unwrap_or_else(|| UNKNOWN_LANGUAGE_CODE.to_string()),
                units: log.units,
                unit_minutes: log.unit_minutes,
                total_minutes: log.total_minutes,
                logged_at: log.logged_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetStatus;
    use crate::domain::OwnerKey;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn title(name: &str, code: &str, total_minutes: i64) -> Title {
        Title {
            id: Uuid::new_v4(),
            owner_key: OwnerKey::default(),
            name: name.to_string(),
            content_type: ContentType::Series,
            language_code: code.to_string(),
            default_unit_minutes: None,
            total_units: total_minutes / 30,
            total_minutes,
            archived: false,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn language(code: &str, label: &str) -> Language {
        Language {
            code: code.to_string(),
            label: label.to_string(),
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn watch_log(title_id: Uuid, logged_at: i64, order: i64) -> WatchLog {
        WatchLog {
            id: Uuid::new_v4(),
            owner_key: OwnerKey::default(),
            title_id,
            units: 1,
            unit_minutes: 30,
            total_minutes: 30,
            logged_at: at(logged_at),
            created_at: at(logged_at),
            insertion_order: order,
        }
    }

    fn danish_profile() -> Profile {
        Profile::default_for(&OwnerKey::default())
    }

    #[test]
    fn test_empty_dashboard() {
        let summary = build_dashboard_summary(&[], &[], &danish_profile(), &[]);

        assert!(summary.totals_by_language.is_empty());
        assert!(summary.top_titles.is_empty());
        assert!(summary.recent_logs.is_empty());
        assert_eq!(summary.budget.learning_minutes, 0);
        assert_eq!(summary.budget.non_learning_minutes, 0);
        assert_eq!(summary.budget.coverage_ratio, 0.0);
        assert_eq!(summary.budget.status, BudgetStatus::WithinBudget);
        assert_eq!(summary.learning_language_code, "da");
    }

    #[test]
    fn test_totals_by_language_and_budget() {
        let titles = vec![
            title("Borgen", "da", 120),
            title("Forbrydelsen", "da", 60),
            title("The Wire", "en", 90),
            title("Dark", "de", 45),
        ];
        let languages = vec![language("da", "Danish"), language("en", "English")];

        let summary = build_dashboard_summary(&titles, &languages, &danish_profile(), &[]);

        let codes: Vec<&str> = summary
            .totals_by_language
            .iter()
            .map(|t| t.language_code.as_str())
            .collect();
        assert_eq!(codes, vec!["da", "en", "de"]);
        assert_eq!(summary.totals_by_language[0].title_count, 2);
        assert_eq!(summary.totals_by_language[0].total_minutes, 180);
        assert_eq!(summary.totals_by_language[2].language_label, "De");

        assert_eq!(summary.budget.learning_minutes, 180);
        assert_eq!(summary.budget.non_learning_minutes, 135);
        assert_eq!(summary.budget.remaining_budget_minutes, 45);
        assert_eq!(summary.budget.coverage_ratio, 1.33);
    }

    #[test]
    fn test_language_ties_sort_by_label() {
        let titles = vec![title("A", "sv", 60), title("B", "en", 60), title("C", "pt-br", 60)];
        let languages = vec![language("sv", "Swedish"), language("en", "English")];

        let summary = build_dashboard_summary(&titles, &languages, &danish_profile(), &[]);

        let labels: Vec<&str> = summary
            .totals_by_language
            .iter()
            .map(|t| t.language_label.as_str())
            .collect();
        assert_eq!(labels, vec!["English", "Pt-Br", "Swedish"]);
    }

    #[test]
    fn test_archived_titles_are_excluded_from_aggregates() {
        let mut archived = title("Old Show", "en", 500);
        archived.archived = true;
        let log = watch_log(archived.id, 10, 1);
        let titles = vec![title("Borgen", "da", 30), archived];

        let summary = build_dashboard_summary(&titles, &[], &danish_profile(), &[log]);

        assert_eq!(summary.totals_by_language.len(), 1);
        assert_eq!(summary.budget.non_learning_minutes, 0);
        assert_eq!(summary.top_titles.len(), 1);
        // Archived titles still name their logs.
        assert_eq!(summary.recent_logs[0].title_name, "Old Show");
    }

    #[test]
    fn test_language_totals_saturate() {
        let huge = i64::MAX / 2 + 1;
        let titles = vec![title("The Wire", "en", huge), title("Deadwood", "en", huge)];

        let summary = build_dashboard_summary(&titles, &[], &danish_profile(), &[]);

        assert_eq!(summary.totals_by_language[0].total_minutes, i64::MAX);
        assert_eq!(summary.budget.non_learning_minutes, i64::MAX);
        assert_eq!(summary.budget.status, BudgetStatus::OverBudget);
    }

    #[test]
    fn test_learning_language_without_titles() {
        let titles = vec![title("The Wire", "en", 90)];
        let summary = build_dashboard_summary(&titles, &[], &danish_profile(), &[]);

        assert_eq!(summary.budget.learning_minutes, 0);
        assert_eq!(summary.budget.debt_minutes, 90);
        assert_eq!(summary.budget.status, BudgetStatus::OverBudget);
    }

    #[test]
    fn test_top_titles_limit_and_ordering() {
        let mut titles: Vec<Title> = (0..10)
            .map(|i| title(&format!("Show {i}"), "en", i * 10))
            .collect();
        titles.push(title("alpha", "en", 90));

        let summary = build_dashboard_summary(&titles, &[], &danish_profile(), &[]);

        assert_eq!(summary.top_titles.len(), TOP_TITLES_LIMIT);
        let names: Vec<&str> = summary.top_titles.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(&names[..3], &["alpha", "Show 9", "Show 8"]);
    }

    #[test]
    fn test_recent_logs_are_newest_first_and_capped() {
        let show = title("Borgen", "da", 0);
        let logs: Vec<WatchLog> = (0..15).map(|i| watch_log(show.id, i, i)).collect();

        let summary = build_dashboard_summary(&[show], &[], &danish_profile(), &logs);

        assert_eq!(summary.recent_logs.len(), RECENT_LOGS_LIMIT);
        assert_eq!(summary.recent_logs[0].logged_at, at(14));
        assert_eq!(summary.recent_logs[11].logged_at, at(3));
    }

    #[test]
    fn test_dangling_log_uses_placeholders() {
        let log = watch_log(Uuid::new_v4(), 5, 1);

        let summary = build_dashboard_summary(&[], &[], &danish_profile(), &[log.clone()]);

        let recent = &summary.recent_logs[0];
        assert_eq!(recent.title_id, log.title_id);
        assert_eq!(recent.title_name, UNKNOWN_TITLE_NAME);
        assert_eq!(recent.content_type, ContentType::Series);
        assert_eq!(recent.language_code, UNKNOWN_LANGUAGE_CODE);
    }
}
