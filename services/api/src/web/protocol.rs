//! services/api/src/web/protocol.rs
//!
//! Defines the JSON protocol between the browser client and the API server:
//! request payloads the client sends and the views the server returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use series_learner_core::budget::BudgetStatus;
use series_learner_core::dashboard::{DashboardSummary, LanguageTotal, RecentLog, TopTitle};
use series_learner_core::domain::{ContentType, Language, Profile, Title};
use series_learner_core::service::{
    AddWatchLog, AddedWatchLog, NewTitle, RemovedTitle, RemovedWatchLog, TitleFilter, TitleUpdate,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Shared Enums
//=========================================================================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeDto {
    Series,
    Movie,
}

impl From<ContentType> for ContentTypeDto {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Series => ContentTypeDto::Series,
            ContentType::Movie => ContentTypeDto::Movie,
        }
    }
}

impl From<ContentTypeDto> for ContentType {
    fn from(value: ContentTypeDto) -> Self {
        match value {
            ContentTypeDto::Series => ContentType::Series,
            ContentTypeDto::Movie => ContentType::Movie,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatusDto {
    WithinBudget,
    OverBudget,
}

impl From<BudgetStatus> for BudgetStatusDto {
    fn from(value: BudgetStatus) -> Self {
        match value {
            BudgetStatus::WithinBudget => BudgetStatusDto::WithinBudget,
            BudgetStatus::OverBudget => BudgetStatusDto::OverBudget,
        }
    }
}

/// Body of every error response.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

//=========================================================================================
// Titles
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleResponse {
    pub id: Uuid,
    pub name: String,
    pub content_type: ContentTypeDto,
    pub language_code: String,
    pub default_unit_minutes: Option<i64>,
    pub total_units: i64,
    pub total_minutes: i64,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Title> for TitleResponse {
    fn from(title: Title) -> Self {
        Self {
            id: title.id,
            name: title.name,
            content_type: title.content_type.into(),
            language_code: title.language_code,
            default_unit_minutes: title.default_unit_minutes,
            total_units: title.total_units,
            total_minutes: title.total_minutes,
            archived: title.archived,
            created_at: title.created_at,
            updated_at: title.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct TitleListQuery {
    pub language_code: Option<String>,
    pub content_type: Option<ContentTypeDto>,
    pub archived: Option<bool>,
}

impl From<TitleListQuery> for TitleFilter {
    fn from(query: TitleListQuery) -> Self {
        Self {
            language_code: query.language_code,
            content_type: query.content_type.map(Into::into),
            archived: query.archived,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTitleRequest {
    pub name: String,
    pub content_type: ContentTypeDto,
    pub language_code: String,
    pub language_label: Option<String>,
    pub initial_unit_minutes: Option<f64>,
}

impl From<CreateTitleRequest> for NewTitle {
    fn from(req: CreateTitleRequest) -> Self {
        Self {
            name: req.name,
            content_type: req.content_type.into(),
            language_code: req.language_code,
            language_label: req.language_label,
            initial_unit_minutes: req.initial_unit_minutes,
        }
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub language_code: Option<String>,
    pub language_label: Option<String>,
    /// Absent leaves the default untouched; `null` clears it.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<f64>)]
    pub default_unit_minutes: Option<Option<f64>>,
    pub archived: Option<bool>,
}

impl From<UpdateTitleRequest> for TitleUpdate {
    fn from(req: UpdateTitleRequest) -> Self {
        Self {
            name: req.name,
            language_code: req.language_code,
            language_label: req.language_label,
            default_unit_minutes: req.default_unit_minutes,
            archived: req.archived,
        }
    }
}

/// Distinguishes an explicit `null` from a missing field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTitleResponse {
    pub title_id: Uuid,
    pub deleted_logs: u64,
}

impl From<RemovedTitle> for RemoveTitleResponse {
    fn from(removed: RemovedTitle) -> Self {
        Self {
            title_id: removed.title_id,
            deleted_logs: removed.deleted_logs,
        }
    }
}

//=========================================================================================
// Watch Logs
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddWatchLogRequest {
    pub title_id: Uuid,
    pub units: f64,
    pub unit_minutes: Option<f64>,
    pub logged_at: Option<DateTime<Utc>>,
}

impl From<AddWatchLogRequest> for AddWatchLog {
    fn from(req: AddWatchLogRequest) -> Self {
        Self {
            title_id: req.title_id,
            units: req.units,
            unit_minutes: req.unit_minutes,
            logged_at: req.logged_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddWatchLogResponse {
    pub log_id: Uuid,
    pub total_units: i64,
    pub total_minutes: i64,
    pub default_unit_minutes: Option<i64>,
}

impl From<AddedWatchLog> for AddWatchLogResponse {
    fn from(added: AddedWatchLog) -> Self {
        Self {
            log_id: added.log_id,
            total_units: added.aggregates.total_units,
            total_minutes: added.aggregates.total_minutes,
            default_unit_minutes: added.aggregates.default_unit_minutes,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWatchLogResponse {
    pub title_id: Uuid,
    pub total_units: i64,
    pub total_minutes: i64,
    pub default_unit_minutes: Option<i64>,
}

impl From<RemovedWatchLog> for RemoveWatchLogResponse {
    fn from(removed: RemovedWatchLog) -> Self {
        Self {
            title_id: removed.title_id,
            total_units: removed.aggregates.total_units,
            total_minutes: removed.aggregates.total_minutes,
            default_unit_minutes: removed.aggregates.default_unit_minutes,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentLogsQuery {
    /// Maximum number of logs; non-positive values fall back to the default.
    pub limit: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentLogResponse {
    pub id: Uuid,
    pub title_id: Uuid,
    pub title_name: String,
    pub content_type: ContentTypeDto,
    pub language_code: String,
    pub units: i64,
    pub unit_minutes: i64,
    pub total_minutes: i64,
    pub logged_at: DateTime<Utc>,
}

impl From<RecentLog> for RecentLogResponse {
    fn from(log: RecentLog) -> Self {
        Self {
            id: log.id,
            title_id: log.title_id,
            title_name: log.title_name,
            content_type: log.content_type.into(),
            language_code: log.language_code,
            units: log.units,
            unit_minutes: log.unit_minutes,
            total_minutes: log.total_minutes,
            logged_at: log.logged_at,
        }
    }
}

//=========================================================================================
// Languages and Profile
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct LanguageResponse {
    pub code: String,
    pub label: String,
}

impl From<Language> for LanguageResponse {
    fn from(language: Language) -> Self {
        Self {
            code: language.code,
            label: language.label,
        }
    }
}

/// Payload for both language upserts and learning-language changes.
#[derive(Deserialize, Debug, ToSchema)]
pub struct LanguageRequest {
    pub code: String,
    pub label: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub key: String,
    pub display_name: String,
    pub learning_language_code: String,
    pub learning_language_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            key: profile.owner_key.to_string(),
            display_name: profile.display_name,
            learning_language_code: profile.learning_language_code,
            learning_language_label: profile.learning_language_label,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

//=========================================================================================
// Dashboard
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LanguageTotalResponse {
    pub language_code: String,
    pub language_label: String,
    pub total_minutes: i64,
    pub title_count: usize,
}

impl From<LanguageTotal> for LanguageTotalResponse {
    fn from(total: LanguageTotal) -> Self {
        Self {
            language_code: total.language_code,
            language_label: total.language_label,
            total_minutes: total.total_minutes,
            title_count: total.title_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopTitleResponse {
    pub id: Uuid,
    pub name: String,
    pub content_type: ContentTypeDto,
    pub language_code: String,
    pub total_units: i64,
    pub total_minutes: i64,
}

impl From<TopTitle> for TopTitleResponse {
    fn from(title: TopTitle) -> Self {
        Self {
            id: title.id,
            name: title.name,
            content_type: title.content_type.into(),
            language_code: title.language_code,
            total_units: title.total_units,
            total_minutes: title.total_minutes,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub learning_language_code: String,
    pub learning_language_label: String,
    pub learning_minutes: i64,
    pub non_learning_minutes: i64,
    pub remaining_budget_minutes: i64,
    pub debt_minutes: i64,
    pub coverage_ratio: f64,
    pub status: BudgetStatusDto,
    pub totals_by_language: Vec<LanguageTotalResponse>,
    pub top_titles: Vec<TopTitleResponse>,
    pub recent_logs: Vec<RecentLogResponse>,
}

impl From<DashboardSummary> for DashboardResponse {
    fn from(summary: DashboardSummary) -> Self {
        let budget = summary.budget;
        Self {
            learning_language_code: summary.learning_language_code,
            learning_language_label: summary.learning_language_label,
            learning_minutes: budget.learning_minutes,
            non_learning_minutes: budget.non_learning_minutes,
            remaining_budget_minutes: budget.remaining_budget_minutes,
            debt_minutes: budget.debt_minutes,
            coverage_ratio: budget.coverage_ratio,
            status: budget.status.into(),
            totals_by_language: summary.totals_by_language.into_iter().map(Into::into).collect(),
            top_titles: summary.top_titles.into_iter().map(Into::into).collect(),
            recent_logs: summary.recent_logs.into_iter().map(Into::into).collect(),
        }
    }
}
