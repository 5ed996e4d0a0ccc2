//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    AddWatchLogRequest, AddWatchLogResponse, BudgetStatusDto, ContentTypeDto, CreateTitleRequest,
    DashboardResponse, ErrorResponse, LanguageRequest, LanguageResponse, LanguageTotalResponse,
    ProfileResponse, RecentLogResponse, RecentLogsQuery, RemoveTitleResponse,
    RemoveWatchLogResponse, TitleListQuery, TitleResponse, TopTitleResponse, UpdateTitleRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use series_learner_core::domain::OwnerKey;
use series_learner_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        dashboard_handler,
        list_titles_handler,
        create_title_handler,
        update_title_handler,
        remove_title_handler,
        list_watch_logs_handler,
        add_watch_log_handler,
        remove_watch_log_handler,
        list_languages_handler,
        upsert_language_handler,
        get_profile_handler,
        setup_profile_handler,
        set_learning_language_handler,
    ),
    components(
        schemas(
            AddWatchLogRequest, AddWatchLogResponse, BudgetStatusDto, ContentTypeDto,
            CreateTitleRequest, DashboardResponse, ErrorResponse, LanguageRequest,
            LanguageResponse, LanguageTotalResponse, ProfileResponse, RecentLogResponse,
            RemoveTitleResponse, RemoveWatchLogResponse, TitleResponse, TopTitleResponse,
            UpdateTitleRequest,
        )
    ),
    tags(
        (name = "Series Learner API", description = "Watch-time tracking and language budget endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Turns a core error into an HTTP response with a JSON `{ "error": ... }` body.
#[derive(Debug)]
pub struct HttpError(pub PortError);

impl From<PortError> for HttpError {
    fn from(e: PortError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            PortError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            PortError::Permission(message) => (StatusCode::FORBIDDEN, message),
            e @ (PortError::Configuration(_) | PortError::Unexpected(_)) => {
                error!("Storage failure: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not sync with storage.".to_string(),
                )
            }
        };

        if status.is_client_error() {
            warn!(status = %status, "Request rejected: {}", message);
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type HandlerResult<T> = Result<T, HttpError>;

//=========================================================================================
// Dashboard
//=========================================================================================

/// Aggregate minutes per language, the budget, top titles and recent activity.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    params(("x-owner-key" = Option<String>, Header, description = "Owner to act for."))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
) -> HandlerResult<Json<DashboardResponse>> {
    let summary = state.tracker.dashboard_summary(&owner_key).await?;
    Ok(Json(summary.into()))
}

//=========================================================================================
// Titles
//=========================================================================================

#[utoipa::path(
    get,
    path = "/titles",
    params(TitleListQuery),
    responses(
        (status = 200, description = "Titles of the owner", body = [TitleResponse]),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn list_titles_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Query(query): Query<TitleListQuery>,
) -> HandlerResult<Json<Vec<TitleResponse>>> {
    let titles = state.tracker.list_titles(&owner_key, query.into()).await?;
    Ok(Json(titles.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/titles",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Title created", body = TitleResponse),
        (status = 400, description = "Invalid title", body = ErrorResponse)
    )
)]
pub async fn create_title_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Json(req): Json<CreateTitleRequest>,
) -> HandlerResult<(StatusCode, Json<TitleResponse>)> {
    let title = state.tracker.create_title(&owner_key, req.into()).await?;
    info!(title_id = %title.id, language = %title.language_code, "Created title");
    Ok((StatusCode::CREATED, Json(title.into())))
}

#[utoipa::path(
    patch,
    path = "/titles/{title_id}",
    request_body = UpdateTitleRequest,
    params(("title_id" = Uuid, Path, description = "Title to edit.")),
    responses(
        (status = 200, description = "Title updated", body = TitleResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 403, description = "Title belongs to another owner", body = ErrorResponse),
        (status = 404, description = "Title not found", body = ErrorResponse)
    )
)]
pub async fn update_title_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Path(title_id): Path<Uuid>,
    Json(req): Json<UpdateTitleRequest>,
) -> HandlerResult<Json<TitleResponse>> {
    let title = state
        .tracker
        .update_title(&owner_key, title_id, req.into())
        .await?;
    Ok(Json(title.into()))
}

/// Deletes a title and every watch log that references it.
#[utoipa::path(
    delete,
    path = "/titles/{title_id}",
    params(("title_id" = Uuid, Path, description = "Title to remove.")),
    responses(
        (status = 200, description = "Title removed", body = RemoveTitleResponse),
        (status = 403, description = "Title belongs to another owner", body = ErrorResponse),
        (status = 404, description = "Title not found", body = ErrorResponse)
    )
)]
pub async fn remove_title_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Path(title_id): Path<Uuid>,
) -> HandlerResult<Json<RemoveTitleResponse>> {
    let removed = state.tracker.remove_title(&owner_key, title_id).await?;
    info!(
        title_id = %removed.title_id,
        deleted_logs = removed.deleted_logs,
        "Removed title"
    );
    Ok(Json(removed.into()))
}

//=========================================================================================
// Watch Logs
//=========================================================================================

#[utoipa::path(
    get,
    path = "/watch-logs",
    params(RecentLogsQuery),
    responses(
        (status = 200, description = "Most recent watch logs", body = [RecentLogResponse])
    )
)]
pub async fn list_watch_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Query(query): Query<RecentLogsQuery>,
) -> HandlerResult<Json<Vec<RecentLogResponse>>> {
    let limit = query.limit.and_then(|limit| usize::try_from(limit).ok());
    let logs = state.tracker.list_recent_logs(&owner_key, limit).await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

/// Logs a watch session. `unitMinutes` may be omitted once the title has been logged before.
#[utoipa::path(
    post,
    path = "/watch-logs",
    request_body = AddWatchLogRequest,
    responses(
        (status = 201, description = "Watch log added", body = AddWatchLogResponse),
        (status = 400, description = "Invalid units or minutes", body = ErrorResponse),
        (status = 403, description = "Title belongs to another owner", body = ErrorResponse),
        (status = 404, description = "Title not found", body = ErrorResponse)
    )
)]
pub async fn add_watch_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Json(req): Json<AddWatchLogRequest>,
) -> HandlerResult<(StatusCode, Json<AddWatchLogResponse>)> {
    let title_id = req.title_id;
    let added = state.tracker.add_watch_log(&owner_key, req.into()).await?;
    info!(
        %title_id,
        log_id = %added.log_id,
        total_minutes = added.aggregates.total_minutes,
        "Added watch log"
    );
    Ok((StatusCode::CREATED, Json(added.into())))
}

#[utoipa::path(
    delete,
    path = "/watch-logs/{log_id}",
    params(("log_id" = Uuid, Path, description = "Watch log to remove.")),
    responses(
        (status = 200, description = "Watch log removed", body = RemoveWatchLogResponse),
        (status = 404, description = "Watch log not found", body = ErrorResponse)
    )
)]
pub async fn remove_watch_log_handler(
    State(state): State<Arc<AppState>>,
    Path(log_id): Path<Uuid>,
) -> HandlerResult<Json<RemoveWatchLogResponse>> {
    let removed = state.tracker.remove_watch_log(log_id).await?;
    info!(%log_id, title_id = %removed.title_id, "Removed watch log");
    Ok(Json(removed.into()))
}

//=========================================================================================
// Languages
//=========================================================================================

#[utoipa::path(
    get,
    path = "/languages",
    responses((status = 200, description = "Known languages", body = [LanguageResponse]))
)]
pub async fn list_languages_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<LanguageResponse>>> {
    let languages = state.tracker.list_languages().await?;
    Ok(Json(languages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/languages",
    request_body = LanguageRequest,
    responses(
        (status = 200, description = "Language stored", body = LanguageResponse),
        (status = 400, description = "Missing code or label", body = ErrorResponse)
    )
)]
pub async fn upsert_language_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LanguageRequest>,
) -> HandlerResult<Json<LanguageResponse>> {
    let language = state.tracker.upsert_language(&req.code, &req.label).await?;
    Ok(Json(language.into()))
}

//=========================================================================================
// Profile
//=========================================================================================

#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "The owner's profile", body = ProfileResponse))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
) -> HandlerResult<Json<ProfileResponse>> {
    let profile = state.tracker.get_profile(&owner_key).await?;
    Ok(Json(profile.into()))
}

/// Seeds the default profile and languages. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/profile/setup",
    responses((status = 200, description = "Profile ready", body = ProfileResponse))
)]
pub async fn setup_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
) -> HandlerResult<Json<ProfileResponse>> {
    let profile = state.tracker.ensure_setup(&owner_key).await?;
    Ok(Json(profile.into()))
}

#[utoipa::path(
    put,
    path = "/profile/learning-language",
    request_body = LanguageRequest,
    responses(
        (status = 200, description = "Learning language changed", body = ProfileResponse),
        (status = 400, description = "Missing code or label", body = ErrorResponse)
    )
)]
pub async fn set_learning_language_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_key): Extension<OwnerKey>,
    Json(req): Json<LanguageRequest>,
) -> HandlerResult<Json<ProfileResponse>> {
    let profile = state
        .tracker
        .set_learning_language(&owner_key, &req.code, &req.label)
        .await?;
    info!(owner = %owner_key, language = %profile.learning_language_code, "Changed learning language");
    Ok(Json(profile.into()))
}
