//! Drives the router end to end over the in-memory store.

use api_lib::{
    adapters::MemoryAdapter,
    config::Config,
    web::{build_router, middleware::OWNER_KEY_HEADER, state::AppState},
};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use series_learner_core::service::Tracker;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let config = Arc::new(Config::from_lookup(|_| None).expect("default config"));
    let state = Arc::new(AppState {
        tracker: Tracker::new(Arc::new(MemoryAdapter::new()), config.unit_minutes),
        config,
    });
    build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, method, uri, body, None).await
}

async fn send_as(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    owner: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_KEY_HEADER, owner);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_title(app: &Router, name: &str, language_code: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/titles",
        Some(json!({ "name": name, "contentType": "series", "languageCode": language_code })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_watch_log_round_trip_over_http() {
    let app = app();
    let title_id = create_title(&app, "Borgen", "da").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/watch-logs",
        Some(json!({ "titleId": title_id, "units": 2, "unitMinutes": 58 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["totalUnits"], 2);
    assert_eq!(body["totalMinutes"], 116);
    assert_eq!(body["defaultUnitMinutes"], 58);
    let log_id = body["logId"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/watch-logs?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["titleName"], "Borgen");

    let (status, body) = send(&app, Method::DELETE, &format!("/watch-logs/{log_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["titleId"], title_id.as_str());
    assert_eq!(body["totalMinutes"], 0);
    assert_eq!(body["defaultUnitMinutes"], Value::Null);

    let (status, body) = send(&app, Method::DELETE, &format!("/watch-logs/{log_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Watch log not found.");
}

#[tokio::test]
async fn test_validation_errors_map_to_bad_request() {
    let app = app();
    let title_id = create_title(&app, "Borgen", "da").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/watch-logs",
        Some(json!({ "titleId": title_id, "units": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unit minutes are required for the first entry.");

    let (status, _) = send(
        &app,
        Method::POST,
        "/watch-logs",
        Some(json!({ "titleId": title_id, "units": 1.5, "unitMinutes": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/titles",
        Some(json!({ "name": " ", "contentType": "movie", "languageCode": "da" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title name is required.");
}

#[tokio::test]
async fn test_title_edit_and_removal() {
    let app = app();
    let title_id = create_title(&app, "Borgen", "da").await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/titles/{title_id}"),
        Some(json!({ "archived": true, "defaultUnitMinutes": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["archived"], true);
    assert_eq!(body["defaultUnitMinutes"], 45);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/titles/{title_id}"),
        Some(json!({ "defaultUnitMinutes": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["defaultUnitMinutes"], Value::Null);
    assert_eq!(body["archived"], true);

    let (status, body) = send(&app, Method::GET, "/titles?archived=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send_as(
        &app,
        Method::DELETE,
        &format!("/titles/{title_id}"),
        None,
        Some("someone-else"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::DELETE, &format!("/titles/{title_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedLogs"], 0);

    let (status, _) = send(&app, Method::DELETE, &format!("/titles/{title_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_header_scopes_titles() {
    let app = app();
    create_title(&app, "Borgen", "da").await;

    let (_, mine) = send(&app, Method::GET, "/titles", None).await;
    let (_, theirs) = send_as(&app, Method::GET, "/titles", None, Some("guest")).await;

    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert!(theirs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_logging_on_another_owners_title_is_forbidden() {
    let app = app();
    let title_id = create_title(&app, "Borgen", "da").await;

    let (status, body) = send_as(
        &app,
        Method::POST,
        "/watch-logs",
        Some(json!({ "titleId": title_id, "units": 2, "unitMinutes": 50 })),
        Some("guest"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You do not have permission to log time for this title.");

    let (_, dashboard) = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(dashboard["learningMinutes"], 0);
}

#[tokio::test]
async fn test_profile_and_dashboard() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/profile/setup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "local");
    assert_eq!(body["learningLanguageCode"], "da");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/profile/learning-language",
        Some(json!({ "code": "EN", "label": "English" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["learningLanguageCode"], "en");

    let english = create_title(&app, "The Wire", "en").await;
    let danish = create_title(&app, "Borgen", "da").await;
    for (title_id, units) in [(&english, 3), (&danish, 1)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/watch-logs",
            Some(json!({ "titleId": title_id, "units": units, "unitMinutes": 60 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["learningLanguageCode"], "en");
    assert_eq!(body["learningMinutes"], 180);
    assert_eq!(body["nonLearningMinutes"], 60);
    assert_eq!(body["remainingBudgetMinutes"], 120);
    assert_eq!(body["debtMinutes"], 0);
    assert_eq!(body["coverageRatio"], 3.0);
    assert_eq!(body["status"], "within_budget");
    assert_eq!(body["topTitles"][0]["name"], "The Wire");
    assert_eq!(body["recentLogs"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/languages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["label"], "Danish");
    assert_eq!(body[1]["label"], "English");
}
