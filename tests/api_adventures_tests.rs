// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Adventure API tests against the in-memory store.

use adventure_aggregator::models::{AdventureQuery, ListParams};
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{adventure, body_json, get_request, json_request};

#[tokio::test]
async fn test_root_welcome_message() {
    let (app, _state) = common::create_test_app();

    let response = app.oneshot(get_request("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Welcome to the Adventure Aggregator API!" })
    );
}

#[tokio::test]
async fn test_health_reports_store_backend() {
    let (app, _state) = common::create_test_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _state) = common::create_test_app();

    let response = app.oneshot(get_request("/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_upsert_twice_keeps_one_record() {
    let (app, _state) = common::create_test_app();

    let mut record = adventure("T1-1700000000", "G Adventures");
    let response = app
        .clone()
        .oneshot(json_request("POST", "/adventures/", &record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored["unique_id"], "T1-1700000000");
    assert_eq!(stored["price"], 500.0);
    assert!(stored["last_seen_at"].is_string());

    record.price = Some(450.0);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/adventures/", &record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/adventures/")).await.unwrap();
    let list = body_json(response).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["price"], 450.0);
}

#[tokio::test]
async fn test_bare_path_is_served() {
    let (app, _state) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/adventures", &adventure("a", "P")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/adventures")).await.unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_sorts_by_price_descending_with_limit() {
    let (app, state) = common::create_test_app();
    for (id, price) in [("a", Some(300.0)), ("b", Some(900.0)), ("c", None), ("d", Some(600.0))] {
        let mut record = adventure(id, "P");
        record.price = price;
        state.db.upsert_adventure(record).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(get_request("/adventures/?sort_by=price&order=desc&limit=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["unique_id"].as_str().unwrap())
        .collect();
    // missing prices sort first when descending
    assert_eq!(ids, vec!["c", "b", "d"]);

    let response = app
        .oneshot(get_request("/adventures/?sort_by=price&order=asc&limit=2&offset=1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["unique_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["d", "b"]);
}

#[tokio::test]
async fn test_unknown_sort_column_is_ignored() {
    let (app, state) = common::create_test_app();
    state
        .db
        .upsert_adventure(adventure("a", "P"))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request("/adventures/?sort_by=unique_id;DROP&order=sideways"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_filters_are_case_insensitive_substrings() {
    let (app, state) = common::create_test_app();
    let mut hiking = adventure("hike", "P");
    hiking.activity_type = Some("Hiking".to_string());
    hiking.location = Some("Peru, Bolivia".to_string());
    let mut cycling = adventure("cycle", "P");
    cycling.activity_type = Some("Cycling".to_string());
    cycling.location = Some("Peru".to_string());
    let mut unknown = adventure("unknown", "P");
    unknown.activity_type = None;
    for record in [hiking, cycling, unknown] {
        state.db.upsert_adventure(record).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(get_request("/adventures/?activity_type=hik"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["unique_id"], "hike");

    let response = app
        .oneshot(get_request("/adventures/?location=BOLIV&activity_type=ING"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["unique_id"], "hike");
}

#[tokio::test]
async fn test_empty_result_is_empty_array() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(get_request("/adventures/?location=atlantis"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_invalid_record_is_unprocessable() {
    let (app, state) = common::create_test_app();
    let mut record = adventure("", "P");
    record.currency = "POUNDS".to_string();

    let response = app
        .oneshot(json_request("POST", "/adventures/", &record))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(state
        .db
        .list_adventures(&AdventureQuery::from(ListParams::default()))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unparseable_date_is_unprocessable() {
    let (app, _state) = common::create_test_app();
    let mut body = serde_json::to_value(adventure("a", "P")).unwrap();
    body["departure_date"] = json!("next tuesday");

    let response = app
        .oneshot(json_request("POST", "/adventures/", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_body");
    assert!(body["detail"].as_str().unwrap().contains("departure_date"));
}

#[tokio::test]
async fn test_malformed_json_is_json_error() {
    let (app, _state) = common::create_test_app();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/adventures/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"unique_id\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_body");
}

#[tokio::test]
async fn test_bad_query_string_is_json_error() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(get_request("/adventures/?limit=-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_query");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_sweep_removes_only_stale_records_of_provider() {
    let (app, state) = common::create_test_app();
    state
        .db
        .upsert_adventure(adventure("old", "Mapo Tapo"))
        .await
        .unwrap();
    state
        .db
        .upsert_adventure(adventure("other", "G Adventures"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let cutoff = chrono::Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    state
        .db
        .upsert_adventure(adventure("fresh", "Mapo Tapo"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/adventures/sweep",
            &json!({ "provider_name": "Mapo Tapo", "seen_before": cutoff }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "deleted": 1 }));

    let response = app
        .oneshot(get_request("/adventures/?limit=10"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let mut ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["unique_id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["fresh", "other"]);
}

#[tokio::test]
async fn test_sweep_requires_provider_name() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/adventures/sweep",
            &json!({ "provider_name": "  ", "seen_before": "2026-01-01T00:00:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_allows_localhost_origin() {
    let (app, _state) = common::create_test_app();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/adventures/")
        .header("origin", "http://localhost:5173")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:5173"
    );
}
