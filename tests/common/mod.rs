// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use adventure_aggregator::config::Config;
use adventure_aggregator::db::{AdventureDb, FirestoreStore};
use adventure_aggregator::models::AdventureCreate;
use adventure_aggregator::routes::create_router;
use adventure_aggregator::AppState;
use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_store() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        db: AdventureDb::in_memory(),
    });

    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC3339")
        .with_timezone(&Utc)
}

/// A valid record with the given identity; tweak fields as needed.
#[allow(dead_code)]
pub fn adventure(unique_id: &str, provider_name: &str) -> AdventureCreate {
    AdventureCreate {
        unique_id: unique_id.to_string(),
        provider_name: provider_name.to_string(),
        trip_name: format!("Trip {}", unique_id),
        url: Some(format!("https://example.com/trips/{}", unique_id)),
        image_url: None,
        price: Some(500.0),
        currency: "GBP".to_string(),
        departure_date: parse_time("2026-06-01T00:00:00Z"),
        duration: Some(7),
        location: Some("Peru".to_string()),
        activity_type: Some("Hiking".to_string()),
    }
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
