//! Integration tests for Airwatch API endpoints.
//!
//! These tests verify the full request/response cycle through the HTTP API.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;

use airwatch::api::{AppState, router};
use airwatch::engine::Monitor;
use airwatch::model::{AqiSample, Measurement, PollutantReading};
use airwatch::simulator::Simulator;

fn create_state() -> AppState {
    let locations = vec!["Downtown".to_string(), "Industrial Zone".to_string()];
    let monitor = Monitor::new(
        Simulator::seeded(11),
        &locations,
        chrono::Duration::hours(24),
        Utc::now(),
    );
    AppState::new(monitor)
}

fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(router(state)).unwrap()
}

async fn ingest(state: &AppState, location: &str, aqi: f64) {
    let now = Utc::now();
    state.monitor.lock().await.ingest(Measurement {
        reading: PollutantReading::reference(location, now),
        sample: AqiSample::new(location, aqi, now),
    });
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server(create_state());

    let response = server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_current_lists_every_location() {
    let server = create_test_server(create_state());

    let response = server.get("/current").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let locations = body.as_array().unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0]["measurement"]["sample"]["value"], 42.0);
    assert_eq!(locations[0]["classification"]["band"], "good");
    assert_eq!(locations[0]["classification"]["tier"], "favorable");
}

#[tokio::test]
async fn test_current_history_after_ingest() {
    let state = create_state();
    let server = create_test_server(state.clone());

    ingest(&state, "Downtown", 80.0).await;

    let response = server.get("/current/history").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body[0]["location"], "Downtown");
    assert_eq!(body[0]["values"], json!([80.0]));
    assert_eq!(body[1]["values"], json!([]));
}

#[tokio::test]
async fn test_all_scope_rule_does_not_flap_between_locations() {
    let state = create_state();
    let server = create_test_server(state.clone());

    server
        .put("/alerts/rules/everywhere")
        .json(&json!({ "threshold": 50 }))
        .await
        .assert_status_ok();

    for _ in 0..5 {
        ingest(&state, "Downtown", 60.0).await;
        ingest(&state, "Industrial Zone", 40.0).await;
    }

    let notifications: serde_json::Value = server.get("/notifications").await.json();
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["location"], "Downtown");
}

#[tokio::test]
async fn test_put_and_list_rules() {
    let server = create_test_server(create_state());

    let response = server
        .put("/alerts/rules/downtown-watch")
        .json(&json!({
            "location_scope": "Downtown",
            "threshold": 100,
            "frequency_mode": "hourly",
            "channel": "sms"
        }))
        .await;
    response.assert_status_ok();

    let rules: serde_json::Value = server.get("/alerts/rules").await.json();
    assert_eq!(rules[0]["id"], "downtown-watch");
    assert_eq!(rules[0]["frequency_mode"], "hourly");
    assert_eq!(rules[0]["enabled"], true);
}

#[tokio::test]
async fn test_put_rule_rejects_out_of_range_threshold() {
    let server = create_test_server(create_state());

    let response = server
        .put("/alerts/rules/bad")
        .json(&json!({ "threshold": 250 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_unknown_rule() {
    let server = create_test_server(create_state());

    let response = server.delete("/alerts/rules/missing").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_breach_then_acknowledge() {
    let state = create_state();
    let server = create_test_server(state.clone());

    server
        .put("/alerts/rules/r1")
        .json(&json!({ "threshold": 50 }))
        .await
        .assert_status_ok();

    for aqi in [40.0, 60.0, 70.0, 45.0] {
        ingest(&state, "Downtown", aqi).await;
    }

    let notifications: serde_json::Value = server.get("/notifications").await.json();
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 2);

    let kinds: Vec<&str> = notifications
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"breach"));
    assert!(kinds.contains(&"recovered"));

    let id = notifications[0]["id"].as_str().unwrap();
    server
        .post(&format!("/notifications/{}/ack", id))
        .await
        .assert_status_ok();

    let remaining: serde_json::Value = server.get("/notifications").await.json();
    assert_eq!(remaining.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_acknowledge_unknown_notification() {
    let server = create_test_server(create_state());

    let response = server
        .post("/notifications/00000000-0000-0000-0000-000000000000/ack")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_incomplete() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommendations")
        .json(&json!({ "activity": "Mostly Indoors" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "incomplete");
    assert_eq!(body["answered"], 1);
}

#[tokio::test]
async fn test_recommendations_ready() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommendations")
        .json(&json!({
            "activity": "Athletic Training",
            "sensitivity": "Severe",
            "location_type": "Industrial Zone"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ready");
    let bundles = body["bundles"].as_array().unwrap();
    assert_eq!(bundles.len(), 4);
    assert_eq!(bundles[0]["tips"][0], "Always carry an N95 mask");
    assert_eq!(bundles[3]["title"], "Special Considerations");
}

#[tokio::test]
async fn test_get_trend() {
    let server = create_test_server(create_state());

    let response = server.get("/trends/weekly").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["labels"].as_array().unwrap().len(), 7);
    assert_eq!(body["values"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_get_trend_invalid_period() {
    let server = create_test_server(create_state());

    let response = server.get("/trends/decade").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("decade"));
}

#[tokio::test]
async fn test_put_trend_replaces_series() {
    let server = create_test_server(create_state());

    server
        .put("/trends/monthly")
        .json(&json!({ "labels": ["W1", "W2"], "values": [30.0, 35.0] }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server.get("/trends/monthly").await.json();
    assert_eq!(body["labels"], json!(["W1", "W2"]));

    server
        .put("/trends/monthly")
        .json(&json!({ "labels": ["W1"], "values": [30.0, 35.0] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_and_snapshot() {
    let server = create_test_server(create_state());

    let comparison: serde_json::Value = server
        .post("/trends/compare")
        .json(&json!({ "current": [0.0, 0.0], "previous": [0.0, 0.0] }))
        .await
        .json();
    assert_eq!(comparison["direction"], "undefined");
    assert_eq!(comparison["percent_delta"], "undefined");

    let response = server
        .post("/trends/snapshot")
        .json(&json!({
            "current": [65.0, 59.0, 90.0, 81.0, 56.0, 55.0],
            "previous": [28.0, 48.0, 40.0, 19.0, 96.0, 27.0]
        }))
        .await;
    response.assert_status_ok();
    let deltas: serde_json::Value = response.json();
    assert_eq!(deltas.as_array().unwrap().len(), 6);
    assert_eq!(deltas[0]["pollutant"], "pm25");

    server
        .post("/trends/snapshot")
        .json(&json!({ "current": [1.0, 2.0], "previous": [1.0, 2.0] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
