//! Integration tests for the API Server
//!
//! Exercises every route against the in-memory repository.


use serde_json::{json, Value};
use tracing::Level;

use crate::test_utils::CapturedEvents;
use test_utils::TestApiServer;

const INVALID_PAYLOAD: &str = r#"{"error":"The payload is invalid"}"#;

fn firstnames(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|u| u["Firstname"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn list_users_returns_rows_in_id_order() {
    let app = TestApiServer::new();
    let response = app.server.get("/users").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body[0]["Id"], 1);
    assert_eq!(body[0]["Firstname"], "Guillaume");
    assert_eq!(body[1]["Id"], 2);
    assert_eq!(body[1]["Lastname"], "Breniaux");
}

#[tokio::test]
async fn list_users_on_empty_table_returns_empty_array() {
    let app = TestApiServer::empty();
    let response = app.server.get("/users").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn get_user_returns_the_record() {
    let app = TestApiServer::new();
    let response = app.server.get("/user/2").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "Id": 2,
            "Firstname": "Pauline",
            "Lastname": "Breniaux",
            "Address": "10 route de Rhye 74210 Mouthier-En-Bresse",
            "Phone": "0645124365"
        })
    );
}

#[tokio::test]
async fn get_missing_user_is_a_server_error() {
    let app = TestApiServer::new();
    let response = app.server.get("/user/42").await;
    assert_eq!(response.status_code(), 500);

    let body: Value = response.json();
    assert_eq!(body["error"], "no user with id 42");
}

#[tokio::test]
async fn non_numeric_id_is_not_routed() {
    let app = TestApiServer::new();
    let response = app.server.get("/user/abc").await;
    assert_eq!(response.status_code(), 404);

    let response = app.server.put("/user/1a").json(&json!({})).await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn id_overflowing_the_column_type_is_rejected() {
    let app = TestApiServer::new();
    let response = app.server.get("/user/99999999999").await;
    assert_eq!(response.status_code(), 400);

    let body: Value = response.json();
    assert_eq!(body["error"], "The user with Id 99999999999 is invalid");
}

#[tokio::test]
async fn create_user_echoes_the_submitted_record() {
    let app = TestApiServer::new();
    let payload = json!({
        "Firstname": "Ada",
        "Lastname": "Lovelace",
        "Address": "X",
        "Phone": "000"
    });

    let response = app.server.post("/user").json(&payload).await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["Firstname"], "Ada");
    assert_eq!(body["Lastname"], "Lovelace");
    assert_eq!(body["Address"], "X");
    assert_eq!(body["Phone"], "000");
    // The generated id is not read back
    assert_eq!(body["Id"], 0);
}

#[tokio::test]
async fn create_user_grows_the_listing_by_one() {
    let app = TestApiServer::new();
    let before: Value = app.server.get("/users").await.json();

    app.server
        .post("/user")
        .json(&json!({ "Firstname": "Grace", "Lastname": "Hopper" }))
        .await;

    let after: Value = app.server.get("/users").await.json();
    let before_len = before.as_array().map(Vec::len).unwrap_or_default();
    let after = after.as_array().expect("array body");
    assert_eq!(after.len(), before_len + 1);

    let created = after.last().expect("created row");
    assert_eq!(created["Id"], 3);
    assert_eq!(created["Firstname"], "Grace");
    assert_eq!(created["Address"], "");
}

#[tokio::test]
async fn malformed_json_is_rejected_on_create() {
    let app = TestApiServer::new();
    let response = app.server.post("/user").text("{\"Firstname\": ").await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.text(), INVALID_PAYLOAD);
    assert_eq!(app.repository.snapshot().len(), 2);
}

#[tokio::test]
async fn missing_name_is_rejected_on_create() {
    let app = TestApiServer::new();
    let response = app
        .server
        .post("/user")
        .json(&json!({ "Firstname": "Ada", "Address": "X" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.text(), INVALID_PAYLOAD);
}

#[tokio::test]
async fn malformed_json_is_rejected_on_update() {
    let app = TestApiServer::new();
    let response = app.server.put("/user/1").text("not json").await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.text(), INVALID_PAYLOAD);
}

#[tokio::test]
async fn update_overwrites_address_and_phone() {
    let app = TestApiServer::new();
    let payload = json!({
        "Firstname": "Guillaume",
        "Lastname": "Penaud",
        "Address": "1 rue Neuve",
        "Phone": "0102030405"
    });

    let response = app.server.put("/user/1").json(&payload).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["Address"], "1 rue Neuve");

    let stored: Value = app.server.get("/user/1").await.json();
    assert_eq!(stored["Firstname"], "Guillaume");
    assert_eq!(stored["Lastname"], "Penaud");
    assert_eq!(stored["Address"], "1 rue Neuve");
    assert_eq!(stored["Phone"], "0102030405");
}

#[tokio::test]
async fn update_is_keyed_on_the_body_not_the_path() {
    let app = TestApiServer::new();
    let payload = json!({
        "Firstname": "Pauline",
        "Lastname": "Breniaux",
        "Address": "elsewhere",
        "Phone": "1"
    });

    let response = app.server.put("/user/1").json(&payload).await;
    assert_eq!(response.status_code(), 200);

    let first: Value = app.server.get("/user/1").await.json();
    let second: Value = app.server.get("/user/2").await.json();
    assert_eq!(first["Address"], "16 sentier de la côte 94370 Sucy-En-Brie");
    assert_eq!(second["Address"], "elsewhere");
}

#[tokio::test]
async fn update_matching_no_rows_leaves_the_table_unchanged() {
    let app = TestApiServer::new();
    let before = app.repository.snapshot();

    let response = app
        .server
        .put("/user/7")
        .json(&json!({ "Firstname": "Nobody", "Lastname": "Here", "Phone": "9" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(app.repository.snapshot(), before);
}

#[tokio::test]
async fn delete_matching_no_rows_leaves_the_table_unchanged() {
    let app = TestApiServer::new();
    let before = app.repository.snapshot();

    let response = app.server.delete("/user/Nobody/Here").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({ "Id": 0, "Firstname": "Nobody", "Lastname": "Here", "Address": "", "Phone": "" })
    );
    assert_eq!(app.repository.snapshot(), before);
}

#[tokio::test]
async fn delete_with_non_alphabetic_name_is_not_routed() {
    let app = TestApiServer::new();
    let response = app.server.delete("/user/Ada2/Lovelace").await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(app.repository.snapshot().len(), 2);
}

#[tokio::test]
async fn create_list_delete_round_trip() {
    let app = TestApiServer::new();

    let response = app
        .server
        .post("/user")
        .json(&json!({
            "Firstname": "Ada",
            "Lastname": "Lovelace",
            "Address": "X",
            "Phone": "000"
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let listed: Value = app.server.get("/users").await.json();
    assert!(firstnames(&listed).contains(&"Ada".to_string()));

    let response = app.server.delete("/user/Ada/Lovelace").await;
    assert_eq!(response.status_code(), 200);

    let listed: Value = app.server.get("/users").await.json();
    assert!(!firstnames(&listed).contains(&"Ada".to_string()));
}

#[tokio::test]
async fn store_failures_are_reported_as_json_errors() {
    let app = TestApiServer::new();
    app.repository.set_failing(true);

    let response = app.server.get("/users").await;
    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("database connection unavailable"));

    let response = app
        .server
        .post("/user")
        .json(&json!({ "Firstname": "Ada", "Lastname": "Lovelace" }))
        .await;
    assert_eq!(response.status_code(), 500);

    let response = app.server.delete("/user/Ada/Lovelace").await;
    assert_eq!(response.status_code(), 500);
}

#[tokio::test]
async fn initialize_db_resets_to_the_seed_rows() {
    let app = TestApiServer::new();
    app.server
        .post("/user")
        .json(&json!({ "Firstname": "Ada", "Lastname": "Lovelace" }))
        .await;

    let response = app.server.get("/initialize_db").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>(), json!({ "initialized": true }));
    let first: Value = app.server.get("/users").await.json();

    let response = app.server.get("/initialize_db").await;
    assert_eq!(response.status_code(), 200);
    let second: Value = app.server.get("/users").await.json();

    assert_eq!(first, second);
    assert_eq!(firstnames(&first), vec!["Guillaume", "Pauline"]);
}

#[tokio::test]
async fn initialize_db_failure_is_a_server_error() {
    let app = TestApiServer::new();
    app.repository.set_failing(true);

    let response = app.server.get("/initialize_db").await;
    assert_eq!(response.status_code(), 500);

    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("Database is not initializable - Error: "));
}

#[tokio::test]
async fn requests_are_counted_in_metrics() {
    let app = TestApiServer::new();
    for _ in 0..3 {
        app.server.get("/users").await;
    }

    assert_eq!(app.metrics.http_requests_total.get(), 3);
    assert_eq!(app.metrics.http_requests_in_flight.get(), 0);
}

#[tokio::test]
async fn server_error_is_logged_once() {
    let (captured, _guard) = CapturedEvents::install();
    let app = TestApiServer::new();
    app.repository.set_failing(true);

    let response = app.server.get("/users").await;
    assert_eq!(response.status_code(), 500);

    let errors = captured.at(Level::ERROR);
    assert_eq!(errors.len(), 1, "error events: {errors:?}");
    assert!(errors[0]
        .message
        .starts_with("database connection unavailable"));
}

#[tokio::test]
async fn response_bodies_are_logged_at_debug() {
    let (captured, _guard) = CapturedEvents::install();
    let app = TestApiServer::new();

    app.server.get("/user/1").await;
    app.server
        .post("/user")
        .json(&json!({ "Firstname": "Ada", "Lastname": "Lovelace" }))
        .await;
    app.server.delete("/user/Ada/Lovelace").await;
    app.server.get("/initialize_db").await;

    let bodies: Vec<Value> = captured
        .at(Level::DEBUG)
        .iter()
        .filter(|event| event.message == "JSON response")
        .filter_map(|event| event.field("body"))
        .map(|body| serde_json::from_str(body).expect("logged body is JSON"))
        .collect();

    assert_eq!(bodies.len(), 4);
    assert_eq!(bodies[0]["Firstname"], "Guillaume");
    assert_eq!(bodies[1]["Lastname"], "Lovelace");
    assert_eq!(bodies[2]["Firstname"], "Ada");
    assert_eq!(bodies[3], json!({ "initialized": true }));
}
