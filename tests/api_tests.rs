use axum::body::Body;
use http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use parking_allocator::config::EnvironmentConfig;
use parking_allocator::models::{Occupant, SpotState, Ticket, Vehicle};
use parking_allocator::repositories::{InMemoryStore, Repositories};
use parking_allocator::utils::jwt::{generate_token, JwtConfig};
use parking_allocator::{create_app, AppState};

const SECRET: &str = "test-secret";

struct TestApp {
    router: axum::Router,
    store: InMemoryStore,
    token: String,
}

struct TestResponse {
    status: StatusCode,
    body: Value,
}

impl TestApp {
    async fn request(&self, method: Method, path: &str, body: Option<Value>, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, body }
    }

    async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None, Some(&self.token)).await
    }

    async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body), Some(&self.token)).await
    }

    async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, path, Some(body), Some(&self.token)).await
    }

    async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, None, Some(&self.token)).await
    }
}

/// Almacén con ABC-123, servicios 1 (10) y 2 (50) y siete plazas libres
async fn create_test_app() -> TestApp {
    let store = InMemoryStore::new();
    store
        .insert_vehicle(Vehicle {
            license_plate: "ABC-123".to_string(),
            customer_id: Some(1),
            vehicle_type: "Car".to_string(),
            brand: Some("Toyota".to_string()),
            color: None,
        })
        .await;
    store
        .insert_vehicle(Vehicle {
            license_plate: "XYZ-789".to_string(),
            customer_id: None,
            vehicle_type: "Car".to_string(),
            brand: None,
            color: None,
        })
        .await;
    store.insert_service("Hourly", Decimal::new(10, 0), "Car").await;
    store.insert_service("Daily", Decimal::new(50, 0), "Car").await;
    for _ in 0..7 {
        store.insert_spot("Car", 1, SpotState::Available).await;
    }

    let config = EnvironmentConfig::for_memory(SECRET);
    let token = generate_token(
        "operator",
        Some("staff"),
        3600,
        &JwtConfig {
            secret: SECRET.to_string(),
        },
    )
    .unwrap();

    let router = create_app(AppState::new(Repositories::in_memory(store.clone()), config));
    TestApp { router, store, token }
}

fn issue_body(plate: &str, spot_id: i64, service_id: i64) -> Value {
    let now = Utc::now();
    json!({
        "license_plate": plate,
        "issued_time": now.to_rfc3339(),
        "expired_time": (now + Duration::hours(8)).to_rfc3339(),
        "service_id": service_id,
        "parking_spot_id": spot_id
    })
}

#[tokio::test]
async fn test_health_check_is_public() {
    let app = create_test_app().await;
    let response = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_valid_token() {
    let app = create_test_app().await;

    let missing = app.request(Method::GET, "/api/tickets", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["code"], "UNAUTHORIZED");

    let forged = generate_token(
        "intruder",
        None,
        3600,
        &JwtConfig {
            secret: "other-secret".to_string(),
        },
    )
    .unwrap();
    let invalid = app.request(Method::GET, "/api/tickets", None, Some(&forged)).await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_issue_ticket_occupies_spot_seven() {
    let app = create_test_app().await;

    let response = app.post("/api/tickets", issue_body("ABC-123", 7, 2)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    let ticket = &response.body["data"];
    assert_eq!(ticket["amount"], "50");
    assert_eq!(ticket["status"], "Active");
    assert_eq!(ticket["parking_spot_id"], 7);

    let spot = app.get("/api/parking-spots/7").await;
    assert_eq!(spot.status, StatusCode::OK);
    assert_eq!(spot.body["status"], "Occupied");
    assert_eq!(spot.body["license_plate"], "ABC-123");
}

#[tokio::test]
async fn test_issue_on_occupied_spot_conflicts() {
    let app = create_test_app().await;
    app.post("/api/tickets", issue_body("ABC-123", 7, 2)).await;

    let response = app.post("/api/tickets", issue_body("XYZ-789", 7, 2)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "CONFLICT");
    assert!(response.body["message"].as_str().unwrap().contains("spot unavailable"));
    assert_eq!(app.store.ticket_count().await, 1);
}

#[tokio::test]
async fn test_issue_validation_and_unknown_vehicle() {
    let app = create_test_app().await;

    let response = app
        .post("/api/tickets", json!({ "license_plate": "ABC-123", "service_id": 2 }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let response = app.post("/api/tickets", issue_body("NOPE-000", 1, 2)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.ticket_count().await, 0);

    let spot = app.get("/api/parking-spots/1").await;
    assert_eq!(spot.body["status"], "Available");
}

#[tokio::test]
async fn test_concurrent_issue_on_same_spot() {
    let app = create_test_app().await;

    let requests = ["ABC-123", "XYZ-789"]
        .into_iter()
        .map(|plate| app.post("/api/tickets", issue_body(plate, 3, 1)));
    let responses = futures::future::join_all(requests).await;

    let created = responses.iter().filter(|r| r.status == StatusCode::CREATED).count();
    let conflicts = responses.iter().filter(|r| r.status == StatusCode::CONFLICT).count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(app.store.ticket_count().await, 1);
}

#[tokio::test]
async fn test_extend_expired_ticket_ten() {
    let app = create_test_app().await;
    let now = Utc::now();
    let old_expiry = now - Duration::hours(1);
    app.store
        .put_ticket(Ticket {
            id: 10,
            license_plate: "ABC-123".to_string(),
            parking_spot_id: None,
            service_id: 1,
            issued_time: now - Duration::hours(3),
            expired_time: old_expiry,
            amount: Decimal::new(10, 0),
            used: false,
            created_at: now - Duration::hours(3),
        })
        .await;

    let before = app.get("/api/tickets/10").await;
    assert_eq!(before.body["status"], "Expired");

    let response = app.put("/api/tickets/10", json!({ "extend_by_minutes": 120 })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "Active");

    let new_expiry: chrono::DateTime<Utc> =
        serde_json::from_value(response.body["data"]["expired_time"].clone()).unwrap();
    assert_eq!(new_expiry, old_expiry + Duration::hours(2));
}

#[tokio::test]
async fn test_void_is_idempotent_and_blocks_extend() {
    let app = create_test_app().await;
    let created = app.post("/api/tickets", issue_body("ABC-123", 2, 1)).await;
    let id = created.body["data"]["id"].as_i64().unwrap();
    let path = format!("/api/tickets/{}", id);

    let first = app.put(&path, json!({ "action": "void" })).await;
    let second = app.put(&path, json!({ "status": "Used" })).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body["data"], second.body["data"]);
    assert_eq!(second.body["data"]["status"], "Used");

    let extend = app.put(&path, json!({ "action": "extend" })).await;
    assert_eq!(extend.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_renew_expired_ticket() {
    let app = create_test_app().await;
    let now = Utc::now();
    app.store
        .put_ticket(Ticket {
            id: 20,
            license_plate: "ABC-123".to_string(),
            parking_spot_id: None,
            service_id: 2,
            issued_time: now - Duration::hours(12),
            expired_time: now - Duration::hours(4),
            amount: Decimal::new(50, 0),
            used: false,
            created_at: now - Duration::hours(12),
        })
        .await;

    let response = app.put("/api/tickets/20", json!({ "action": "renew" })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "Active");
}

#[tokio::test]
async fn test_update_ticket_rejects_mixed_signals() {
    let app = create_test_app().await;
    let created = app.post("/api/tickets", issue_body("ABC-123", 4, 1)).await;
    let id = created.body["data"]["id"].as_i64().unwrap();

    let response = app
        .put(
            &format!("/api/tickets/{}", id),
            json!({ "extend_by_minutes": 30, "status": "Used" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.put(&format!("/api/tickets/{}", id), json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_and_stats() {
    let app = create_test_app().await;
    app.post("/api/tickets", issue_body("ABC-123", 1, 1)).await;
    app.post("/api/tickets", issue_body("XYZ-789", 2, 1)).await;

    let all = app.get("/api/tickets").await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let filtered = app.get("/api/tickets?status=active&search=xyz").await;
    let filtered = filtered.body.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["license_plate"], "XYZ-789");

    let bad = app.get("/api/tickets?status=pending").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let stats = app.get("/api/tickets/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["active"], 2);
    assert_eq!(stats.body["used"], 0);
}

#[tokio::test]
async fn test_delete_ticket() {
    let app = create_test_app().await;
    let created = app.post("/api/tickets", issue_body("ABC-123", 5, 1)).await;
    let id = created.body["data"]["id"].as_i64().unwrap();

    let response = app.delete(&format!("/api/tickets/{}", id)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.delete(&format!("/api/tickets/{}", id)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spot_lifecycle() {
    let app = create_test_app().await;

    let created = app
        .post(
            "/api/parking-spots",
            json!({ "spot_type": "Motorbike", "status": "Available", "park_id": 2 }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["data"]["id"].as_i64().unwrap();
    let path = format!("/api/parking-spots/{}", id);

    let reserved = app
        .put(&path, json!({ "status": "Reserved", "license_plate": "abc-123" }))
        .await;
    assert_eq!(reserved.status, StatusCode::OK);
    assert_eq!(reserved.body["data"]["license_plate"], "ABC-123");

    let maintenance = app.put(&path, json!({ "status": "Maintenance" })).await;
    assert_eq!(maintenance.status, StatusCode::CONFLICT);

    let delete = app.delete(&path).await;
    assert_eq!(delete.status, StatusCode::CONFLICT);

    let released = app.put(&path, json!({ "status": "Available" })).await;
    assert_eq!(released.status, StatusCode::OK);
    assert_eq!(released.body["data"]["license_plate"], Value::Null);
    assert_eq!(released.body["data"]["start_time"], Value::Null);

    let summary = app.get("/api/parking-spots/summary").await;
    assert_eq!(summary.body["total"], 8);
    assert_eq!(summary.body["available"], 8);

    let delete = app.delete(&path).await;
    assert_eq!(delete.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_create_spot_requires_fields() {
    let app = create_test_app().await;
    let response = app.post("/api/parking-spots", json!({ "spot_type": "Car" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issue_on_reserved_spot_leaves_it_unchanged() {
    let app = create_test_app().await;
    let spot = app
        .store
        .insert_spot(
            "Car",
            1,
            SpotState::Reserved(Occupant {
                license_plate: "XYZ-789".to_string(),
                start_time: Utc::now(),
                end_time: None,
            }),
        )
        .await;

    let response = app.post("/api/tickets", issue_body("ABC-123", spot.id, 1)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let after = app.get(&format!("/api/parking-spots/{}", spot.id)).await;
    assert_eq!(after.body["status"], "Reserved");
    assert_eq!(after.body["license_plate"], "XYZ-789");
}

#[tokio::test]
async fn test_catalog_lookups() {
    let app = create_test_app().await;

    let vehicle = app.get("/api/vehicles/abc-123").await;
    assert_eq!(vehicle.status, StatusCode::OK);
    assert_eq!(vehicle.body["license_plate"], "ABC-123");

    let services = app.get("/api/services").await;
    assert_eq!(services.body.as_array().unwrap().len(), 2);

    let missing = app.get("/api/services/99").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_extend_rejects_out_of_range_minutes() {
    let app = create_test_app().await;
    let created = app.post("/api/tickets", issue_body("ABC-123", 6, 1)).await;
    let id = created.body["data"]["id"].as_i64().unwrap();
    let path = format!("/api/tickets/{}", id);

    for minutes in [9_000_000_000_000_000_i64, 100_000_000_000_000, 60 * 24 * 31] {
        let response = app.put(&path, json!({ "extend_by_minutes": minutes })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "minutes = {}", minutes);
        assert_eq!(response.body["code"], "VALIDATION_ERROR");
    }

    let after = app.get(&path).await;
    assert_eq!(after.body["expired_time"], created.body["data"]["expired_time"]);

    let spot = app.get("/api/parking-spots/6").await;
    assert_eq!(spot.body["end_time"], created.body["data"]["expired_time"]);
}

#[tokio::test]
async fn test_find_available_spot_by_type() {
    let app = create_test_app().await;
    app.post("/api/tickets", issue_body("ABC-123", 1, 1)).await;

    let found = app.get("/api/parking-spots/available?type=car").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["id"], 2);
    assert_eq!(found.body["status"], "Available");

    let none = app.get("/api/parking-spots/available?spot_type=Truck").await;
    assert_eq!(none.status, StatusCode::NOT_FOUND);

    let missing = app.get("/api/parking-spots/available").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_report_today_activity() {
    let app = create_test_app().await;
    app.post("/api/tickets", issue_body("ABC-123", 1, 1)).await;
    app.post("/api/tickets", issue_body("XYZ-789", 2, 2)).await;

    let now = Utc::now();
    app.store
        .put_ticket(Ticket {
            id: 30,
            license_plate: "ABC-123".to_string(),
            parking_spot_id: None,
            service_id: 2,
            issued_time: now - Duration::days(2),
            expired_time: now - Duration::days(1),
            amount: Decimal::new(50, 0),
            used: false,
            created_at: now - Duration::days(2),
        })
        .await;

    let stats = app.get("/api/tickets/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["today_tickets"], 2);
    let revenue: Decimal = serde_json::from_value(stats.body["today_revenue"].clone()).unwrap();
    assert_eq!(revenue, Decimal::new(60, 0));

    let recent = stats.body["recent"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["license_plate"], "XYZ-789");
    assert_eq!(recent[2]["id"], 30);
}

#[tokio::test]
async fn test_edit_ticket_moves_spot_window() {
    let app = create_test_app().await;
    let created = app.post("/api/tickets", issue_body("ABC-123", 5, 1)).await;
    let id = created.body["data"]["id"].as_i64().unwrap();

    let now = Utc::now();
    let expired_time = (now + Duration::hours(3)).to_rfc3339();
    let response = app
        .put(
            &format!("/api/tickets/{}", id),
            json!({
                "license_plate": "xyz-789",
                "issued_time": now.to_rfc3339(),
                "expired_time": expired_time,
                "service_id": 1
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let spot = app.get("/api/parking-spots/5").await;
    assert_eq!(spot.body["status"], "Occupied");
    assert_eq!(spot.body["license_plate"], "XYZ-789");
    assert_eq!(spot.body["end_time"], response.body["data"]["expired_time"]);
}
