use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use talad_api::app;
use talad_api::middleware::auth::AdminClaims;
use talad_api::state::{AppState, AuthConfig};
use talad_catalog::{Lot, Section, ZoneType};
use talad_core::repository::LotRepository;
use talad_shared::money::baht;
use talad_store::MemoryStore;

fn auth_config() -> AuthConfig {
    AuthConfig {
        secret: "test-secret".to_string(),
        expiration: 3600,
        admin_username: "admin".to_string(),
        admin_password: "1234".to_string(),
    }
}

fn market() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        store.clone(),
        store.clone(),
        auth_config(),
        "THB".to_string(),
    );
    (app(state), store)
}

fn sample_lot(number: &str) -> Lot {
    Lot::new(
        number.to_string(),
        Section::RowA,
        ZoneType::Standard,
        "North entrance row".to_string(),
        "2x2 m".to_string(),
        baht(100),
    )
}

fn booking_body(lot_id: &str) -> Value {
    json!({
        "lot_id": lot_id,
        "vendor_name": "Somchai Fresh Produce",
        "vendor_phone": "081-234-5678",
        "vendor_email": "somchai@example.com",
        "business_type": "produce",
        "start_date": "2025-06-01T00:00:00Z",
    })
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/v1/auth/login",
            json!({"username": "admin", "password": "1234"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_issues_token_and_rejects_bad_credentials() {
    let (app, _store) = market();

    let token = login(&app).await;
    assert!(!token.is_empty());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/v1/auth/login",
            json!({"username": "admin", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");
}

#[tokio::test]
async fn test_admin_routes_require_an_admin_token() {
    let (app, _store) = market();

    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/v1/admin/seed")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        authed_request(Method::POST, "/v1/admin/seed", "not-a-jwt", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correctly signed token, wrong role
    let claims = AdminClaims {
        sub: "walk-in".to_string(),
        role: "VENDOR".to_string(),
        exp: (Utc::now() + Duration::seconds(3600)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("test-secret".as_bytes()),
    )
    .unwrap();
    let (status, _) = send(
        &app,
        authed_request(Method::POST, "/v1/admin/seed", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seed_installs_the_market_plan() {
    let (app, _store) = market();
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        authed_request(Method::POST, "/v1/admin/seed", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lots_created"], 100);

    let (status, body) = send(&app, get_request("/v1/lots?status=AVAILABLE&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 100);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["total_pages"], 20);

    let (status, body) = send(&app, get_request("/v1/lots?section=ROW_B")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 25);

    let (status, body) = send(&app, get_request("/v1/lots?status=BROKEN")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("BROKEN"));
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let (app, store) = market();
    let lot = sample_lot("A01");
    store.insert_lot(&lot).await.unwrap();

    let (status, created) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot.id.to_string())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["payment_status"], "PENDING");
    assert_eq!(created["total_satang"], baht(100));
    let booking_id = created["id"].as_str().unwrap().to_string();

    // The lot is claimed; a second vendor is refused
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot.id.to_string())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not available"));

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/v1/bookings/{}/slip", booking_id),
            json!({"slip_url": "https://cdn.example.com/slips/1.jpg"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "SUBMITTED");

    let token = login(&app).await;
    let (status, outcome) = send(
        &app,
        authed_request(
            Method::POST,
            &format!("/v1/bookings/{}/verify", booking_id),
            &token,
            Some(json!({"approve": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "APPROVED");
    assert_eq!(outcome["booking"]["status"], "CONFIRMED");
    assert_eq!(outcome["booking"]["payment_status"], "VERIFIED");

    let (status, detail) = send(&app, get_request(&format!("/v1/bookings/{}", booking_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "CONFIRMED");
    assert_eq!(detail["lot"]["status"], "RESERVED");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
    assert_eq!(detail["payments"][0]["outcome"], "APPROVED");
    assert_eq!(detail["payments"][0]["amount_satang"], baht(100));
}

#[tokio::test]
async fn test_verify_replay_answers_already_finalized() {
    let (app, store) = market();
    let lot = sample_lot("A02");
    store.insert_lot(&lot).await.unwrap();

    let (_, created) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot.id.to_string())),
    )
    .await;
    let booking_id = created["id"].as_str().unwrap().to_string();

    send(
        &app,
        json_request(
            Method::POST,
            &format!("/v1/bookings/{}/slip", booking_id),
            json!({"slip_url": "https://cdn.example.com/slips/2.jpg"}),
        ),
    )
    .await;

    let token = login(&app).await;
    let verify_uri = format!("/v1/bookings/{}/verify", booking_id);
    let (status, first) = send(
        &app,
        authed_request(Method::POST, &verify_uri, &token, Some(json!({"approve": true}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["outcome"], "APPROVED");

    // A second click on the same button changes nothing
    let (status, replay) = send(
        &app,
        authed_request(Method::POST, &verify_uri, &token, Some(json!({"approve": false}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["outcome"], "ALREADY_FINALIZED");
    assert_eq!(replay["booking"]["payment_status"], "VERIFIED");

    let (_, payments) = send(
        &app,
        authed_request(Method::GET, "/v1/payments", &token, None),
    )
    .await;
    assert_eq!(payments["total"], 1);
}

#[tokio::test]
async fn test_invalid_vendor_is_rejected_without_claiming_the_lot() {
    let (app, store) = market();
    let lot = sample_lot("A03");
    store.insert_lot(&lot).await.unwrap();

    let mut body = booking_body(&lot.id.to_string());
    body["vendor_phone"] = json!("12");
    let (status, response) = send(&app, json_request(Method::POST, "/v1/bookings", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("phone"));

    let (_, lots) = send(&app, get_request("/v1/lots?status=AVAILABLE")).await;
    assert_eq!(lots["total"], 1);
}

#[tokio::test]
async fn test_cancel_is_idempotent_and_releases_the_lot() {
    let (app, store) = market();
    let lot = sample_lot("A04");
    store.insert_lot(&lot).await.unwrap();

    let (_, created) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot.id.to_string())),
    )
    .await;
    let booking_id = created["id"].as_str().unwrap().to_string();
    let cancel_uri = format!("/v1/bookings/{}/cancel", booking_id);

    let (status, body) = send(
        &app,
        json_request(Method::POST, &cancel_uri, json!({"reason": "vendor pulled out"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["payment_status"], "FAILED");
    assert_eq!(body["cancel_reason"], "vendor pulled out");

    // Replay without a body; same answer, original reason kept
    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri(cancel_uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["cancel_reason"], "vendor pulled out");

    let (status, lot_detail) = send(&app, get_request(&format!("/v1/lots/{}", lot.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lot_detail["status"], "AVAILABLE");
    assert_eq!(lot_detail["active_booking"], Value::Null);
}

#[tokio::test]
async fn test_delete_booking_requires_admin_and_keeps_payment_records() {
    let (app, store) = market();
    let lot = sample_lot("A05");
    store.insert_lot(&lot).await.unwrap();

    let (_, created) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot.id.to_string())),
    )
    .await;
    let booking_id = created["id"].as_str().unwrap().to_string();

    send(
        &app,
        json_request(
            Method::POST,
            &format!("/v1/bookings/{}/slip", booking_id),
            json!({"slip_url": "https://cdn.example.com/slips/3.jpg"}),
        ),
    )
    .await;
    let token = login(&app).await;
    send(
        &app,
        authed_request(
            Method::POST,
            &format!("/v1/bookings/{}/verify", booking_id),
            &token,
            Some(json!({"approve": true})),
        ),
    )
    .await;

    let delete_uri = format!("/v1/bookings/{}", booking_id);
    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(&delete_uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, authed_request(Method::DELETE, &delete_uri, &token, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get_request(&format!("/v1/bookings/{}", booking_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The verification trail survives the hard delete
    let (_, payments) = send(
        &app,
        authed_request(Method::GET, "/v1/payments", &token, None),
    )
    .await;
    assert_eq!(payments["total"], 1);

    let (_, lot_detail) = send(&app, get_request(&format!("/v1/lots/{}", lot.id))).await;
    assert_eq!(lot_detail["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_dashboard_and_vendor_search() {
    let (app, store) = market();
    let lot_a = sample_lot("A06");
    let lot_b = sample_lot("A07");
    store.insert_lot(&lot_a).await.unwrap();
    store.insert_lot(&lot_b).await.unwrap();

    let (_, first) = send(
        &app,
        json_request(Method::POST, "/v1/bookings", booking_body(&lot_a.id.to_string())),
    )
    .await;
    let first_id = first["id"].as_str().unwrap().to_string();

    let mut second_body = booking_body(&lot_b.id.to_string());
    second_body["vendor_name"] = json!("Malee Crafts");
    second_body["vendor_phone"] = json!("089-111-2233");
    second_body["vendor_email"] = json!("malee@example.com");
    send(&app, json_request(Method::POST, "/v1/bookings", second_body)).await;

    send(
        &app,
        json_request(
            Method::POST,
            &format!("/v1/bookings/{}/slip", first_id),
            json!({"slip_url": "https://cdn.example.com/slips/4.jpg"}),
        ),
    )
    .await;
    let token = login(&app).await;
    send(
        &app,
        authed_request(
            Method::POST,
            &format!("/v1/bookings/{}/verify", first_id),
            &token,
            Some(json!({"approve": true})),
        ),
    )
    .await;

    let (status, stats) = send(
        &app,
        authed_request(Method::GET, "/v1/admin/dashboard", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["currency"], "THB");
    assert_eq!(stats["lots"]["total"], 2);
    assert_eq!(stats["lots"]["reserved"], 2);
    assert_eq!(stats["bookings"]["total"], 2);
    assert_eq!(stats["bookings"]["pending"], 1);
    assert_eq!(stats["bookings"]["confirmed"], 1);
    assert_eq!(stats["payments"]["verified"], 1);
    assert_eq!(stats["revenue_satang"], baht(100));
    assert_eq!(stats["recent_bookings"].as_array().unwrap().len(), 2);

    let (status, hits) = send(
        &app,
        authed_request(Method::GET, "/v1/admin/search?q=malee", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["vendor"]["name"], "Malee Crafts");

    let (status, _) = send(
        &app,
        authed_request(Method::GET, "/v1/admin/search?q=", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lot_admin_crud_over_http() {
    let (app, _store) = market();
    let token = login(&app).await;

    let (status, created) = send(
        &app,
        authed_request(
            Method::POST,
            "/v1/lots",
            &token,
            Some(json!({"lot_number": "C09", "section": "ROW_C"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "AVAILABLE");
    assert_eq!(created["zone_type"], "STANDARD");
    let lot_id = created["id"].as_str().unwrap().to_string();

    // Same number again is refused
    let (status, body) = send(
        &app,
        authed_request(
            Method::POST,
            "/v1/lots",
            &token,
            Some(json!({"lot_number": "C09", "section": "ROW_C"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("C09"));

    let (status, patched) = send(
        &app,
        authed_request(
            Method::PATCH,
            &format!("/v1/lots/{}", lot_id),
            &token,
            Some(json!({"price_satang": baht(250), "status": "MAINTENANCE"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["price_satang"], baht(250));
    assert_eq!(patched["status"], "MAINTENANCE");

    let (status, _) = send(
        &app,
        authed_request(Method::DELETE, &format!("/v1/lots/{}", lot_id), &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get_request(&format!("/v1/lots/{}", lot_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_booking_is_404() {
    let (app, _store) = market();
    let (status, body) = send(
        &app,
        get_request(&format!("/v1/bookings/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}
