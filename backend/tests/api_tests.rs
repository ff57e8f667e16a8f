//! Router-level tests against the in-memory store

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::*;
use injera_backend::{create_app, AppState};
use serde_json::{json, Value};
use shared::{User, UserRole};
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let state = test_state();
        let router = create_app(state.clone());
        Self { state, router }
    }

    fn token_for(&self, user: &User) -> String {
        self.state.auth_service().generate_token(user).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, header::HeaderMap, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, value)
    }
}

fn content_range(headers: &header::HeaderMap) -> &str {
    headers
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, _, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    create_user(&app.state, "admin@injera.test", UserRole::Admin).await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "admin@injera.test", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, _, me) = app.send(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@injera.test");
    assert_eq!(me["role"], "admin");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "admin@injera.test", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = TestApp::new();
    let (status, _, body) = app.send(Method::GET, "/api/v1/stocks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _, _) = app
        .send(Method::GET, "/api/v1/stocks", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stock_listing_with_content_range() {
    let app = TestApp::new();
    let admin = create_user(&app.state, "admin@injera.test", UserRole::Admin).await;
    let token = app.token_for(&admin);

    let (status, _, created) = app
        .send(
            Method::POST,
            "/api/v1/stocks",
            Some(&token),
            Some(json!({
                "name": "Injera",
                "quantity": 30,
                "unit": "piece",
                "price": "2.50",
                "category": "Injera",
                "minimum_threshold": 50
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_low_stock"], true);

    app.send(
        Method::POST,
        "/api/v1/stocks",
        Some(&token),
        Some(json!({
            "name": "Teff flour 25kg",
            "quantity": 80,
            "price": "40.00",
            "category": "Teff Flour"
        })),
    )
    .await;

    let (status, headers, body) = app
        .send(Method::GET, "/api/v1/stocks?isLowStock=true", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range(&headers), "stocks 0-0/1");
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Injera");

    let (_, headers, body) = app
        .send(
            Method::GET,
            "/api/v1/stocks?range=%5B0%2C0%5D&sort=%5B%22quantity%22%2C%22DESC%22%5D",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(content_range(&headers), "stocks 0-0/2");
    assert_eq!(body[0]["quantity"], 80);
}

#[tokio::test]
async fn test_insufficient_stock_is_distinct_from_not_found() {
    let app = TestApp::new();
    let admin = create_user(&app.state, "admin@injera.test", UserRole::Admin).await;
    let token = app.token_for(&admin);
    let stock = create_stock(&app.state, "Injera", 10, Some(0)).await;

    let (status, _, body) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/stocks/{}/quantity", stock.id),
            Some(&token),
            Some(json!({ "adjustment": -15 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let (status, _, body) = app
        .send(
            Method::PATCH,
            "/api/v1/stocks/9999/quantity",
            Some(&token),
            Some(json!({ "adjustment": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _, body) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/stocks/{}/quantity", stock.id),
            Some(&token),
            Some(json!({ "adjustment": -4, "reason": "Breakage" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"]["quantity"], 6);
    assert_eq!(body["transaction"]["type"], "adjustment");
    assert_eq!(body["transaction"]["quantity_before"], 10);
}

#[tokio::test]
async fn test_public_order_and_listing() {
    let app = TestApp::new();
    let staff = create_user(&app.state, "staff@injera.test", UserRole::Staff).await;
    let token = app.token_for(&staff);

    let (_, headers, _) = app.send(Method::GET, "/api/v1/orders", Some(&token), None).await;
    assert_eq!(content_range(&headers), "orders */0");

    let (status, _, order) = app
        .send(
            Method::POST,
            "/api/v1/orders",
            None,
            Some(json!({
                "customer_name": "Hirut",
                "customer_email": "hirut@example.com",
                "business_type": "restaurant",
                "product": "Unknown Item",
                "quantity": 5
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert!(order["total_price"].is_null());

    let (status, headers, body) = app.send(Method::GET, "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range(&headers), "orders 0-0/1");
    assert_eq!(body[0]["customer_name"], "Hirut");

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/orders/{}", order["id"]),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_settings_writes_are_admin_only() {
    let app = TestApp::new();
    let staff = create_user(&app.state, "staff@injera.test", UserRole::Staff).await;
    let admin = create_user(&app.state, "admin@injera.test", UserRole::Admin).await;

    let (status, _, body) = app
        .send(
            Method::PUT,
            "/api/v1/stock-settings/Injera",
            Some(&app.token_for(&staff)),
            Some(json!({ "minimum_threshold": 200 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");

    let (status, _, _) = app
        .send(
            Method::PUT,
            "/api/v1/stock-settings/Injera",
            Some(&app.token_for(&admin)),
            Some(json!({ "minimum_threshold": 200 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app
        .send(
            Method::GET,
            "/api/v1/stock-settings/Teff%20Flour",
            Some(&app.token_for(&staff)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minimum_threshold"], 50);
    assert_eq!(body["source"], "default");

    let (status, _, _) = app
        .send(Method::GET, "/api/v1/users", Some(&app.token_for(&staff)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_activity_log_filters() {
    let app = TestApp::new();
    let admin = create_user(&app.state, "admin@injera.test", UserRole::Admin).await;
    let token = app.token_for(&admin);
    let stock = create_stock(&app.state, "Injera", 10, Some(0)).await;

    let (status, headers, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/activity-logs/stock/{}", stock.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range(&headers), "activity-logs 0-0/1");
    assert_eq!(body[0]["action_type"], "stock_created");

    let (_, _, body) = app
        .send(
            Method::GET,
            "/api/v1/activity-logs?entity_type=user",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["action_type"], "user_created");
}

#[tokio::test]
async fn test_huge_range_is_clamped() {
    let app = TestApp::new();
    let admin = create_user(&app.state, "admin@injera.test", UserRole::Admin).await;
    let token = app.token_for(&admin);
    create_stock(&app.state, "Injera", 10, Some(0)).await;

    let (status, headers, body) = app
        .send(
            Method::GET,
            "/api/v1/stocks?range=%5B0%2C9223372036854775807%5D",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range(&headers), "stocks 0-0/1");
    assert_eq!(body.as_array().unwrap().len(), 1);
}
