//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");
            api::describe_metrics();
            handle
        })
        .clone()
}

fn setup() -> axum::Router {
    setup_with_store().0
}

fn setup_with_store() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let app = api::create_app(api::create_state(store.clone()), get_metrics_handle());
    (app, store)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Registers cookiemon and loads chocolate chip (12) and dark chocolate
/// chip (1). Returns `(user_id, [cookie ids])`.
async fn seed(app: &axum::Router) -> (i64, Vec<i64>) {
    let (status, user) = send(
        app,
        "POST",
        "/users",
        Some(json!({
            "username": "cookiemon",
            "email": "mon@cookie.com",
            "phone": "111-111-1111",
            "password": "password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, cookies) = send(
        app,
        "POST",
        "/cookies",
        Some(json!([
            {
                "name": "chocolate chip",
                "recipe_url": "http://some.aweso.me/cookie/recipe.html",
                "sku": "CC01",
                "quantity": 12,
                "unit_cost": 50
            },
            {
                "name": "dark chocolate chip",
                "recipe_url": "http://some.aweso.me/cookie/recipe_dark.html",
                "sku": "CC02",
                "quantity": 1,
                "unit_cost": 75
            }
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let ids = cookies
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    (user["id"].as_i64().unwrap(), ids)
}

async fn place(app: &axum::Router, user_id: i64, lines: Value) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/orders",
        Some(json!({ "user_id": user_id, "lines": lines })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["order"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_register_hides_password() {
    let app = setup();
    let (user_id, _) = seed(&app).await;
    assert_eq!(user_id, 1);

    let (status, json) = send(
        &app,
        "PUT",
        "/users/1/contact",
        Some(json!({ "email": "cookie@mon.com", "phone": "555-555-5555" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "cookiemon");
    assert_eq!(json["email"], "cookie@mon.com");
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = setup();
    seed(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        "/users",
        Some(json!({
            "username": "cookiemon",
            "email": "other@cookie.com",
            "phone": "222-222-2222",
            "password": "pw"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("users_username_key"));
}

#[tokio::test]
async fn test_list_cookies_lowest_stock_first() {
    let app = setup();
    seed(&app).await;

    let (status, json) = send(&app, "GET", "/cookies", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["dark chocolate chip", "chocolate chip"]);
}

#[tokio::test]
async fn test_place_and_get_order() {
    let app = setup();
    let (user_id, cookies) = seed(&app).await;

    let (status, created) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id,
            "lines": [
                { "cookie_id": cookies[0], "quantity": 2 },
                { "cookie_id": cookies[1], "quantity": 1 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["total_cost"], 175);
    assert_eq!(created["order"]["shipped"], false);

    let order_id = created["order"]["id"].as_i64().unwrap();
    let (status, details) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["username"], "cookiemon");
    assert_eq!(details["lines"].as_array().unwrap().len(), 2);
    assert_eq!(details["lines"][0]["cookie_name"], "chocolate chip");
    assert_eq!(details["lines"][0]["extended_cost"], 100);

    let (status, orders) = send(&app, "GET", &format!("/users/{user_id}/orders"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_orders_filtered_with_details() {
    let app = setup();
    let (user_id, cookies) = seed(&app).await;
    let shipped = place(&app, user_id, json!([{ "cookie_id": cookies[0], "quantity": 3 }])).await;
    let pending = place(
        &app,
        user_id,
        json!([
            { "cookie_id": cookies[0], "quantity": 2 },
            { "cookie_id": cookies[1], "quantity": 1 }
        ]),
    )
    .await;
    send(&app, "POST", &format!("/orders/{shipped}/ship"), None).await;

    let uri = format!("/users/{user_id}/orders?shipped=false");
    let (status, orders) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], pending);
    assert!(orders[0].get("lines").is_none());

    let uri = format!("/users/{user_id}/orders?shipped=false&details=true");
    let (status, details) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details.as_array().unwrap().len(), 1);
    assert_eq!(details[0]["order_id"], pending);
    assert_eq!(details[0]["username"], "cookiemon");
    assert_eq!(details[0]["lines"][1]["cookie_name"], "dark chocolate chip");
    assert_eq!(details[0]["total_cost"], 175);

    let uri = format!("/users/{user_id}/orders?shipped=true&details=true");
    let (_, details) = send(&app, "GET", &uri, None).await;
    assert_eq!(details.as_array().unwrap().len(), 1);
    assert_eq!(details[0]["order_id"], shipped);
    assert_eq!(details[0]["shipped"], true);

    let (_, all) = send(&app, "GET", &format!("/users/{user_id}/orders"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_orders_bad_filter_rejected() {
    let app = setup();
    let (user_id, _) = seed(&app).await;

    let uri = format!("/users/{user_id}/orders?shipped=maybe");
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, "GET", "/users/42/orders?details=true", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "user 42 not found");
}

#[tokio::test]
async fn test_inventory_value() {
    let app = setup();
    seed(&app).await;

    let (status, json) = send(&app, "GET", "/cookies/value", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cookies"][0]["name"], "dark chocolate chip");
    assert_eq!(json["cookies"][0]["value"], 75);
    assert_eq!(json["cookies"][1]["value"], 600);
    assert_eq!(json["total"], 675);
}

#[tokio::test]
async fn test_ship_order() {
    let (app, store) = setup_with_store();
    let (user_id, cookies) = seed(&app).await;
    let order_id = place(&app, user_id, json!([{ "cookie_id": cookies[0], "quantity": 9 }])).await;

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "shipped");
    assert_eq!(json["shipped"], true);
    assert_eq!(json["deductions"][0]["remaining"], 3);

    assert_eq!(
        store
            .cookie_quantity(schema::CookieId::new(cookies[0]))
            .await,
        Some(3)
    );
}

#[tokio::test]
async fn test_reship_reports_already_shipped() {
    let app = setup();
    let (user_id, cookies) = seed(&app).await;
    let order_id = place(&app, user_id, json!([{ "cookie_id": cookies[0], "quantity": 2 }])).await;

    send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;
    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "already_shipped");
    assert!(json["deductions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_ship_with_insufficient_stock_conflicts() {
    let (app, store) = setup_with_store();
    let (user_id, cookies) = seed(&app).await;
    let order_id = place(
        &app,
        user_id,
        json!([
            { "cookie_id": cookies[0], "quantity": 2 },
            { "cookie_id": cookies[1], "quantity": 4 }
        ]),
    )
    .await;

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("quantity_positive"));

    assert_eq!(
        store
            .cookie_quantity(schema::CookieId::new(cookies[0]))
            .await,
        Some(12)
    );
    let order = store.order(schema::OrderId::new(order_id)).await.unwrap();
    assert!(!order.shipped);
}

#[tokio::test]
async fn test_ship_unknown_order_not_found() {
    let app = setup();
    let (status, json) = send(&app, "POST", "/orders/999/ship", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "order 999 not found");
}

#[tokio::test]
async fn test_invalid_id_bad_request() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/orders/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid order id"));
}

#[tokio::test]
async fn test_restock() {
    let app = setup();
    let (_, cookies) = seed(&app).await;

    let uri = format!("/cookies/{}/restock", cookies[1]);
    let (status, json) = send(&app, "POST", &uri, Some(json!({ "quantity": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 6);

    let (status, _) = send(&app, "POST", &uri, Some(json!({ "quantity": -1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_unavailable() {
    let (app, store) = setup_with_store();
    store.set_unavailable(true);

    let (status, _) = send(&app, "GET", "/cookies", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let (user_id, cookies) = seed(&app).await;
    let order_id = place(&app, user_id, json!([{ "cookie_id": cookies[0], "quantity": 1 }])).await;
    send(&app, "POST", &format!("/orders/{order_id}/ship"), None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_shipped_total"));
}
