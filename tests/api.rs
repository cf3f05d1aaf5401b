mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use storefront::{
    app::build_app,
    cart::CheckoutPolicy,
    config::AppConfig,
    gateway::memory::MemoryGateway,
    middleware::auth::issue_token,
    state::AppState,
    storage::LocalStorage,
};
use tempfile::TempDir;
use tower::ServiceExt;

use common::{category, product, profile};

const SECRET: &str = "test-secret";
const PUBLIC_URL: &str = "http://shop.test/storage";

struct TestApp {
    router: Router,
    gateway: Arc<MemoryGateway>,
    storage_dir: TempDir,
}

impl TestApp {
    fn new() -> anyhow::Result<Self> {
        let storage_dir = TempDir::new()?;
        let gateway = Arc::new(MemoryGateway::new());
        let config = AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: SECRET.into(),
            storage_root: storage_dir.path().to_path_buf(),
            storage_public_url: PUBLIC_URL.into(),
            session_path: storage_dir.path().join("session.json"),
            checkout_policy: CheckoutPolicy::KeepOrphan,
        };
        let storage = Arc::new(LocalStorage::new(storage_dir.path(), PUBLIC_URL));
        let state = AppState::new(gateway.clone(), storage, config);
        Ok(Self {
            router: build_app(state),
            gateway,
            storage_dir,
        })
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            let token = issue_token(SECRET, user, Duration::from_secs(600))?;
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => request.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["service"], "storefront");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.send(Method::GET, "/nope", None, None).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
    Ok(())
}

#[tokio::test]
async fn cart_requires_a_valid_token() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let (status, _) = app.send(Method::GET, "/api/cart", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/cart")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = issue_token("other-secret", "user-1", Duration::from_secs(600))?;
    let request = Request::builder()
        .uri("/api/cart")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn add_view_and_checkout() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    let shoe = product(&app.gateway, brand, "Runner", "10.00", &["41", "42"]);
    let user = Some("user-1");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            user,
            Some(json!({ "product_id": shoe.id, "quantity": 2, "size": "42" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "inserted");
    assert_eq!(body["data"]["quantity"], 2);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items/plus",
            user,
            Some(json!({ "product_id": shoe.id, "size": "42" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "updated");
    assert_eq!(body["data"]["quantity"], 3);

    let (status, body) = app.send(Method::GET, "/api/cart", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["total"], 3000);

    let (_, body) = app.send(Method::GET, "/api/cart/total", user, None).await?;
    assert_eq!(body["data"]["total"], 3000);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders/checkout",
            user,
            Some(json!({ "shipping_address": "Calle Falsa 123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["total_amount"], 3000);
    assert_eq!(body["data"]["order"]["status"], "Pendiente");
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    let order_id = body["data"]["order"]["id"].clone();

    let (_, body) = app.send(Method::GET, "/api/cart", user, None).await?;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));

    let (status, body) = app.send(Method::GET, "/api/orders", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["id"], order_id);

    // Orders are private to their owner.
    let uri = format!("/api/orders/{order_id}");
    let (status, _) = app.send(Method::GET, &uri, Some("user-2"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::GET, &uri, user, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn bad_cart_requests_are_rejected() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    let shoe = product(&app.gateway, brand, "Runner", "10.00", &["42"]);
    let user = Some("user-1");

    for payload in [
        json!({ "product_id": shoe.id, "quantity": 0, "size": "42" }),
        json!({ "product_id": shoe.id, "quantity": 1, "size": "  " }),
        json!({ "product_id": shoe.id, "quantity": 1, "size": "38" }),
        json!({ "product_id": 9999, "quantity": 1, "size": "42" }),
    ] {
        let (status, _) = app
            .send(Method::POST, "/api/cart/items", user, Some(payload.clone()))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
    }
    assert!(app.gateway.cart_items().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/orders/checkout",
            user,
            Some(json!({ "shipping_address": "Calle Falsa 123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.gateway.orders().is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_routes_need_an_admin_profile() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    profile(&app.gateway, "shopper", false);
    let brand = category(&app.gateway, "Shoes").id;
    let payload = json!({
        "title": "Trail",
        "pic_url": ["https://img.test/trail.png"],
        "brand": brand,
        "price": 49.9,
        "size": ["42"]
    });

    let (status, _) = app
        .send(Method::POST, "/api/admin/products", Some("shopper"), Some(payload.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, "/api/admin/products", Some("stranger"), Some(payload))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_creates_products_with_images() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    profile(&app.gateway, "admin", true);
    let brand = category(&app.gateway, "Shoes").id;
    let admin = Some("admin");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/products",
            admin,
            Some(json!({ "title": "Trail", "pic_url": ["  "], "brand": brand, "price": 49.9 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/products",
            admin,
            Some(json!({ "title": "Trail", "pic_url": ["https://img.test/t.png"], "brand": 424242, "price": 49.9 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/products",
            admin,
            Some(json!({
                "title": "Trail",
                "pic_url": ["https://img.test/t.png"],
                "brand": brand,
                "price": 49.9,
                "size": ["41", "42"]
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].clone();

    let (status, body) = app
        .send(Method::GET, &format!("/api/products/{id}"), None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Trail");
    Ok(())
}

#[tokio::test]
async fn admin_uploads_are_served_from_storage() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    profile(&app.gateway, "admin", true);
    let token = issue_token(SECRET, "admin", Duration::from_secs(600))?;

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/admin/uploads/trail.png")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(&b"png-bytes"[..]))?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["data"]["url"], format!("{PUBLIC_URL}/Products/trail.png"));

    let stored = std::fs::read(app.storage_dir.path().join("Products").join("trail.png"))?;
    assert_eq!(stored, b"png-bytes");

    let request = Request::builder()
        .uri("/storage/Products/trail.png")
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let served = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&served[..], b"png-bytes");

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/admin/uploads/empty.png")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_through_known_statuses() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    profile(&app.gateway, "admin", true);
    let brand = category(&app.gateway, "Shoes").id;
    let shoe = product(&app.gateway, brand, "Runner", "10.00", &["42"]);

    app.send(
        Method::POST,
        "/api/cart/items",
        Some("user-1"),
        Some(json!({ "product_id": shoe.id, "quantity": 1, "size": "42" })),
    )
    .await?;
    let (_, body) = app
        .send(
            Method::POST,
            "/api/orders/checkout",
            Some("user-1"),
            Some(json!({ "shipping_address": "Calle Falsa 123" })),
        )
        .await?;
    let uri = format!("/api/admin/orders/{}/status", body["data"]["order"]["id"]);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some("admin"), Some(json!({ "status": "en_camino" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "en_camino");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some("admin"), Some(json!({ "status": "lost" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::PATCH, &uri, Some("user-1"), Some(json!({ "status": "entregado" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/admin/orders/999999/status",
            Some("admin"),
            Some(json!({ "status": "entregado" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn search_records_history() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    product(&app.gateway, brand, "Runner", "10.00", &["42"]);
    product(&app.gateway, brand, "Court", "20.00", &["42"]);
    let user = Some("user-1");

    let (status, body) = app
        .send(Method::GET, "/api/products/search?q=run", user, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["title"], "Runner");

    let (status, _) = app
        .send(Method::GET, "/api/products/search?q=%20", user, None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::GET, "/api/search-history", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["query"], "run");
    Ok(())
}

#[tokio::test]
async fn product_listing_is_paginated() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    for title in ["A", "B", "C"] {
        product(&app.gateway, brand, title, "10.00", &[]);
    }

    let (status, body) = app
        .send(Method::GET, "/api/products?page=2&per_page=2", None, None)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["page"], 2);
    Ok(())
}

#[tokio::test]
async fn clearing_the_cart_keeps_it_for_the_next_add() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    let shoe = product(&app.gateway, brand, "Runner", "10.00", &["41", "42"]);
    let user = Some("user-1");

    let (_, added) = app
        .send(
            Method::POST,
            "/api/cart/items",
            user,
            Some(json!({ "product_id": shoe.id, "quantity": 2, "size": "42" })),
        )
        .await?;
    app.send(
        Method::POST,
        "/api/cart/items",
        user,
        Some(json!({ "product_id": shoe.id, "quantity": 1, "size": "41" })),
    )
    .await?;
    let cart_id = added["data"]["cart_id"].clone();

    let (_, body) = app.send(Method::GET, "/api/cart", user, None).await?;
    assert_eq!(body["data"]["cart_id"], cart_id);

    let (status, body) = app.send(Method::DELETE, "/api/cart", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);

    let (status, body) = app.send(Method::GET, "/api/cart", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cart_id"], cart_id);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["data"]["total"], 0);

    // Nothing left to remove, and no cart at all for a new user.
    let (_, body) = app.send(Method::DELETE, "/api/cart", user, None).await?;
    assert_eq!(body["data"]["removed"], 0);
    let (status, body) = app.send(Method::DELETE, "/api/cart", Some("user-2"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 0);
    assert_eq!(app.gateway.carts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn oversized_quantities_are_rejected() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Watches").id;
    let watch = product(&app.gateway, brand, "Chrono", "9999999999.99", &["U"]);
    let user = Some("user-1");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            user,
            Some(json!({ "product_id": watch.id, "quantity": i32::MAX, "size": "U" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.gateway.cart_items().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            user,
            Some(json!({ "product_id": watch.id, "quantity": 999, "size": "U" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    // A merge past the line limit is refused as well.
    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items/plus",
            user,
            Some(json!({ "product_id": watch.id, "size": "U" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::GET, "/api/cart", user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 999_999_999_999_i64 * 999);
    Ok(())
}

#[tokio::test]
async fn pages_far_past_the_end_are_empty() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let brand = category(&app.gateway, "Shoes").id;
    product(&app.gateway, brand, "Runner", "10.00", &["42"]);

    let uri = format!("/api/products?page={}&per_page=100", i64::MAX);
    let (status, body) = app.send(Method::GET, &uri, None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["meta"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn deleting_catalog_rows_keeps_order_history() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    profile(&app.gateway, "admin", true);
    let brand = category(&app.gateway, "Shoes").id;
    let shoe = product(&app.gateway, brand, "Runner", "10.00", &["42"]);
    let admin = Some("admin");
    let user = Some("user-1");

    app.send(
        Method::POST,
        "/api/cart/items",
        user,
        Some(json!({ "product_id": shoe.id, "quantity": 2, "size": "42" })),
    )
    .await?;
    let (_, body) = app
        .send(
            Method::POST,
            "/api/orders/checkout",
            user,
            Some(json!({ "shipping_address": "Calle Falsa 123" })),
        )
        .await?;
    let order_uri = format!("/api/orders/{}", body["data"]["order"]["id"]);
    // Someone else still has the product in their cart.
    app.send(
        Method::POST,
        "/api/cart/items",
        Some("user-2"),
        Some(json!({ "product_id": shoe.id, "quantity": 1, "size": "42" })),
    )
    .await?;

    let category_uri = format!("/api/admin/categories/{brand}");
    let (status, _) = app.send(Method::DELETE, &category_uri, admin, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let product_uri = format!("/api/admin/products/{}", shoe.id);
    let (status, _) = app.send(Method::DELETE, &product_uri, admin, None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, &order_uri, user, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["total_amount"], 2000);
    assert_eq!(body["data"]["items"][0]["quantity"], 2);
    assert_eq!(body["data"]["items"][0]["unit_price"], 1000);
    assert!(body["data"]["items"][0]["product_id"].is_null());
    assert!(app.gateway.cart_items().is_empty());

    let (status, _) = app.send(Method::DELETE, &category_uri, admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
