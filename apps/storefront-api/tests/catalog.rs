//! Accounts, settings, products and categories over HTTP.

mod common;

use std::path::PathBuf;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": true }));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/users/register",
            None,
            json!({ "email": "ada@example.com", "password": PASSWORD, "first_name": "Ada" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ada@example.com");
    let user_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/api/users/register", None, json!({ "email": "ada@example.com", "password": "x" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post("/api/users/register", None, json!({ "email": "not-an-email", "password": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app
        .post("/api/users/login", None, json!({ "email": "ada@example.com", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/api/users/login", None, json!({ "email": "ada@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/users/login", None, json!({ "email": "ada@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert_eq!(body["role"], "customer");

    // The welcome notification arrives after the response.
    let page = app.wait_for_notifications(&user_id, 1).await;
    assert_eq!(page["notifications"][0]["type"], "welcome");
    assert_eq!(page["notifications"][0]["title"], "Welcome Ada!");
}

#[tokio::test]
async fn test_auth_guards() {
    let app = TestApp::new().await;
    let (_, customer) = app.customer().await;

    let (status, _) = app.get("/api/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/users/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/settings", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Optional auth treats a bad token as an anonymous visitor.
    let (status, _) = app.get("/api/products", Some("garbage")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;

    let (status, body) = app
        .put(
            "/api/settings",
            Some(&admin),
            json!({ "sales_active": true, "out_of_stock_behavior": "show_as_out_of_stock" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings updated");

    let (_, body) = app.get("/api/settings", Some(&admin)).await;
    assert_eq!(body["sales_active"], "true");
    assert_eq!(body["out_of_stock_behavior"], "show_as_out_of_stock");

    let settings = app.db().settings().store_settings().await;
    assert!(settings.sales_active);
}

#[tokio::test]
async fn test_product_visibility() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;

    let in_stock = app.product("Mug", 1200, 5).await;
    let sold_out = app.product("Teapot", 4500, 0).await;
    let hidden = app.product("Kettle", 3000, 10).await;
    let (status, _) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{}", hidden.id),
            &admin,
            &[("name", "Kettle"), ("price", "30.00"), ("is_active", "false")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/products", None).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mug"]);

    let (_, body) = app.get("/api/products", Some(&admin)).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    // Store-wide switch reveals the sold-out product but never the inactive one.
    app.db()
        .settings()
        .set("out_of_stock_behavior", "show_as_out_of_stock")
        .await
        .unwrap();
    let (_, body) = app.get("/api/products", None).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![in_stock.id, sold_out.id]);

    let (status, _) = app.get(&format!("/api/products/{}", hidden.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.get(&format!("/api/products/{}", hidden.id), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    // Editing the price alone keeps the product hidden.
    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{}", hidden.id),
            &admin,
            &[("name", "Kettle"), ("price", "28.00")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price_cents"], 2800);
    assert_eq!(body["is_active"], false);
}

#[tokio::test]
async fn test_create_product_with_image() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let (_, customer) = app.customer().await;

    let fields = [
        ("name", "Ceramic Mug"),
        ("price", "12.50"),
        ("description", "Handmade"),
        ("stock_quantity", "8"),
        ("critical_stock_threshold", "2"),
    ];

    let (status, _) = app
        .multipart(Method::POST, "/api/products", &customer, &fields, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/products",
            &admin,
            &fields,
            Some(("mug.png", "image/png", b"\x89PNG fake")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price_cents"], 1250);
    assert_eq!(body["stock_quantity"], 8);
    assert_eq!(body["is_active"], true);
    let image_url = body["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("/uploads/productImage-"));
    assert_eq!(app.uploaded_files().len(), 1);

    // Same name again: rejected and the new upload is cleaned up.
    let (status, _) = app
        .multipart(
            Method::POST,
            "/api/products",
            &admin,
            &fields,
            Some(("mug2.png", "image/png", b"\x89PNG other")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.uploaded_files().len(), 1);

    // Replacing the image removes the previous file.
    let id = body["id"].as_i64().unwrap();
    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{id}"),
            &admin,
            &[("name", "Ceramic Mug"), ("price", "13.00")],
            Some(("new.jpg", "image/jpeg", b"jpeg bytes")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["image_url"], image_url.as_str());
    assert_eq!(body["stock_quantity"], 8);
    let files = app.uploaded_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].to_string_lossy().ends_with(".jpg"));

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{id}"),
            &admin,
            &[("name", "Ceramic Mug"), ("price", "13.00"), ("removeCurrentImage", "true")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["image_url"].is_null());
    assert!(app.uploaded_files().is_empty());

    let (status, _) = app.delete(&format!("/api/products/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&format!("/api/products/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_product_rejections_remove_upload() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let png = Some(("mug.png", "image/png", b"\x89PNG".as_slice()));

    for fields in [
        vec![("price", "10")],
        vec![("name", "Mug")],
        vec![("name", "Mug"), ("price", "0")],
        vec![("name", "Mug"), ("price", "10"), ("stock_quantity", "-3")],
        vec![("name", "Mug"), ("price", "90000000000000000")],
    ] {
        let (status, _) = app
            .multipart(Method::POST, "/api/products", &admin, &fields, png)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "fields: {fields:?}");
        assert!(app.uploaded_files().is_empty());
    }

    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/products",
            &admin,
            &[("name", "Mug"), ("price", "10")],
            Some(("notes.txt", "text/plain", b"hello")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only image files are allowed");
}

#[tokio::test]
async fn test_categories() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let mug = app.product("Mug", 1200, 5).await;
    let bowl = app.product("Bowl", 900, 5).await;

    let (status, body) = app
        .post("/api/categories", Some(&admin), json!({ "name": "  Kitchen " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Kitchen");
    let kitchen = body["id"].as_i64().unwrap();

    let (status, _) = app.post("/api/categories", Some(&admin), json!({ "name": "Kitchen" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.post("/api/categories", Some(&admin), json!({ "name": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let link = format!("/api/categories/product/{}/category/{kitchen}", mug.id);
    let (status, _) = app.call(Method::POST, &link, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.call(Method::POST, &link, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post(
            "/api/categories/bulk-assign",
            Some(&admin),
            json!({ "productIds": [mug.id, bowl.id], "categoryId": kitchen }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addedCount"], 1);

    let (status, _) = app
        .post(
            "/api/categories/bulk-assign",
            Some(&admin),
            json!({ "productIds": [], "categoryId": kitchen }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post(
            "/api/categories/bulk-assign",
            Some(&admin),
            json!({ "productIds": [mug.id], "categoryId": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get(&format!("/api/categories/{kitchen}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bowl", "Mug"]);

    let (_, body) = app.get(&format!("/api/categories/product/{}", mug.id), None).await;
    assert_eq!(body[0]["name"], "Kitchen");

    let (status, _) = app.delete(&link, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&link, Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.delete(&format!("/api/categories/{kitchen}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"]["name"], "Kitchen");
    let (status, _) = app.get(&format!("/api/categories/{kitchen}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_fallback() {
    let app = TestApp::new().await;
    std::fs::write(app.dir.join("index.html"), "<h1>shop</h1>").unwrap();

    let (status, body) = app.get("/index.html", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("<h1>shop</h1>"));
}

#[tokio::test]
async fn test_shipped_client_is_served() {
    let public = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../public"));
    let app = TestApp::with_static_dir(public).await;

    let (status, body) = app.get("/index.html", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = body.as_str().unwrap();
    assert!(page.contains(r#"id="notification-bell""#));
    assert!(page.contains("/js/common.js"));

    let (status, body) = app.get("/login.html", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("/users/register"));

    // The client reads `{ code, error }` failure bodies and calls `/api` routes.
    let (status, body) = app.get("/js/api.js", None).await;
    assert_eq!(status, StatusCode::OK);
    let script = body.as_str().unwrap();
    assert!(script.contains("/api${path}"));
    assert!(script.contains("data?.code"));
    assert!(script.contains("data?.error"));

    let (status, body) = app.get("/js/notifications.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("/notifications/unread-count"));

    let (status, _) = app.get("/css/storefront.css", None).await;
    assert_eq!(status, StatusCode::OK);

    // API routes still win over the fallback.
    let (status, body) = app.get("/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}
