//! Shared harness for the HTTP tests: an in-memory database, a throwaway
//! static/upload directory and helpers that drive the router with `oneshot`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{build_router, AppState, ServerConfig};
use storefront_core::{Product, Role, User};
use storefront_db::{hash_password, Database, DbConfig, NewUser, ProductInput};

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    pub dir: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Serves static files from `static_dir` instead of the scratch directory.
    /// Only the scratch directory is removed on drop.
    pub async fn with_static_dir(static_dir: PathBuf) -> Self {
        Self::build(Some(static_dir)).await
    }

    async fn build(static_dir: Option<PathBuf>) -> Self {
        let dir = std::env::temp_dir().join(format!("storefront-api-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let config = ServerConfig {
            jwt_secret: "test-secret".to_string(),
            static_dir: static_dir.unwrap_or_else(|| dir.clone()),
            upload_dir: dir.join("uploads"),
            ..ServerConfig::default()
        };

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, config);
        let router = build_router(state.clone());

        TestApp { state, router, dir }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Creates an account directly and returns it with a bearer token.
    pub async fn user(&self, email: &str, role: Role) -> (User, String) {
        let user = self
            .db()
            .users()
            .create(NewUser {
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                role,
            })
            .await
            .unwrap();
        let token = self.state.jwt.issue(&user).unwrap();
        (user, token)
    }

    pub async fn customer(&self) -> (User, String) {
        self.user(&format!("{}@example.com", Uuid::new_v4()), Role::Customer).await
    }

    pub async fn admin(&self) -> (User, String) {
        self.user(&format!("admin-{}@example.com", Uuid::new_v4()), Role::Admin).await
    }

    pub async fn product(&self, name: &str, price_cents: i64, stock: i64) -> Product {
        self.db()
            .products()
            .create(&ProductInput {
                name: name.to_string(),
                price_cents,
                stock_quantity: stock,
                ..ProductInput::default()
            })
            .await
            .unwrap()
    }

    pub async fn set_sales(&self, active: bool) {
        self.db()
            .settings()
            .set("sales_active", if active { "true" } else { "false" })
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// Sends a multipart form. `file` is `(file name, content type, bytes)`
    /// for the `productImage` part.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> (StatusCode, Value) {
        let boundary = "storefront-test-boundary";
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"productImage\"; \
                     filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Files currently in the upload directory.
    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.dir.join("uploads")) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Polls until `user_id` holds at least `count` notifications. Dispatch
    /// runs on spawned tasks, so it lands shortly after the response.
    pub async fn wait_for_notifications(&self, user_id: &str, count: i64) -> Value {
        for _ in 0..100 {
            let page = self
                .db()
                .notifications()
                .list(user_id, 50, 0, false)
                .await
                .unwrap();
            if page.total >= count {
                return serde_json::to_value(page).unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} notifications for {user_id}");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// A valid checkout body for the given `(product id, quantity)` lines.
pub fn checkout(lines: &[(i64, i64)]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(id, qty)| serde_json::json!({ "productId": id, "quantity": qty }))
        .collect();

    serde_json::json!({
        "address": {
            "title": "Home",
            "fullName": "Ada Lovelace",
            "phone": "5550001122",
            "addressLine": "1 Analytical St",
            "city": "Izmir",
            "district": "Konak"
        },
        "paymentMethod": "credit_card",
        "cardInfo": { "cardHolderName": "Ada Lovelace", "last4": "4242" },
        "items": items,
        "customerNote": "Ring twice"
    })
}
