//! # Routes
//!
//! Each resource module exposes `router(&AppState)`, grouping its handlers by
//! guard (public, optional auth, authenticated, admin).
//!
//! ```text
//! /health                      health
//! /api/users/*                 users
//! /api/settings                settings        (admin)
//! /api/products/*              products
//! /api/categories/*            categories
//! /api/cart/*                  cart            (auth)
//! /api/orders/*                orders
//! /api/addresses/*             addresses       (auth)
//! /api/cards/*                 cards           (auth)
//! /api/favorites/*             favorites       (auth)
//! /api/notifications/*         notifications   (auth)
//! /api/content/*               content
//! /*                           static files from STATIC_DIR
//! ```

pub mod addresses;
pub mod cards;
pub mod cart;
pub mod categories;
pub mod content;
pub mod favorites;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::AppState;

/// Body of simple acknowledgements.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", users::router(&state))
        .nest("/settings", settings::router(&state))
        .nest("/products", products::router(&state))
        .nest("/categories", categories::router(&state))
        .nest("/cart", cart::router(&state))
        .nest("/orders", orders::router(&state))
        .nest("/addresses", addresses::router(&state))
        .nest("/cards", cards::router(&state))
        .nest("/favorites", favorites::router(&state))
        .nest("/notifications", notifications::router(&state))
        .nest("/content", content::router(&state));

    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .fallback_service(static_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
