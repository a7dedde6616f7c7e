//! # Storefront API
//!
//! REST server for the shop pages and the admin panel.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  Browser ───► axum (3000) ───► routes/* ───► storefront-db ───► SQLite │
//! │                   │                 │                                   │
//! │                   │                 └──► Notifier (after commit)        │
//! │                   │                                                     │
//! │                   └──► ServeDir(static_dir)   pages + /uploads         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Environment configuration
//! - [`auth`] - JWT manager and route guards
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`notifier`] - Fire-and-forget notification dispatch
//! - [`uploads`] - Product image files
//! - [`routes`] - One module per resource

pub mod auth;
pub mod config;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod uploads;

use std::sync::Arc;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::build_router;

use auth::JwtManager;
use notifier::Notifier;
use storefront_db::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub notifier: Notifier,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            notifier: Notifier::new(db.clone()),
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}
