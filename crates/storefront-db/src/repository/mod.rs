//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.orders().place_order(&user_id, checkout)                   │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── place_order(&self, user_id, checkout)   ← one transaction         │
//! │  ├── update_status(&self, id, update, admin) ← one transaction         │
//! │  ├── cancel(&self, id, user_id)              ← one transaction         │
//! │  └── list / get / items / history                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository holds a clone of the pool. Scoped reads and writes take
//! the caller's user id so ownership is enforced in SQL.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`SettingsRepository`](settings::SettingsRepository) - Storefront switches
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and visibility
//! - [`CategoryRepository`](category::CategoryRepository) - Categories and links
//! - [`CartRepository`](cart::CartRepository) - Cart lines with stock checks
//! - [`OrderRepository`](order::OrderRepository) - Checkout and fulfilment
//! - [`AddressRepository`](address::AddressRepository) - Address book
//! - [`CardRepository`](card::CardRepository) - Saved card metadata
//! - [`FavoriteRepository`](favorite::FavoriteRepository) - Wish list
//! - [`NotificationRepository`](notification::NotificationRepository) - In-app notifications
//! - [`ContentRepository`](content::ContentRepository) - Pages, help and FAQ

pub mod address;
pub mod card;
pub mod cart;
pub mod category;
pub mod content;
pub mod favorite;
pub mod notification;
pub mod order;
pub mod product;
pub mod settings;
pub mod user;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a write transaction with `BEGIN IMMEDIATE`.
///
/// A deferred transaction that reads before it writes cannot upgrade to the
/// write lock once another connection has committed, and SQLite fails it with
/// `SQLITE_BUSY` without waiting. Taking the lock up front makes concurrent
/// writers queue on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository tests.

    use std::path::PathBuf;

    use storefront_core::{Product, Role, User};
    use uuid::Uuid;

    use super::product::ProductInput;
    use super::user::NewUser;
    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A WAL database file with a real multi-connection pool. The files are
    /// removed on drop.
    pub struct FileDb {
        pub db: Database,
        path: PathBuf,
    }

    impl FileDb {
        pub async fn new(max_connections: u32) -> Self {
            let path = std::env::temp_dir().join(format!("storefront-test-{}.db", Uuid::new_v4()));
            let db = Database::new(DbConfig::new(&path).max_connections(max_connections))
                .await
                .unwrap();
            FileDb { db, path }
        }
    }

    impl Drop for FileDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }

    pub async fn user(db: &Database, email: &str, role: Role) -> User {
        db.users()
            .create(NewUser {
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                first_name: Some("Test".to_string()),
                last_name: Some("User".to_string()),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .create(&ProductInput {
                name: name.to_string(),
                price_cents,
                stock_quantity: stock,
                ..ProductInput::default()
            })
            .await
            .unwrap()
    }
}
