//! # Seed Data Generator
//!
//! Prepares a development database: an admin account, a small demo catalog
//! with categories, and sales switched on.
//!
//! ## Usage
//! ```bash
//! # Defaults: ./storefront.db, admin@example.com / admin123
//! cargo run -p storefront-db --bin seed
//!
//! # Custom admin and database path
//! cargo run -p storefront-db --bin seed -- \
//!     --db ./data/shop.db --admin-email me@shop.test --admin-password s3cret
//! ```
//!
//! Running it twice is safe: an existing admin email is promoted instead of
//! recreated, and the catalog step is skipped when products already exist.

use std::env;

use storefront_core::{OutOfStockRule, Role, SALES_ACTIVE_KEY};
use storefront_db::{hash_password, Database, DbConfig, NewUser, ProductInput};

/// Demo catalog: category → (name, description, price in cents, stock).
const CATALOG: &[(&str, &[(&str, &str, i64, i64)])] = &[
    (
        "Kitchen",
        &[
            ("Ceramic Mug", "Hand glazed, 350 ml", 1990, 40),
            ("Espresso Cup Set", "Four cups with saucers", 3450, 12),
            ("Serving Bowl", "Stoneware, dishwasher safe", 2750, 8),
            ("Teapot", "Cast iron, 800 ml", 6900, 3),
        ],
    ),
    (
        "Home",
        &[
            ("Linen Cushion", "45 x 45 cm, natural", 2490, 25),
            ("Scented Candle", "Cedar and amber", 1590, 60),
            ("Wool Throw", "130 x 170 cm", 8900, 0),
        ],
    ),
    (
        "Stationery",
        &[
            ("Dot Grid Notebook", "A5, 160 pages", 1290, 100),
            ("Fountain Pen", "Fine nib, refillable", 4500, 15),
            ("Desk Organizer", "Walnut", 3990, 5),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./storefront.db");
    let mut admin_email = String::from("admin@example.com");
    let mut admin_password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>              Database file path (default: ./storefront.db)");
                println!("      --admin-email <EMAIL>    Admin account email (default: admin@example.com)");
                println!("      --admin-password <PW>    Admin account password (default: admin123)");
                println!("  -h, --help                   Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Storefront Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Admin account
    match db.users().find_credentials(&admin_email).await? {
        Some((user, _)) if user.role.is_admin() => {
            println!("✓ Admin {} already exists", admin_email);
        }
        Some((user, _)) => {
            db.users().set_role(&user.id, Role::Admin).await?;
            println!("✓ Promoted {} to admin", admin_email);
        }
        None => {
            db.users()
                .create(NewUser {
                    email: admin_email.clone(),
                    password_hash: hash_password(&admin_password)?,
                    first_name: Some("Store".to_string()),
                    last_name: Some("Admin".to_string()),
                    role: Role::Admin,
                })
                .await?;
            println!("✓ Created admin {}", admin_email);
        }
    }

    // Sales on
    db.settings().set(SALES_ACTIVE_KEY, "true").await?;
    println!("✓ Sales activated");

    // Catalog
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    for (category_name, products) in CATALOG {
        let category = db.categories().create(category_name).await?;

        for &(name, description, price_cents, stock) in products.iter() {
            let input = ProductInput {
                name: name.to_string(),
                description: Some(description.to_string()),
                price_cents,
                stock_quantity: stock,
                out_of_stock_display_rule: if stock == 0 {
                    OutOfStockRule::Show
                } else {
                    OutOfStockRule::Default
                },
                critical_stock_threshold: Some(5),
                ..ProductInput::default()
            };

            let product = match db.products().create(&input).await {
                Ok(product) => product,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };

            db.categories().link(product.id, category.id).await?;
            generated += 1;
        }

        println!("  {}: {} products", category_name, products.len());
    }

    println!();
    println!("✓ Generated {} products in {} categories", generated, CATALOG.len());
    println!("✓ Seed complete!");

    Ok(())
}
