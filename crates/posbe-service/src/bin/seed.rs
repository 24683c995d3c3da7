//! # Seed Data Generator
//!
//! Populates a fresh database with a small coffee shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by DATABASE_PATH (default ./posbe.db)
//! cargo run -p posbe-service --bin seed
//!
//! # Specify database path
//! cargo run -p posbe-service --bin seed -- --db ./data/posbe.db
//! ```
//!
//! ## Generated Data
//! - Roles: admin, cashier, waiter
//! - User: `admin` (password from `SEED_ADMIN_PASSWORD`, default `admin123`)
//! - Units, categories with subcategories, addons
//! - Products with size variants: `{CODE}-{SIZE}` SKUs
//! - Two floors: tables on the ground floor, rooms upstairs
//!
//! Everything goes through the services, so validation and hashing apply.
//! The reference caches are warmed at the end.

use std::env;

use posbe_core::{
    Addon, Category, Floor, FloorLayout, Product, ProductVariant, Role, Room, Subcategory, Table,
    Unit, User,
};
use posbe_db::Database;
use posbe_service::logging::init_tracing;
use posbe_service::{connect_cache, AppConfig, Services};
use tracing::info;

/// (category, subcategory, [(code, name, base price)])
const MENU: &[(&str, &str, &[(&str, &str, f64)])] = &[
    (
        "Coffee",
        "Espresso based",
        &[
            ("ESP", "Espresso", 2.5),
            ("AMR", "Americano", 3.0),
            ("LAT", "Caffe Latte", 4.0),
            ("CAP", "Cappuccino", 4.0),
            ("MOC", "Caffe Mocha", 4.5),
        ],
    ),
    (
        "Tea",
        "Brewed",
        &[
            ("GRT", "Green Tea", 2.5),
            ("BLT", "Black Tea", 2.5),
            ("CHA", "Chai Latte", 4.0),
        ],
    ),
    (
        "Pastry",
        "Baked",
        &[
            ("CRO", "Croissant", 3.0),
            ("MUF", "Blueberry Muffin", 3.5),
        ],
    ),
];

/// Size variants: (suffix, volume in ml, price addon)
const SIZES: &[(&str, f64, f64)] = &[("S", 240.0, 0.0), ("M", 355.0, 0.5), ("L", 475.0, 1.0)];

const ADDONS: &[(&str, &str, f64)] = &[
    ("Extra shot", "One more espresso shot", 0.75),
    ("Oat milk", "Swap dairy for oat", 0.5),
    ("Vanilla syrup", "One pump", 0.5),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AppConfig::load()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Posbe Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH or ./posbe.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Posbe Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database_path);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let cache = connect_cache(&config).await;
    let services = Services::new(&db, cache);
    let start = std::time::Instant::now();

    seed_accounts(&services).await?;
    println!("✓ Roles and admin user");

    let products = seed_catalog(&services).await?;
    println!("✓ Catalog: {} products", products);

    seed_floor_plan(&services).await?;
    println!("✓ Floor plan");

    services
        .store_pref
        .update_prefs("store_name", "Posbe Coffee")
        .await?;

    // Warm the reference caches
    services.account.role_list().await?;
    services.catalog.unit_list().await?;
    services.catalog.category_list().await?;
    services.catalog.subcategory_list().await?;
    services.catalog.addon_list().await?;
    services.store_pref.all_prefs().await?;
    println!("✓ Caches warmed");

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Seed complete");
    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    db.close().await;
    Ok(())
}

async fn seed_accounts(services: &Services) -> Result<(), Box<dyn std::error::Error>> {
    let mut admin_id = 0;
    for (name, description) in [
        ("admin", "Full back-office access"),
        ("cashier", "Sales and payments"),
        ("waiter", "Orders and tables"),
    ] {
        let role = services
            .account
            .add_role(Role {
                name: name.to_string(),
                description: description.to_string(),
                ..Default::default()
            })
            .await?;
        if name == "admin" {
            admin_id = role.id;
        }
    }

    let password = env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    services
        .account
        .add_user(User {
            role_id: admin_id,
            name: "Administrator".to_string(),
            username: "admin".to_string(),
            email: Some("admin@posbe.local".to_string()),
            password,
            ..Default::default()
        })
        .await?;

    Ok(())
}

async fn seed_catalog(services: &Services) -> Result<usize, Box<dyn std::error::Error>> {
    let ml = services
        .catalog
        .add_unit(Unit {
            magnitude: "volume".to_string(),
            name: "millilitre".to_string(),
            symbol: "ml".to_string(),
            ..Default::default()
        })
        .await?;
    services
        .catalog
        .add_unit(Unit {
            magnitude: "count".to_string(),
            name: "piece".to_string(),
            symbol: "pcs".to_string(),
            ..Default::default()
        })
        .await?;

    for (name, description, price) in ADDONS {
        services
            .catalog
            .add_addon(Addon {
                name: name.to_string(),
                description: description.to_string(),
                price: *price,
                ..Default::default()
            })
            .await?;
    }

    let mut generated = 0;
    for (category_name, subcategory_name, items) in MENU {
        let category = services
            .catalog
            .add_category(Category {
                name: category_name.to_string(),
                ..Default::default()
            })
            .await?;
        let subcategory = services
            .catalog
            .add_subcategory(Subcategory {
                category_id: category.id,
                name: subcategory_name.to_string(),
                ..Default::default()
            })
            .await?;

        for (code, name, base_price) in items.iter() {
            let variants = SIZES
                .iter()
                .map(|(size, volume, addon)| ProductVariant {
                    unit_id: ml.id,
                    unit_size: *volume,
                    kind: "size".to_string(),
                    name: format!("{name} {size}"),
                    price: base_price + addon,
                    ..Default::default()
                })
                .collect();

            services
                .product
                .add_product(Product {
                    category_id: category.id,
                    subcategory_id: subcategory.id,
                    sku: code.to_string(),
                    name: name.to_string(),
                    price: *base_price,
                    variants,
                    ..Default::default()
                })
                .await?;
            generated += 1;
        }
    }

    Ok(generated)
}

async fn seed_floor_plan(services: &Services) -> Result<(), Box<dyn std::error::Error>> {
    let ground = services
        .store
        .add_floor(Floor {
            name: "Ground floor".to_string(),
            ..Default::default()
        })
        .await?;

    for n in 0..6 {
        services
            .store
            .add_table(Table {
                floor_id: ground.id,
                name: format!("T{}", n + 1),
                x_pos: f64::from(n % 3) * 3.0,
                y_pos: f64::from(n / 3) * 3.0,
                w_size: 2.0,
                h_size: 2.0,
                capacity: if n % 2 == 0 { 2 } else { 4 },
                kind: "square".to_string(),
                ..Default::default()
            })
            .await?;
    }

    let upstairs = services
        .store
        .add_floor(Floor {
            name: "First floor".to_string(),
            ..Default::default()
        })
        .await?;

    for (name, capacity, price) in [("Meeting room", 8, 25.0), ("Private lounge", 12, 40.0)] {
        services
            .store
            .add_room(Room {
                floor_id: upstairs.id,
                name: name.to_string(),
                w_size: 6.0,
                h_size: 4.0,
                capacity,
                price,
                ..Default::default()
            })
            .await?;
    }

    let tables: usize = services
        .store
        .floors_with(FloorLayout::Tables)
        .await?
        .iter()
        .map(|f| f.tables.len())
        .sum();
    info!(tables, "Floor plan seeded");

    Ok(())
}
