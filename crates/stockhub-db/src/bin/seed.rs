//! # Seed Data Generator
//!
//! Fills a development database with a demo catalog and some stock movements.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p stockhub-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockhub-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p stockhub-db --bin seed -- --db ./data/stockhub.db
//! ```
//!
//! ## Generated Data
//! Each product gets:
//! - Name: `{item} {variant}`
//! - Price: 0.99 - 49.99
//! - Opening stock: 20 - 220
//!
//! Every third product also gets a couple of issued-stock movements, so the
//! ledger is not empty when a client connects.

use std::env;
use stockhub_core::{Money, NewProduct};
use stockhub_db::{Database, DbConfig, SqlValue};
use sqlx::Row;

/// Item families for realistic test data
const ITEMS: &[&str] = &[
    "Widget",
    "Gadget",
    "Bolt",
    "Hex Nut",
    "Washer",
    "Bracket",
    "Hinge",
    "Cable Tie",
    "RFID Tag",
    "Label Roll",
    "Pallet Wrap",
    "Carton",
    "Tape",
    "Zip Bag",
    "Gloves",
    "Safety Vest",
    "Marker",
    "Scanner Battery",
    "Shelf Bin",
    "Divider",
];

/// Variants per item family, with a price addon in cents
const VARIANTS: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 150),
    ("Large", 300),
    ("Blue", 50),
    ("Red", 50),
    ("Steel", 400),
    ("Pack of 10", 900),
    ("Pack of 50", 3500),
    ("Pack of 100", 4500),
    ("Bulk", 4800),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockhub_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockhub Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockhub_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockhub Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut movements = 0;
    let start = std::time::Instant::now();

    'outer: for (item_idx, item) in ITEMS.iter().enumerate() {
        for (variant_idx, (variant, price_addon)) in VARIANTS.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let seed = item_idx * VARIANTS.len() + variant_idx;
            let product = generate_product(item, variant, *price_addon, seed)?;

            let created = match db.products().create(&product).await {
                Ok(created) => created,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }
            };
            generated += 1;

            if seed % 3 == 0 {
                for issued in [3, 5] {
                    let moved = db
                        .inventory()
                        .decrement_stock(created.id, issued, &created.name)
                        .await?;
                    movements += moved.len();
                }
            }

            if generated % 50 == 0 {
                println!("  Generated {} products...", generated);
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products and {} movements in {:?}", generated, movements, elapsed);

    // Summary straight through the gateway
    println!();
    println!("Verifying totals...");
    let rows = db
        .execute(
            "SELECT COUNT(*) AS products, COALESCE(SUM(quantity), 0) AS on_hand \
             FROM product WHERE quantity >= ?1",
            &[SqlValue::from(0_i64)],
        )
        .await?;
    if let Some(row) = rows.first() {
        println!("  Products: {}", row.try_get::<i64, _>("products")?);
        println!("  Units on hand: {}", row.try_get::<i64, _>("on_hand")?);
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(
    item: &str,
    variant: &str,
    price_addon: i64,
    seed: usize,
) -> Result<NewProduct, Box<dyn std::error::Error>> {
    // Base price 0.99 - 1.99, plus the variant addon
    let base_price = 99 + ((seed * 17) % 100) as i64;
    let price = Money::from_cents(base_price + price_addon);

    // Opening stock 20 - 220
    let quantity = 20 + ((seed * 37) % 201) as i64;

    Ok(NewProduct::new(format!("{} {}", item, variant), price, quantity)?)
}
