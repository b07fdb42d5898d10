//! # Seed Data Generator
//!
//! Populates the database with a sample catalog and discount codes for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./eshop.db (or $DATABASE_PATH)
//! cargo run -p eshop-db --bin seed
//!
//! # Specify database path
//! cargo run -p eshop-db --bin seed -- --db ./data/eshop.db
//! ```
//!
//! ## Generated Data
//! - Grocery products with a range of MOQs and stock levels, including
//!   one out-of-stock product, one backorderable product and one draft
//! - Two discount codes: `WELCOME10` (unlimited) and `FIRSTORDER` (limit 100)

use chrono::{Duration, Utc};
use std::env;
use eshop_core::{Discount, DiscountKind, Product, ProductStatus};
use eshop_db::{Database, DbConfig};
use uuid::Uuid;

/// (name, price in kobo, stock, MOQ, backorder, status)
const PRODUCTS: &[(&str, i64, i64, i64, bool, ProductStatus)] = &[
    ("Ofada Rice (5kg)", 1_250_000, 40, 1, false, ProductStatus::Active),
    ("Honey Beans (1kg)", 320_000, 120, 2, false, ProductStatus::Active),
    ("Palm Oil (1L)", 280_000, 75, 1, false, ProductStatus::Active),
    ("Garri Ijebu (2kg)", 180_000, 200, 3, false, ProductStatus::Active),
    ("Plantain Chips (Carton)", 950_000, 12, 1, false, ProductStatus::Active),
    ("Egusi (500g)", 240_000, 60, 1, false, ProductStatus::Active),
    ("Indomie Noodles (Carton)", 1_100_000, 0, 1, false, ProductStatus::Active),
    ("Yam Tuber (Large)", 450_000, 5, 1, true, ProductStatus::Active),
    ("Zobo Leaves (250g)", 90_000, 30, 4, false, ProductStatus::Active),
    ("Suya Spice (200g)", 150_000, 25, 1, false, ProductStatus::Draft),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| String::from("./eshop.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("eshop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH or ./eshop.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 eshop Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
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

    for (name, price_minor, stock, moq, backorder, status) in PRODUCTS {
        let product = build_product(name, *price_minor, *stock, *moq, *backorder, *status);
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        println!("  {} ({}, stock {})", product.name, product.price(), product.stock_quantity);
    }

    println!();
    println!("Generating discounts...");

    for discount in [
        build_discount("WELCOME10", "Welcome 10%", DiscountKind::Percent, 10, None),
        build_discount("FIRSTORDER", "First order", DiscountKind::FirstOrder, 50_000, Some(100)),
    ] {
        db.discounts().insert(&discount).await?;
        println!("  {}", discount.name);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn build_product(
    name: &str,
    price_minor: i64,
    stock: i64,
    moq: i64,
    backorder: bool,
    status: ProductStatus,
) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        price_minor,
        stock_quantity: stock,
        min_order_quantity: moq,
        allow_backorder: backorder,
        status,
        purchase_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn build_discount(
    code: &str,
    name: &str,
    kind: DiscountKind,
    value: i64,
    limit: Option<i64>,
) -> Discount {
    let now = Utc::now();
    Discount {
        id: Uuid::new_v4().to_string(),
        code: Some(code.to_string()),
        name: name.to_string(),
        kind,
        value,
        starts_at: now,
        ends_at: now + Duration::days(365),
        total_usage_limit: limit,
        usage_count: 0,
        is_active: true,
        created_at: now,
    }
}
