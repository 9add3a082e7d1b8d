//! # Seed Data Generator
//!
//! Populates the database with development data for the billing API.
//!
//! ## Usage
//! ```bash
//! # Generate 20 orders (default)
//! cargo run -p tavola-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tavola-db --bin seed -- --orders 200
//!
//! # Specify database path
//! cargo run -p tavola-db --bin seed -- --db ./data/tavola.db
//! ```
//!
//! ## Generated Rows
//! - One user per role (manager, cashier, waiter, chef, customer)
//! - Customers with varied point balances
//! - Open orders, every third one a walk-in (no customer)
//! - Promotions covering percentage, fixed, capped and exhausted rules

use chrono::{Duration, Utc};
use std::env;
use tavola_core::{Customer, DiscountType, Order, Promotion, StaffUser, UserRole, UNLIMITED_USES};
use tavola_db::{Database, DbConfig};
use uuid::Uuid;

/// Staff accounts, one per role.
const STAFF: &[(&str, &str, UserRole)] = &[
    ("staff-manager", "Giulia Manager", UserRole::Manager),
    ("staff-cashier", "Marco Cashier", UserRole::Cashier),
    ("staff-waiter", "Sara Waiter", UserRole::Waiter),
    ("staff-chef", "Luca Chef", UserRole::Chef),
    ("staff-guest", "Guest Account", UserRole::Customer),
];

/// Customers with their starting balances.
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("cust-ana", "Ana", 0),
    ("cust-bruno", "Bruno", 120),
    ("cust-chiara", "Chiara", 500),
    ("cust-dario", "Dario", 1_250),
];

/// `(code, name, type, value, min_order_major, max_discount_major, max_uses, current_uses)`
#[allow(clippy::type_complexity)]
const PROMOTIONS: &[(&str, &str, DiscountType, i64, i64, Option<i64>, i64, i64)] = &[
    ("WELCOME10", "Welcome 10%", DiscountType::Percentage, 1_000, 0, None, UNLIMITED_USES, 0),
    ("LUNCH20", "Lunch 20% up to 50k", DiscountType::Percentage, 2_000, 100_000, Some(50_000), 100, 12),
    ("FLAT25K", "25k off", DiscountType::Fixed, 25_000, 200_000, None, 50, 0),
    ("SOLDOUT", "Exhausted promo", DiscountType::Percentage, 1_500, 0, None, 3, 3),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut order_count: usize = 20;
    let mut db_path = String::from("./tavola_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    order_count = args[i + 1].parse().unwrap_or(20);
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
                println!("Tavola Billing Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of orders to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./tavola_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tavola Billing Seed Data Generator");
    println!("=====================================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", order_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.customers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} customers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    for (id, name, role) in STAFF {
        db.staff()
            .insert(&StaffUser {
                id: id.to_string(),
                full_name: name.to_string(),
                role: *role,
                is_active: true,
            })
            .await?;
    }
    println!("✓ {} staff users", STAFF.len());

    for (idx, (id, name, points)) in CUSTOMERS.iter().enumerate() {
        db.customers()
            .insert(&Customer {
                id: id.to_string(),
                name: name.to_string(),
                phone: Some(format!("+39 02 5550 {:04}", idx + 1)),
                points: *points,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("✓ {} customers", CUSTOMERS.len());

    for (code, name, discount_type, value, min_major, max_major, max_uses, current_uses) in
        PROMOTIONS
    {
        db.promotions()
            .insert(&Promotion {
                id: Uuid::new_v4().to_string(),
                code: code.to_string(),
                name: name.to_string(),
                discount_type: *discount_type,
                discount_value: match discount_type {
                    DiscountType::Percentage => *value,
                    DiscountType::Fixed => value * 100,
                },
                min_order_cents: min_major * 100,
                max_discount_cents: max_major.map(|m| m * 100),
                start_date: now - Duration::days(7),
                end_date: now + Duration::days(90),
                is_active: true,
                max_uses: *max_uses,
                current_uses: *current_uses,
            })
            .await?;
    }
    println!("✓ {} promotions", PROMOTIONS.len());

    for n in 0..order_count {
        let customer_id = if n % 3 == 2 {
            None
        } else {
            Some(CUSTOMERS[n % CUSTOMERS.len()].0.to_string())
        };

        let order = Order {
            id: format!("order-{:04}", n + 1),
            customer_id,
            table_id: Some(format!("T{}", n % 12 + 1)),
            status: "served".to_string(),
            created_at: now,
        };

        if let Err(e) = db.orders().insert(&order).await {
            eprintln!("Failed to insert {}: {}", order.id, e);
        }
    }
    println!("✓ {} orders", order_count);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
