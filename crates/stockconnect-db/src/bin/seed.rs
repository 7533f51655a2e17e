//! # Seed Data Generator
//!
//! Creates a demo business with settings, a stocked catalogue and a few
//! customers, so the API has something to sell against.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockconnect-db --bin seed
//! cargo run -p stockconnect-db --bin seed -- --db ./data/stockconnect.db --count 40
//! ```
//!
//! Prints the new business id; send it as `X-Business-Id`.

use std::env;

use stockconnect_core::DEFAULT_BUSINESS_NAME;
use stockconnect_db::{Database, DbConfig, NewCustomer, NewProduct, SettingsUpdate};

/// (category, name, price in naira, supplier phone)
const CATALOGUE: &[(&str, &str, i64, &str)] = &[
    ("Grains", "Rice 5kg", 9_500, "+2348031110001"),
    ("Grains", "Beans 1kg", 2_200, "+2348031110001"),
    ("Grains", "Garri 2kg", 1_800, "+2348031110001"),
    ("Grains", "Semovita 1kg", 1_600, "+2348031110002"),
    ("Beverages", "Peak Milk Tin", 450, "+2348031110003"),
    ("Beverages", "Milo 400g", 2_900, "+2348031110003"),
    ("Beverages", "Lipton Tea 50s", 1_200, "+2348031110003"),
    ("Beverages", "Bottled Water 75cl", 200, "+2348031110004"),
    ("Noodles", "Indomie Chicken 70g", 250, "+2348031110005"),
    ("Noodles", "Indomie Onion 120g", 400, "+2348031110005"),
    ("Oils", "Groundnut Oil 1L", 3_200, "+2348031110006"),
    ("Oils", "Palm Oil 1L", 2_600, "+2348031110006"),
    ("Spices", "Maggi Cubes 100s", 1_500, "+2348031110007"),
    ("Spices", "Curry 50g", 350, "+2348031110007"),
    ("Spices", "Thyme 50g", 350, "+2348031110007"),
    ("Household", "Detergent 900g", 2_100, "+2348031110008"),
    ("Household", "Bar Soap", 600, "+2348031110008"),
    ("Household", "Tissue Roll 4pk", 1_300, "+2348031110008"),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Chioma Okafor", "+2348051234001"),
    ("Tunde Bakare", "+2348051234002"),
    ("Aisha Bello", "+2348051234003"),
    ("Emeka Nwosu", "+2348051234004"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockconnect.db");
    let mut count = CATALOGUE.len();
    let mut business_name = DEFAULT_BUSINESS_NAME.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--name" | "-n" => {
                if i + 1 < args.len() {
                    business_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockConnect Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of products (default: {})", CATALOGUE.len());
                println!("  -d, --db <PATH>     Database file path (default: ./stockconnect.db)");
                println!("  -n, --name <NAME>   Business name (default: {})", DEFAULT_BUSINESS_NAME);
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("StockConnect Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let business = db.businesses().create(&business_name, Some("+2348030000000")).await?;
    println!("✓ Business '{}' created (id {})", business.name, business.id);

    db.settings()
        .update(
            business.id,
            &SettingsUpdate {
                address: Some("12 Market Road, Lagos".to_string()),
                receipt_footer: Some("Thank you for shopping with us".to_string()),
                ..SettingsUpdate::default()
            },
        )
        .await?;
    println!("✓ Settings saved");

    let products: Vec<NewProduct> = CATALOGUE
        .iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(index, (category, name, naira, supplier_phone))| {
            let round = index / CATALOGUE.len();
            let name = if round == 0 {
                name.to_string()
            } else {
                format!("{} #{}", name, round + 1)
            };
            let price_cents = naira * 100;

            NewProduct {
                name,
                category: Some(category.to_string()),
                price_cents,
                cost_cents: price_cents * (60 + (index % 20) as i64) / 100,
                // A few start at or below the threshold so alerts are visible
                quantity: (index as i64 * 7) % 40,
                reorder_threshold: Some(5),
                supplier: Some(format!("{} Distributors", category)),
                supplier_phone: Some(supplier_phone.to_string()),
                barcode: Some(format!("615{:010}", index)),
                ..NewProduct::default()
            }
        })
        .collect();

    let ids = db.products().create_many(business.id, &products).await?;
    println!("✓ {} products created", ids.len());

    for (name, phone) in CUSTOMERS {
        db.customers()
            .create(
                business.id,
                &NewCustomer {
                    name: name.to_string(),
                    phone: phone.to_string(),
                    email: None,
                },
            )
            .await?;
    }
    println!("✓ {} customers created", CUSTOMERS.len());

    let low = db.products().count_low_stock(business.id).await?;
    println!();
    println!("  {} products start at or below their reorder threshold", low);
    println!();
    println!("✓ Seed complete! Use header X-Business-Id: {}", business.id);

    db.close().await;
    Ok(())
}
