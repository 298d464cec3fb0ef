//! # Demo Table Seeder
//!
//! Creates a `producto` table and fills it through the DataStore, so the
//! whole path (key allocation, audit columns, batch save) runs end to end.
//!
//! ## Usage
//! ```bash
//! # Insert 200 products (default)
//! cargo run -p erp-db --bin seed
//!
//! # Custom amount, tenant and user
//! cargo run -p erp-db --bin seed -- --count 1000 --tenant 2 --user ana
//!
//! # Specify database path
//! cargo run -p erp-db --bin seed -- --db ./data/erp.db
//! ```
//!
//! Without `--db`, the path comes from `erp.toml` / `ERP_DATABASE_PATH`.

use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use erp_core::CallerContext;
use erp_db::{Database, ErpConfig};

const NAMES: &[&str] = &[
    "Agua", "Cola", "Jugo de naranja", "Cafe", "Te verde", "Leche", "Yogur", "Queso", "Pan",
    "Arroz", "Fideos", "Azucar", "Sal", "Aceite", "Atun",
];

const SIZES: &[&str] = &["250ml", "500ml", "1L", "2L", "Pack x6"];

/// Rows per `save()` call.
const BATCH: usize = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;
    let mut tenant: i64 = 1;
    let mut user = String::from("seed");

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
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("ERP Demo Table Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to insert (default: 200)");
                println!("  -d, --db <PATH>      Database file path (default: from erp.toml)");
                println!("  -t, --tenant <ID>    Tenant id written to ide_empr (default: 1)");
                println!("  -u, --user <LOGIN>   Acting user (default: seed)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = ErpConfig::load_or_default(None);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("ERP Demo Table Seeder");
    println!("=====================");
    println!("Database: {}", config.database.path.display());
    println!("Products: {}", count);
    println!();

    let db = Database::with_tracking(config.db_config(), config.tracking.clone()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS producto (
            ide_prod INTEGER PRIMARY KEY,
            nombre TEXT NOT NULL,
            precio REAL,
            activo BOOLEAN NOT NULL DEFAULT 1,
            ide_empr INTEGER,
            ide_sucu INTEGER,
            usuario_ingre TEXT,
            fecha_ingre DATE,
            hora_ingre TIME,
            usuario_actua TEXT
        )
        "#,
    )
    .execute(db.pool())
    .await?;

    let ctx = CallerContext::new().tenant(tenant).user(user);
    let mut ds = db.data_store(Some(ctx));
    ds.set_data_store_table("producto", "ide_prod")?;
    // schema only; every batch starts from an empty view
    ds.set_where_table("1=0");

    println!();
    println!("Inserting products...");

    let start = std::time::Instant::now();
    let mut inserted = 0;
    let mut first_id = None;

    while inserted < count {
        ds.execute().await?;
        let batch = BATCH.min(count - inserted);

        for n in 0..batch {
            let seed = inserted + n;
            let row = ds.insert();
            let name = format!(
                "{} {}",
                NAMES[seed % NAMES.len()],
                SIZES[(seed / NAMES.len()) % SIZES.len()]
            );
            ds.set_value(row, "nombre", name)?;
            ds.set_value(row, "precio", 0.5 + (seed * 37 % 2000) as f64 / 100.0)?;
            ds.set_value(row, "activo", seed % 11 != 0)?;
        }

        let summary = ds.save().await?;
        if first_id.is_none() {
            first_id = ds.get_value(0, "ide_prod")?.as_i64();
        }
        inserted += summary.inserted;
        println!("  Inserted {} products...", inserted);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Inserted {} products in {:?}", inserted, elapsed);
    if let Some(first) = first_id {
        println!("  Keys: {}..={}", first, first + inserted as i64 - 1);
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM producto")
        .fetch_one(db.pool())
        .await?;
    println!("  Table now holds {} products", total);

    if config.tracking.audit_mutations {
        println!("  Audit log entries: {}", db.audit_log().count().await?);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Logs to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,erp_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
