use clap::Parser;
use recordtree::db::{migrate, Db};
use recordtree::{Config, Record, SqliteStore};
use std::path::Path;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Load a small demo CRM dataset (with self-referencing records) into the database")]
struct Args {
    /// Delete existing rows from the demo tables first
    #[arg(short, long)]
    reset: bool,
}

const DEMO_TABLES: [&str; 6] = [
    "Account",
    "Contact",
    "Opportunity",
    "OpportunityLineItem",
    "Case",
    "CaseComment",
];

/// (entity type, record) pairs, oldest first.
fn demo_records() -> Vec<(&'static str, Record)> {
    vec![
        ("Account", Record::new("A1").with_field("Name", "Acme Corp").with_field("ParentId", "A1")),
        ("Account", Record::new("A2").with_field("Name", "Acme Europe").with_field("ParentId", "A1")),
        ("Contact", Record::new("C1").with_field("Name", "Ada Lovelace").with_field("AccountId", "A1")),
        ("Contact", Record::new("C2").with_field("Name", "Charles Babbage").with_field("AccountId", "A1")),
        ("Contact", Record::new("C3").with_field("Name", "Grace Hopper").with_field("AccountId", "A2")),
        ("Opportunity", Record::new("O1").with_field("Name", "Renewal 2025").with_field("AccountId", "A1")),
        ("OpportunityLineItem", Record::new("L1").with_field("Quantity", 3).with_field("OpportunityId", "O1")),
        ("Case", Record::new("CS1").with_field("Subject", "Login fails").with_field("ContactId", "C1").with_field("ParentId", "CS1")),
        ("Case", Record::new("CS2").with_field("Subject", "Follow-up").with_field("AccountId", "A1").with_field("ParentId", "CS1")),
        ("CaseComment", Record::new("CC1").with_field("Body", "Reproduced").with_field("ParentId", "CS1")),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let reset = args.reset;

    let inserted = db.with_connection(move |conn| {
        migrate::run_migrations(conn, Path::new("migrations"))?;

        let tx = conn.transaction()?;
        if reset {
            for table in DEMO_TABLES {
                tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
            }
            log::info!("Cleared {} demo tables", DEMO_TABLES.len());
        }

        let store = SqliteStore::new(&tx);
        let records = demo_records();
        for (entity_type, record) in &records {
            store.insert(entity_type, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }).await?;

    log::info!("Seeded {} records into {}", inserted, db.path().display());
    println!("Try: recordtree hierarchy A1 --type Account --depth 3 --pretty");
    Ok(())
}
