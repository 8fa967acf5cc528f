use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recordtree::db::{migrate, Db};
use recordtree::http::HierarchyServer;
use recordtree::{
    get_hierarchy_data, get_hierarchy_data_with_report, Config, RelationshipRegistry, SqliteStore,
};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "recordtree")]
#[command(about = "Build grouped, depth-bounded record hierarchies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hierarchy rooted at one record as JSON
    Hierarchy {
        /// Root record id
        id: String,

        /// Root entity type, e.g. Account
        #[arg(short = 't', long = "type")]
        entity_type: String,

        /// Maximum depth (defaults to recordtree.default_max_depth)
        #[arg(short, long)]
        depth: Option<i64>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Also print the build report (skipped relationships, counts) to stderr
        #[arg(long)]
        report: bool,
    },

    /// Apply pending SQL migrations
    Migrate,

    /// Serve GET /hierarchy over HTTP
    Serve {
        /// Port (defaults to http_server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.recordtree.log_level.as_str())
    ).init();

    let db = Db::new(config.db_path());
    let registry = RelationshipRegistry::from_config(&config);

    match cli.command {
        Command::Hierarchy { id, entity_type, depth, pretty, report } => {
            let max_depth = depth.unwrap_or_else(|| config.default_max_depth());
            run_hierarchy(&db, registry, id, entity_type, max_depth, pretty, report).await?;
        }
        Command::Migrate => {
            let applied = db.with_connection(|conn| {
                migrate::run_migrations(conn, Path::new("migrations"))
            }).await?;
            println!("Applied {} migration(s) to {}", applied, db.path().display());
        }
        Command::Serve { port } => {
            config.require_http_server()?;
            let port = port.unwrap_or(config.http_server.port);
            let server = HierarchyServer::new(db, registry, &config);
            server.run(port).await?;
        }
    }

    Ok(())
}

async fn run_hierarchy(
    db: &Db,
    registry: RelationshipRegistry,
    id: String,
    entity_type: String,
    max_depth: i64,
    pretty: bool,
    report: bool,
) -> Result<()> {
    let result = db.with_connection(move |conn| {
        let store = SqliteStore::new(conn);
        if report {
            get_hierarchy_data_with_report(&store, &registry, &id, &entity_type, max_depth)
                .map(|(node, report)| (node, Some(report)))
        } else {
            get_hierarchy_data(&store, &registry, &id, &entity_type, max_depth)
                .map(|node| (node, None))
        }
    }).await;

    let (node, build_report) = match result {
        Ok(built) => built,
        Err(e) => anyhow::bail!(e.user_message()),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&node)
    } else {
        serde_json::to_string(&node)
    }
    .context("Failed to serialize hierarchy")?;
    println!("{}", json);

    if let Some(build_report) = build_report {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&build_report).context("Failed to serialize report")?
        );
    }

    Ok(())
}
