#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for loading district reference data.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use problem_map_database::{PostgisStore, ProblemStore as _, db, run_migrations};

#[derive(Parser)]
#[command(name = "problem_map_districts", about = "District reference data tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load district boundaries from a `GeoJSON` `FeatureCollection`
    Load {
        /// Path to the dataset (features need `osm-relation-id` and `name`)
        file: PathBuf,
        /// Run migrations before loading
        #[arg(long)]
        migrate: bool,
    },
    /// List the districts currently in the store
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let store = PostgisStore::new(db::connect_from_env().await?);

    match cli.command {
        Commands::Migrate => {
            log::info!("Running database migrations...");
            run_migrations(store.database()).await?;
            log::info!("Migrations complete.");
        }
        Commands::Load { file, migrate } => {
            if migrate {
                run_migrations(store.database()).await?;
            }
            let count = problem_map_districts::load_file(&store, &file).await?;
            println!("Loaded {count} districts from {}", file.display());
        }
        Commands::List => {
            let districts = store.list_districts().await?;
            println!("{:<12} NAME", "ID");
            println!("{}", "-".repeat(50));
            for district in &districts {
                println!("{:<12} {}", district.id, district.name);
            }
        }
    }

    Ok(())
}
