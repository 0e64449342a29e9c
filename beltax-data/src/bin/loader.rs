use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use beltax_data::RuleDataLoader;
use beltax_db_sqlite::SqliteRuleRepository;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load vehicle-tax rule data from CSV files into the database.
///
/// Each rule kind has its own file and column layout; pass any subset. Date
/// columns are ISO-8601, empty `max_value`/`valid_to` cells mean unbounded /
/// currently active. See the `beltax_data::loader` record types for the
/// exact columns.
#[derive(Parser, Debug)]
#[command(name = "beltax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file with tax bracket rows
    #[arg(long)]
    brackets: Option<PathBuf>,

    /// CSV file with tax parameter rows
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// CSV file with age coefficient rows
    #[arg(long)]
    age_coefficients: Option<PathBuf>,

    /// CSV file with exemption rows
    #[arg(long)]
    exemptions: Option<PathBuf>,

    /// SQLite database URL (e.g., sqlite:beltax.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:beltax.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let repository = SqliteRuleRepository::new(&args.database).await?;

    if args.migrate {
        repository.run_migrations().await?;
        info!("migrations applied");
    }

    if let Some(seeds_dir) = &args.seeds {
        repository.run_seeds(seeds_dir).await?;
        info!(dir = %seeds_dir.display(), "seeds applied");
    }

    if let Some(path) = &args.brackets {
        let records = RuleDataLoader::parse_brackets(open(path)?)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        let created = RuleDataLoader::load_brackets(&repository, records).await?;
        info!(created, file = %path.display(), "brackets loaded");
    }

    if let Some(path) = &args.parameters {
        let records = RuleDataLoader::parse_parameters(open(path)?)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        let created = RuleDataLoader::load_parameters(&repository, records).await?;
        info!(created, file = %path.display(), "parameters loaded");
    }

    if let Some(path) = &args.age_coefficients {
        let records = RuleDataLoader::parse_age_coefficients(open(path)?)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        let created = RuleDataLoader::load_age_coefficients(&repository, records).await?;
        info!(created, file = %path.display(), "age coefficients loaded");
    }

    if let Some(path) = &args.exemptions {
        let records = RuleDataLoader::parse_exemptions(open(path)?)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        let created = RuleDataLoader::load_exemptions(&repository, records).await?;
        info!(created, file = %path.display(), "exemptions loaded");
    }

    Ok(())
}
