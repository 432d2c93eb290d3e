use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use tracing::error;

use crm_seed::config::Config;
use crm_seed::connection::select_connection;
use crm_seed::db::DB;
use crm_seed::model::Gender;
use crm_seed::repo::Repo;
use crm_seed::target::{AgeBand, TargetFilter};
use crm_seed::{logger, seeder, verify};

/// Seed the CRM users / user_features tables with 50 demo accounts.
#[derive(Parser, Debug)]
#[command(name = "crm-seed", version, about, long_about = None)]
struct Cli {
    /// Connections file (defaults to <config dir>/crm-seed/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Name of the connection to use (defaults to the first one, then MYSQL_* env vars)
    #[arg(short = 'n', long, global = true)]
    connection: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert the demo users and their features (default)
    Seed {
        /// Create the tables first if they do not exist
        #[arg(long)]
        create_tables: bool,
    },
    /// Check that every demo user and feature row is present
    Verify,
    /// Count and sample the users a target filter would reach
    Preview {
        #[arg(long, value_enum)]
        gender: Vec<Gender>,
        #[arg(long, value_enum)]
        age_band: Vec<AgeBand>,
        #[arg(long)]
        skin_type: Vec<String>,
        #[arg(long)]
        skin_concern: Vec<String>,
        /// Number of sample rows
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let log_path = Config::app_config_dir().ok().map(|dir| dir.join("crm-seed.log"));
    if logger::init(log_path.as_deref()).is_err() {
        let _ = logger::init(None);
    }

    let cli = Cli::parse();
    let result = run(cli);
    if let Err(err) = &result {
        error!("fatal error: {err:?}");
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::new()?,
    };
    let conn = select_connection(&config, cli.connection.as_deref())?;
    let mut db = DB::open(&conn).context("failed to open database")?;
    let mut repo = Repo::new(db.as_mut());

    match cli.command.unwrap_or(Command::Seed { create_tables: false }) {
        Command::Seed { create_tables } => {
            if create_tables {
                repo.create_tables()?;
            }
            let report = seeder::seed(&mut repo, seeder::run_timestamp())?;
            println!("users: {}", report.users_total);
            println!("user_features: {}", report.features_total);
        }
        Command::Verify => {
            let report = verify::check(&mut repo)?;
            println!("{report}");
            if !report.is_consistent() {
                bail!("seeded tables are inconsistent");
            }
        }
        Command::Preview {
            gender,
            age_band,
            skin_type,
            skin_concern,
            sample,
        } => {
            let filter = TargetFilter {
                genders: gender,
                age_bands: age_band,
                skin_types: skin_type,
                skin_concerns: skin_concern,
            };
            let preview = repo.preview_target(&filter, sample, Local::now().year())?;
            println!("target: {}", filter.summary());
            println!("count: {}", preview.count);
            for user in &preview.sample {
                println!("  {user}");
            }
        }
    }
    Ok(())
}
