use anyhow::Result;

use crm_seed::db::Sqlite;
use crm_seed::repo::Repo;
use crm_seed::{logger, seeder};

fn main() -> Result<()> {
    logger::init(None)?;

    let path = std::path::Path::new("dev/sqlite");
    std::fs::create_dir_all(path)?;
    let db_path = path.join("crm.db");

    let mut db = Sqlite::open(&db_path)?;
    let mut repo = Repo::new(&mut db);
    repo.create_tables()?;
    let report = seeder::seed(&mut repo, seeder::run_timestamp())?;

    println!("Seeded SQLite at {}", db_path.display());
    println!("users: {}", report.users_total);
    println!("user_features: {}", report.features_total);
    Ok(())
}
