//! Schema migration CLI (`up`, `down`, `status`, `fresh`, `refresh`, `reset`).
//!
//! The database URL comes from `DATABASE_URL` or `-u`; when neither is given the
//! application's own configuration (`APP__DATABASE_URL`, config files) is used.

use inventory_api::{config::load_config, migrator::Migrator};
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    if std::env::var("DATABASE_URL").is_err() {
        match load_config() {
            Ok(cfg) => std::env::set_var("DATABASE_URL", cfg.database_url),
            Err(e) => eprintln!("could not load application config ({e}); expecting -u <url>"),
        }
    }

    cli::run_cli(Migrator).await;
}
