//! Schema migration runner
//!
//! Usage: migration [up|down|status|fresh]

use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use storefront_api::{config, db, migrator::Migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let pool = db::establish_connection_from_app_config(&cfg).await?;

    let result = match command.as_str() {
        "up" => Migrator::up(&pool, None).await,
        "down" => Migrator::down(&pool, Some(1)).await,
        "fresh" => Migrator::fresh(&pool).await,
        "status" => Migrator::status(&pool).await,
        other => {
            error!("Unknown command {}; expected up, down, status or fresh", other);
            std::process::exit(2);
        }
    };

    match result {
        Ok(()) => {
            info!("Migration command '{}' finished", command);
            Ok(())
        }
        Err(e) => {
            error!("Migration command '{}' failed: {}", command, e);
            Err(e.into())
        }
    }
}
