//! # HandyHub Admin
//!
//! Operator entry point for the HandyHub store.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p handyhub-admin -- migrate
//! cargo run -p handyhub-admin -- seed --database-url sqlite://handyhub.db
//! cargo run -p handyhub-admin -- status
//! ```

use clap::Parser;
use handyhub_admin::cli::{Cli, Command};
use handyhub_admin::commands;
use handyhub_admin::config::{Config, LogFormat};
use handyhub_shared::db::migrations::ensure_database_exists;
use handyhub_shared::db::pool::{close_pool, create_pool};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "handyhub_admin=info,handyhub_shared=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?.with_database_url(cli.database_url);

    init_tracing(config.logging.format);

    tracing::info!(
        command = ?cli.command,
        "HandyHub admin v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let pool_config = config.database.pool_config();
    ensure_database_exists(&pool_config.url).await?;
    let pool = create_pool(pool_config).await?;

    let result = match cli.command {
        Command::Migrate => commands::migrate(&pool).await.map(|status| {
            println!(
                "Applied {} of {} migrations (latest: {})",
                status.applied_migrations,
                status.known_migrations,
                status
                    .latest_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }),
        Command::Seed => commands::seed(&pool).await.map(|services| {
            for service in &services {
                println!("{}\t{}", service.id, service.name);
            }
            println!("Seeded {} services", services.len());
        }),
        Command::Status => match commands::status(&pool).await {
            Ok(report) => serde_json::to_string_pretty(&report)
                .map(|json| println!("{}", json))
                .map_err(anyhow::Error::from),
            Err(e) => Err(e),
        },
    };

    close_pool(pool).await;

    result
}
