/// Command-line interface
use clap::{Parser, Subcommand};

/// HandyHub store administration
#[derive(Debug, Parser)]
#[command(name = "handyhub-admin")]
#[command(about = "HandyHub store administration: migrations, catalog seeding, status")]
#[command(version)]
pub struct Cli {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Apply migrations, then upsert the default service catalog
    Seed,

    /// Print migration and pool status as JSON
    Status,
}
