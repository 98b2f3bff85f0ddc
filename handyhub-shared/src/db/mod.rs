/// Database layer for HandyHub
///
/// # Modules
///
/// - `pool`: SQLite connection pool management with health checks
/// - `migrations`: embedded schema migrations and status reporting
/// - Models live in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
