use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::{Path, PathBuf};
use tracing::info;

pub type DbPool = Pool<Sqlite>;

pub struct Database;

impl Database {
    pub async fn initialize(database_url: &str, max_connections: u32) -> Result<DbPool> {
        // Create database directory
        if let Some(parent) = sqlite_file_path(database_url)
            .as_deref()
            .and_then(Path::parent)
        {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        info!(target: "offline::db", "Database connected: {}", database_url);

        Self::run_migrations(&pool).await?;

        Ok(pool)
    }

    async fn run_migrations(pool: &DbPool) -> Result<()> {
        info!(target: "offline::db", "Running database migrations...");

        sqlx::migrate!("./migrations").run(pool).await?;

        info!(target: "offline::db", "Database migrations completed");
        Ok(())
    }
}

/// On-disk location named by a `sqlite:` url, `None` for in-memory databases.
fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}
