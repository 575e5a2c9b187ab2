use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::store::sqlite::connect;

/// Create the vector store schema in the configured database.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = connect(&config.db.path).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes if they do not exist yet.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per live collection
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Vectors with their chunk text and metadata
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            document TEXT NOT NULL,
            file_path TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_file_path ON entries(collection, file_path)")
        .execute(pool)
        .await?;

    Ok(())
}
