use super::{Result, StoreError};
/// Database schema definitions and integrity checks for the election store.
use sqlx::SqlitePool;

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // One row per election; the full document lives in the JSON column and
    // the version column carries the compare-and-swap counter.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elections (
            id TEXT PRIMARY KEY,
            admin_uid TEXT NOT NULL,
            version INTEGER NOT NULL,
            document TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_elections_admin ON elections(admin_uid)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Verify database schema integrity
pub async fn verify_schema(pool: &SqlitePool) -> Result<()> {
    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(pool)
            .await?;

    if !tables.iter().any(|name| name == "elections") {
        return Err(StoreError::Integrity("Missing table: elections".to_string()));
    }

    Ok(())
}
