/**
 * Server Configuration
 *
 * Startup helpers that turn a `RealtimeConfig` into live services,
 * focusing on the optional PostgreSQL connection behind the project
 * directory.
 *
 * # Error Handling
 *
 * Database errors are logged but do not prevent server startup. Without a
 * pool the server falls back to an allow-all in-memory directory.
 */

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::backend::directory::{InMemoryDirectory, PgDirectory, ProjectDirectory};

/// Connect to the database if a URL is configured
///
/// # Returns
///
/// - `Some(PgPool)` if the pool was created
/// - `None` if no URL is set or the connection failed
pub async fn load_database(database_url: Option<&str>) -> Option<PgPool> {
    let Some(database_url) = database_url else {
        tracing::warn!("[Server] DATABASE_URL not set. Access checks will allow every subject.");
        return None;
    };

    tracing::info!("[Server] Connecting to database...");

    match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("[Server] Database connection pool created successfully");
            Some(pool)
        }
        Err(e) => {
            tracing::error!("[Server] Failed to create database connection pool: {:?}", e);
            tracing::warn!("[Server] Access checks will allow every subject.");
            None
        }
    }
}

/// Directory backed by the pool, or allow-all without one
pub fn directory_for(pool: Option<PgPool>) -> Arc<dyn ProjectDirectory> {
    match pool {
        Some(pool) => Arc::new(PgDirectory::new(pool)),
        None => Arc::new(InMemoryDirectory::allow_all()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_means_no_pool() {
        assert!(load_database(None).await.is_none());
    }

    #[tokio::test]
    async fn test_fallback_directory_allows_all() {
        let directory = directory_for(None);
        assert!(directory.project_exists(1, 1).await.unwrap());
    }
}
