#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use postboard::{config::Settings, db, service::ServiceContext};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// In-memory database with migrations applied. A single connection keeps
/// every query on the same in-memory database.
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    db::run_migrations(&pool).await?;
    Ok(pool)
}

pub fn test_settings(upload_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.uploads.dir = upload_dir.to_string_lossy().into_owned();
    settings.auth.bootstrap_password = Some("super-secret-pw".to_string());
    settings
}

pub async fn test_context(upload_dir: &Path) -> anyhow::Result<(Arc<ServiceContext>, Settings)> {
    let settings = test_settings(upload_dir);
    let pool = test_pool().await?;
    let ctx = Arc::new(ServiceContext::new(pool, &settings));
    Ok((ctx, settings))
}

/// A tiny but valid PNG header followed by `seed`, so distinct seeds give distinct hashes.
pub fn png_bytes(seed: &str) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(seed.as_bytes());
    bytes
}
