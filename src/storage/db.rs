use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::storage::migration::Migrator;

/// Connects to SQLite and brings the schema up to date.
///
/// Accepts `sqlite::memory:` or `sqlite://<path>`; for file URLs the parent
/// directory and the file are created when missing.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    tracing::info!("Connecting to database: {}", database_url);

    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    if database_url == "sqlite::memory:" {
        // every pooled connection would otherwise open its own empty database
        options.max_connections(1).min_connections(1);
    } else if let Some(path_str) = database_url.strip_prefix("sqlite://") {
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let path = std::path::Path::new(path_str);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbErr::Custom(format!("Failed to create DB directory: {}", e)))?;
                tracing::info!("Created database directory: {}", parent.display());
            }
        }

        if !path.exists() {
            std::fs::File::create(path)
                .map_err(|e| DbErr::Custom(format!("Failed to create DB file: {}", e)))?;
            tracing::info!("Created database file: {}", path.display());
        }
    } else {
        return Err(DbErr::Custom("Invalid SQLite URL format".to_string()));
    }

    let db = Database::connect(options)
        .await
        .map_err(|e| DbErr::Custom(format!("Connection failed: {}", e)))?;

    tracing::info!("Applying migrations...");
    Migrator::up(&db, None).await?;

    Ok(db)
}
