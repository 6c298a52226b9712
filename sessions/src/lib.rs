use macrolog_config::Config;
use sqlx::migrate::MigrateDatabase as _;
use sqlx::{Sqlite, sqlite::SqlitePoolOptions};

pub use sqlx::SqlitePool as DbPool;

/// Custom migrator set to the correct path within the api testing environment
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// The persisted session record and the structured payload it carries.
pub mod session;
/// The session lifecycle contract and its SQL-backed implementation.
pub mod store;

pub use session::{SessionCookie, SessionData, SessionRecord};
pub use store::{DEFAULT_TTL_MS, SessionLifecycle, SessionStore};

/// Creates a connection pool to the database specified in the passed [`macrolog_config::DatabaseConfig`]
pub async fn connect_pool(config: &Config) -> Result<DbPool, Error> {
    let pool = SqlitePoolOptions::new()
        .connect(&config.database.url)
        .await?;

    Ok(pool)
}

/// Create a database if it does not exist.
/// Used for parts of app where dbs are created
/// at runtime, e.g. tests, workers, tenants.
pub async fn create_database_if_not_exists(config: &Config) -> Result<(), Error> {
    if !Sqlite::database_exists(&config.database.url).await? {
        Sqlite::create_database(&config.database.url).await?
    };
    Ok(())
}

/// Errors that can occur as a result of a session store operation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The `session_store` table does not exist. Only produced by
    /// [`SessionStore::init`]'s schema probe; the remediation is
    /// operational, not programmatic.
    #[error("session table is missing: apply database migrations before serving traffic")]
    SchemaMissing(#[source] sqlx::Error),
    /// General database error, e.g. communicating with the database failed.
    /// The driver's message is preserved unmodified in the source chain.
    #[error("database query failed")]
    Database(#[from] sqlx::Error),
    /// A stored session payload could not be decoded back into structured
    /// data. A corrupt row is an actionable anomaly, so this is never masked.
    #[error("session payload could not be decoded")]
    Serialization(#[from] serde_json::Error),
}
