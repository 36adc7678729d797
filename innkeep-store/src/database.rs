use innkeep_core::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Maps constraint failures on the booking write path.
///
/// `23P01` is the no-overlap exclusion constraint, `23505` on the session index a
/// replayed payment confirmation. Everything else, including transient aborts
/// that outlived their retries, is a backend failure and never a room conflict.
pub(crate) fn map_write_error(err: sqlx::Error, session_id: Option<&str>) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23P01") => return StoreError::Conflict,
            Some("23505") if db.constraint() == Some(SESSION_UNIQUE_INDEX) => {
                return StoreError::DuplicateSession(session_id.unwrap_or_default().to_string());
            }
            _ => {}
        }
    }
    backend(err)
}

/// Serialization failure or deadlock: the statement lost a race, not the room.
pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}

const SESSION_UNIQUE_INDEX: &str = "bookings_payment_session_uq";
