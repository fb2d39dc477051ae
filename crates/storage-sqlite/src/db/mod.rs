//! Connection pool, migrations and the single-writer actor.
//!
//! SQLite allows many readers but a single writer. Reads go straight to the
//! pool; every mutation is funneled through [`WriteHandle`] so writes are
//! serialized on one dedicated connection.

mod write_actor;

pub use write_actor::{spawn_writer, WriteHandle};

use std::path::Path;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use shoplink_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct SqliteCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqliteCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool for the database at `db_path`, creating parent
/// directories on first run.
pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::Database(DatabaseError::Internal(format!(
                    "Failed to create database directory: {}",
                    err
                )))
            })?;
        }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(SqliteCustomizer))
        .build(manager)
        .map_err(|err| Error::Database(DatabaseError::Pool(err.to_string())))?;

    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(|err| Error::Database(DatabaseError::Pool(err.to_string())))
}

/// Applies any pending embedded migrations.
pub fn run_migrations(pool: &Arc<DbPool>) -> Result<()> {
    let mut conn = get_connection(pool)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| StorageError::Migration(err.to_string()))?;
    if !applied.is_empty() {
        info!("Applied {} database migration(s)", applied.len());
    }
    Ok(())
}

/// Convenience for tests and embedders: pool + migrations + writer in one call.
pub fn init(db_path: &str) -> Result<(Arc<DbPool>, WriteHandle)> {
    let pool = create_pool(db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer(pool.clone());
    Ok((pool, writer))
}
