//! Dedicated writer thread. All mutations run as jobs on one connection,
//! each wrapped in an IMMEDIATE transaction.

use diesel::SqliteConnection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use shoplink_core::errors::{DatabaseError, Error, Result};

use super::{get_connection, DbPool};

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

// Transactions need `E: From<diesel::result::Error>` for rollback plumbing;
// the application error type deliberately has no such impl, so the two are
// kept apart until the transaction closes.
enum TxError {
    App(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

impl From<TxError> for Error {
    fn from(err: TxError) -> Self {
        match err {
            TxError::App(inner) => inner,
            TxError::Diesel(inner) => crate::errors::StorageError::from(inner).into(),
        }
    }
}

impl WriteHandle {
    /// Runs `job` on the writer connection inside an IMMEDIATE transaction
    /// and returns its result.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel::<Result<T>>();

        let wrapped: WriteJob = Box::new(move |conn: &mut SqliteConnection| {
            let outcome = conn
                .immediate_transaction::<T, TxError, _>(|tx| job(tx).map_err(TxError::App))
                .map_err(Error::from);
            // Receiver dropped means the caller gave up; nothing left to do.
            let _ = result_tx.send(outcome);
        });

        self.tx.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer is not running".to_string(),
            ))
        })?;

        result_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer dropped the job".to_string(),
            ))
        })?
    }
}

/// Spawns the writer thread and returns its handle. The thread exits when
/// the last handle is dropped.
pub fn spawn_writer(pool: std::sync::Arc<DbPool>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();

    std::thread::Builder::new()
        .name("shoplink-db-writer".to_string())
        .spawn(move || {
            let mut conn = match get_connection(&pool) {
                Ok(conn) => conn,
                Err(err) => {
                    error!("Writer failed to acquire a connection: {}", err);
                    return;
                }
            };
            while let Some(job) = rx.blocking_recv() {
                job(&mut conn);
            }
        })
        .expect("failed to spawn database writer thread");

    WriteHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use diesel::prelude::*;

    #[tokio::test]
    async fn writer_executes_jobs_and_returns_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writer.db");
        let (_pool, writer) = db::init(path.to_str().unwrap()).unwrap();

        let answer = writer
            .exec(|conn| {
                diesel::sql_query("SELECT 1")
                    .execute(conn)
                    .map_err(crate::errors::StorageError::from)?;
                Ok(41 + 1)
            })
            .await
            .unwrap();
        assert_eq!(answer, 42);
    }

    #[tokio::test]
    async fn writer_job_errors_roll_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollback.db");
        let (pool, writer) = db::init(path.to_str().unwrap()).unwrap();

        let result: Result<()> = writer
            .exec(|conn| {
                diesel::sql_query(
                    "INSERT INTO product_categories (id, name, created_at, updated_at) \
                     VALUES ('c1', 'Drinks', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                )
                .execute(conn)
                .map_err(crate::errors::StorageError::from)?;
                Err(shoplink_core::Error::Unexpected("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        use crate::schema::product_categories::dsl::*;
        let mut conn = db::get_connection(&pool).unwrap();
        let count: i64 = product_categories.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }
}
