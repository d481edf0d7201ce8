use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool, PoolError};
use diesel::RunQueryDsl;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Server-side bound on every statement, so work the caller has stopped
/// waiting for is cancelled by Postgres instead of running to completion.
#[derive(Debug, Clone, Copy)]
struct StatementTimeout(Duration);

impl CustomizeConnection<PgConnection, R2d2Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), R2d2Error> {
        diesel::sql_query(format!("SET statement_timeout = {}", self.0.as_millis()))
            .execute(conn)
            .map(|_| ())
            .map_err(R2d2Error::QueryError)
    }
}

/// `timeout` bounds both checkout and each statement.
pub fn create_pool(database_url: &str, max_size: u32, timeout: Duration) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(2.min(max_size)))
        .connection_timeout(timeout)
        .test_on_check_out(true)
        .connection_customizer(Box::new(StatementTimeout(timeout)))
        .build(manager)?;

    tracing::info!(max_size, statement_timeout_ms = timeout.as_millis() as u64, "database connection pool created");
    Ok(pool)
}
