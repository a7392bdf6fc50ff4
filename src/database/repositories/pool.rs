//! Pool repository implementation

use std::time::{Duration, Instant};

use sqlx::{PgPool, Postgres, Transaction};
use chrono::Utc;
use tracing::debug;
use crate::models::pool::{Pool, PoolAttendee, NewAssignment, PoolAssignment};
use crate::utils::errors::{StoreError, StoreResult};
use crate::utils::logging::log_database_operation;

const POOL_COLUMNS: &str = "id, name, capacity, is_active, meet_link, event_id, trainer_id, created_at, updated_at";
const ATTENDEE_COLUMNS: &str = "id, pool_id, user_id, notified, meet_link, created_at";

/// Bounds applied to the assignment transaction
#[derive(Debug, Clone, Copy)]
pub struct TransactionLimits {
    /// Whole-transaction deadline
    pub timeout: Duration,
    /// Wait for a connection and for row locks
    pub lock_wait: Duration,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            lock_wait: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct PoolRepository {
    pool: PgPool,
    limits: TransactionLimits,
}

impl PoolRepository {
    pub fn new(pool: PgPool, limits: TransactionLimits) -> Self {
        Self { pool, limits }
    }

    /// Pools of an event ordered by creation
    pub async fn get_event_pools(&self, event_id: i64) -> StoreResult<Vec<Pool>> {
        let pools = sqlx::query_as::<_, Pool>(&format!(
            "SELECT {POOL_COLUMNS} FROM pools WHERE event_id = $1 ORDER BY id ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pools)
    }

    /// Attendees of the given pools
    pub async fn get_attendees(&self, pool_ids: &[i64]) -> StoreResult<Vec<PoolAttendee>> {
        let attendees = sqlx::query_as::<_, PoolAttendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM pool_attendees WHERE pool_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(pool_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(attendees)
    }

    /// Backfill the pool trainer when none is set
    pub async fn set_trainer_if_unset(&self, pool_id: i64, trainer_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE pools SET trainer_id = $2, updated_at = $3 WHERE id = $1 AND trainer_id IS NULL")
            .bind(pool_id)
            .bind(trainer_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Write the pool, its attendees and the assigned flag in one serializable transaction
    pub async fn commit_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment> {
        let started = Instant::now();
        let timeout_secs = self.limits.timeout.as_secs();

        let result = match tokio::time::timeout(self.limits.timeout, self.run_assignment(assignment)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(timeout_secs)),
        };

        log_database_operation(
            "commit_assignment",
            "pools",
            started.elapsed().as_millis() as u64,
            result.is_ok(),
        );
        result
    }

    async fn run_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment> {
        let mut tx = match tokio::time::timeout(self.limits.lock_wait, self.pool.begin()).await {
            Ok(tx) => tx?,
            Err(_) => return Err(StoreError::Timeout(self.limits.lock_wait.as_secs())),
        };

        self.configure(&mut tx).await?;

        let event_id = assignment.event_id;
        let locked: Option<(bool,)> = sqlx::query_as("SELECT pools_assigned FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_transaction_error)?;

        match locked {
            None => return Err(StoreError::EventNotFound { event_id }),
            Some((true,)) => return Err(StoreError::AlreadyAssigned { event_id }),
            Some((false,)) => {}
        }

        let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pools WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_transaction_error)?;
        if existing.0 > 0 {
            return Err(StoreError::AlreadyAssigned { event_id });
        }

        let now = Utc::now();
        let pool = sqlx::query_as::<_, Pool>(&format!(
            r#"
            INSERT INTO pools (name, capacity, is_active, meet_link, event_id, trainer_id, created_at, updated_at)
            VALUES ($1, $2, TRUE, $3, $4, $5, $6, $6)
            RETURNING {POOL_COLUMNS}
            "#
        ))
        .bind(&assignment.pool_name)
        .bind(assignment.capacity)
        .bind(&assignment.meet_link)
        .bind(event_id)
        .bind(assignment.trainer_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_transaction_error)?;

        let user_ids: Vec<i64> = assignment.attendees.iter().map(|a| a.user_id).collect();
        let links: Vec<Option<String>> = assignment.attendees.iter().map(|a| a.meet_link.clone()).collect();
        let attendees = sqlx::query_as::<_, PoolAttendee>(&format!(
            r#"
            INSERT INTO pool_attendees (pool_id, user_id, notified, meet_link, created_at)
            SELECT $1, attendee.user_id, FALSE, attendee.meet_link, $4
            FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS attendee(user_id, meet_link)
            RETURNING {ATTENDEE_COLUMNS}
            "#
        ))
        .bind(pool.id)
        .bind(&user_ids)
        .bind(&links)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_transaction_error)?;

        let claimed = sqlx::query("UPDATE events SET pools_assigned = TRUE, updated_at = $2 WHERE id = $1 AND pools_assigned = FALSE")
            .bind(event_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_transaction_error)?;
        if claimed.rows_affected() != 1 {
            return Err(StoreError::AlreadyAssigned { event_id });
        }

        tx.commit().await.map_err(map_transaction_error)?;

        debug!(event_id = event_id, pool_id = pool.id, attendees = attendees.len(), "Assignment committed");
        Ok(PoolAssignment { pool, attendees })
    }

    async fn configure(&self, tx: &mut Transaction<'_, Postgres>) -> StoreResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.limits.lock_wait.as_millis()))
            .execute(&mut **tx)
            .await?;
        sqlx::query(&format!("SET LOCAL statement_timeout = '{}ms'", self.limits.timeout.as_millis()))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Translate Postgres concurrency failures into store errors
fn map_transaction_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        match db_error.code().as_deref() {
            // serialization_failure, lock_not_available
            Some("40001") | Some("55P03") => return StoreError::Conflict(db_error.message().to_string()),
            // query_canceled by statement_timeout
            Some("57014") => return StoreError::Timeout(0),
            _ => {}
        }
    }
    StoreError::Database(error)
}
