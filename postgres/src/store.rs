//! `PostgreSQL` implementation of [`TicketStore`].
//!
//! Tables are created by the migrations embedded from `./migrations`:
//! `ticket_counter` (single row, `id = 1`) and `tickets`.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use take_a_number_core::store::StoreFuture;
use take_a_number_core::{
    NewTicket, Result, SessionKey, Ticket, TicketError, TicketId, TicketNumber, TicketStats,
    TicketStatus, TicketStore,
};

/// Partial unique index allowing one pending ticket per session.
const PENDING_SESSION_INDEX: &str = "idx_tickets_pending_session";

const TICKET_COLUMNS: &str =
    "id, ticket_number, session_key, status, created_at, expires_at";

/// `PostgreSQL`-backed ticket store.
///
/// Cloning is cheap: clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use take_a_number_core::{LifecycleConfig, SystemClock, TicketService};
/// use take_a_number_postgres::PostgresTicketStore;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresTicketStore::from_pool(pool);
/// store.migrate().await?;
///
/// let service = TicketService::new(
///     Arc::new(store),
///     Arc::new(SystemClock),
///     LifecycleConfig::default(),
/// );
/// let ticket = service.request_ticket(None).await?;
/// println!("now serving... you are {}", ticket.number);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Connect to `database_url` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the connection cannot be established.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| storage_error("connect", &e))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TicketError::Storage(format!("migration failed: {e}")))?;
        tracing::info!("Ticket store migrations applied");
        Ok(())
    }
}

fn storage_error(operation: &'static str, error: &sqlx::Error) -> TicketError {
    tracing::error!(operation, error = %error, "Ticket store query failed");
    metrics::counter!("take_a_number_store_errors_total", "operation" => operation).increment(1);
    TicketError::Storage(format!("{operation}: {error}"))
}

fn is_pending_session_violation(error: &sqlx::Error) -> bool {
    error.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some(PENDING_SESSION_INDEX)
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    let read = |e: sqlx::Error| TicketError::Storage(format!("malformed ticket row: {e}"));

    let number: i64 = row.try_get("ticket_number").map_err(read)?;
    let number = u64::try_from(number)
        .map_err(|_| TicketError::Storage(format!("negative ticket number: {number}")))?;
    let session_key: String = row.try_get("session_key").map_err(read)?;
    let status: String = row.try_get("status").map_err(read)?;

    Ok(Ticket {
        id: TicketId::new(row.try_get("id").map_err(read)?),
        number: TicketNumber::new(number),
        session_key: SessionKey::parse(session_key)
            .map_err(|e| TicketError::Storage(format!("stored session key rejected: {e}")))?,
        status: TicketStatus::parse(&status)?,
        created_at: row.try_get("created_at").map_err(read)?,
        expires_at: row.try_get("expires_at").map_err(read)?,
    })
}

fn count(row: &PgRow, column: &str) -> Result<u64> {
    let value: i64 = row
        .try_get(column)
        .map_err(|e| TicketError::Storage(format!("malformed stats row: {e}")))?;
    Ok(u64::try_from(value).unwrap_or(0))
}

impl TicketStore for PostgresTicketStore {
    fn issue_ticket(&self, draft: NewTicket) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error("issue_ticket", &e))?;

            // Row lock on the counter serializes concurrent issues.
            let number: i64 = sqlx::query_scalar(
                r"
                UPDATE ticket_counter
                SET current_number = current_number + 1, updated_at = now()
                WHERE id = 1
                RETURNING current_number
                ",
            )
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| storage_error("issue_ticket", &e))?;

            let row = sqlx::query(&format!(
                r"
                INSERT INTO tickets (ticket_number, session_key, status, created_at, expires_at)
                VALUES ($1, $2, 'pending', $3, $4)
                RETURNING {TICKET_COLUMNS}
                "
            ))
            .bind(number)
            .bind(draft.session_key.as_str())
            .bind(draft.created_at)
            .bind(draft.expires_at)
            .fetch_one(&mut *tx)
            .await;

            // Dropping `tx` on an error path rolls back the counter increment.
            let row = match row {
                Ok(row) => row,
                Err(e) if is_pending_session_violation(&e) => {
                    tracing::debug!(
                        session = draft.session_key.redacted(),
                        "Concurrent issue for session lost the race"
                    );
                    return Err(TicketError::SessionConflict(draft.session_key));
                }
                Err(e) => return Err(storage_error("issue_ticket", &e)),
            };

            tx.commit()
                .await
                .map_err(|e| storage_error("issue_ticket", &e))?;

            ticket_from_row(&row)
        })
    }

    fn find_by_id(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("find_by_id", &e))?
                .as_ref()
                .map(ticket_from_row)
                .transpose()
        })
    }

    fn find_latest_by_session<'a>(
        &'a self,
        session_key: &'a SessionKey,
    ) -> StoreFuture<'a, Option<Ticket>> {
        Box::pin(async move {
            sqlx::query(&format!(
                r"
                SELECT {TICKET_COLUMNS} FROM tickets
                WHERE session_key = $1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "
            ))
            .bind(session_key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find_latest_by_session", &e))?
            .as_ref()
            .map(ticket_from_row)
            .transpose()
        })
    }

    fn list_active(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            sqlx::query(&format!(
                r"
                SELECT {TICKET_COLUMNS} FROM tickets
                WHERE status = 'pending' AND expires_at > $1
                ORDER BY ticket_number ASC
                "
            ))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list_active", &e))?
            .iter()
            .map(ticket_from_row)
            .collect()
        })
    }

    fn transition_status(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE tickets SET status = $3, updated_at = now() WHERE id = $1 AND status = $2",
            )
            .bind(id.value())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("transition_status", &e))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn force_status(&self, id: TicketId, to: TicketStatus) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE tickets SET status = $2, updated_at = now() WHERE id = $1")
                    .bind(id.value())
                    .bind(to.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| storage_error("force_status", &e))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn reset(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error("reset", &e))?;

            // Take the counter row lock first so in-flight issues finish or wait.
            sqlx::query("SELECT current_number FROM ticket_counter WHERE id = 1 FOR UPDATE")
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("reset", &e))?;

            let deleted = sqlx::query("DELETE FROM tickets")
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("reset", &e))?
                .rows_affected();

            sqlx::query(
                "UPDATE ticket_counter SET current_number = 0, updated_at = now() WHERE id = 1",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("reset", &e))?;

            tx.commit().await.map_err(|e| storage_error("reset", &e))?;

            tracing::info!(deleted, "Ticket store reset");
            Ok(deleted)
        })
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM tickets WHERE created_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("delete_created_before", &e))?;
            Ok(result.rows_affected())
        })
    }

    fn stats(&self) -> StoreFuture<'_, TicketStats> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                    COUNT(*) FILTER (WHERE status = 'expired') AS expired
                FROM tickets
                ",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("stats", &e))?;

            Ok(TicketStats {
                total: count(&row, "total")?,
                pending: count(&row, "pending")?,
                completed: count(&row, "completed")?,
                expired: count(&row, "expired")?,
            })
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("ping", &e))?;
            Ok(())
        })
    }
}
