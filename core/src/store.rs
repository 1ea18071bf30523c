//! Ticket store trait.
//!
//! The store owns both the ticket records and the singleton sequence counter.
//! It exposes just enough to implement the lifecycle:
//!
//! - Issue a ticket (counter increment + insert as one atomic step)
//! - Point lookups by id and by session (most recent)
//! - Predicate queries (active tickets, aged-out tickets, counts)
//! - Conditional and forced status updates
//! - Delete-all plus counter reset as one atomic step
//!
//! # Implementations
//!
//! - `PostgresTicketStore` (in `take-a-number-postgres`): production
//! - `InMemoryTicketStore` (in `take-a-number-testing`): fast, deterministic tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so that the
//! service can hold an `Arc<dyn TicketStore>` chosen at startup.

use crate::error::Result;
use crate::ticket::{NewTicket, SessionKey, Ticket, TicketId, TicketStats, TicketStatus};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every [`TicketStore`] method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable storage for tickets and the ticket counter.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// concurrent request handler.
pub trait TicketStore: Send + Sync {
    /// Assign the next number and persist a pending ticket.
    ///
    /// The counter increment and the insert must succeed or fail together:
    /// two concurrent calls never receive the same number, and a failed insert
    /// does not consume one.
    ///
    /// # Errors
    ///
    /// - `SessionConflict`: the session already has a pending ticket
    /// - `Storage`: persistence failed
    fn issue_ticket(&self, draft: NewTicket) -> StoreFuture<'_, Ticket>;

    /// Fetch a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lookup fails.
    fn find_by_id(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>>;

    /// Fetch the most recently created ticket for a session.
    ///
    /// Ties on `created_at` are broken by the higher id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lookup fails.
    fn find_latest_by_session<'a>(
        &'a self,
        session_key: &'a SessionKey,
    ) -> StoreFuture<'a, Option<Ticket>>;

    /// Pending tickets with `expires_at > now`, ascending by number.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    fn list_active(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<Ticket>>;

    /// Set `to` only if the ticket currently has status `from`.
    ///
    /// Returns `true` if a row changed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the update fails.
    fn transition_status(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> StoreFuture<'_, bool>;

    /// Set `to` regardless of the current status.
    ///
    /// Returns `false` only if no ticket has this id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the update fails.
    fn force_status(&self, id: TicketId, to: TicketStatus) -> StoreFuture<'_, bool>;

    /// Delete every ticket and set the counter back to 0, atomically.
    ///
    /// Returns the number of tickets deleted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the reset fails; nothing is changed in that case.
    fn reset(&self) -> StoreFuture<'_, u64>;

    /// Delete tickets created strictly before `cutoff`, whatever their status.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the delete fails.
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, u64>;

    /// Count tickets by status.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    fn stats(&self) -> StoreFuture<'_, TicketStats>;

    /// Cheap round trip used by readiness probes.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
