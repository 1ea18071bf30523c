//! Ticket lifecycle service.
//!
//! [`TicketService`] is the only component that mutates tickets or the counter.
//! It combines a [`TicketStore`] with a [`Clock`] and the lifecycle timing in
//! [`LifecycleConfig`].
//!
//! # Expiry
//!
//! Expiry is lazy: a pending ticket past its TTL is marked expired the next
//! time it is read through [`TicketService::get_ticket`] (or re-requested).
//! There is no sweep, so [`TicketService::list_active`] (which filters on
//! `expires_at`) and a single-ticket read can disagree about a ticket nobody
//! has looked at since it ran out. The age-based purge in
//! [`TicketService::cleanup_expired`] is a separate mechanism and deletes by
//! `created_at` only.
//!
//! # Reset isolation
//!
//! Resets are serialised against every mutating operation through an
//! in-process `RwLock` gate: issuance and transitions hold the read side,
//! [`TicketService::reset_all`] holds the write side. A reset therefore never
//! interleaves with an in-flight issue, and no ticket from the old epoch
//! survives it. The gate is per process; running several server instances
//! against one database reintroduces the race.

use crate::config::{self, LifecycleConfig};
use crate::environment::Clock;
use crate::error::{Result, TicketError};
use crate::store::TicketStore;
use crate::ticket::{
    NewTicket, SessionKey, Ticket, TicketId, TicketStats, TicketStatus, TicketView,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Orchestrates counter and store to implement the ticket lifecycle.
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
    reset_gate: RwLock<()>,
}

impl TicketService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>, config: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            config,
            reset_gate: RwLock::new(()),
        }
    }

    /// Lifecycle timing in use.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Current time according to the service clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Render a ticket for clients as of now.
    #[must_use]
    pub fn view(&self, ticket: &Ticket) -> TicketView {
        TicketView::at(ticket, self.clock.now())
    }

    /// Issue a ticket, or hand back the session's pending one.
    ///
    /// - With a session key that holds a pending, unexpired ticket: that ticket,
    ///   unchanged.
    /// - With a session key whose latest ticket is terminal (or just ran out,
    ///   in which case it is marked expired first): a new ticket under the same key.
    /// - Without a session key: a new ticket under a freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails, or `SessionConflict` in the rare
    /// case where a concurrent request won the session and its ticket already
    /// ran out.
    pub async fn request_ticket(&self, session_key: Option<SessionKey>) -> Result<Ticket> {
        let _gate = self.reset_gate.read().await;

        let session_key = match session_key {
            Some(key) => {
                if let Some(existing) = self.latest_refreshed(&key).await? {
                    if existing.is_pending() {
                        tracing::debug!(
                            ticket_id = %existing.id,
                            number = %existing.number,
                            session = key.redacted(),
                            "Returning existing pending ticket"
                        );
                        return Ok(existing);
                    }
                }
                key
            }
            None => SessionKey::generate(),
        };

        self.issue(session_key).await
    }

    /// Latest ticket for a session, with lazy expiry applied.
    ///
    /// A pending ticket read after its `expires_at` is persisted as expired
    /// and returned with status `Expired`; later reads stay expired.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the session has no ticket
    /// - `Storage`: the store failed
    pub async fn get_ticket(&self, session_key: &SessionKey) -> Result<Ticket> {
        let _gate = self.reset_gate.read().await;
        self.latest_refreshed(session_key)
            .await?
            .ok_or(TicketError::NotFound)
    }

    /// Like [`get_ticket`](Self::get_ticket), but terminal tickets become errors.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the session has no ticket
    /// - `Expired` / `Completed`: the session's ticket is terminal
    /// - `Storage`: the store failed
    pub async fn current_ticket(&self, session_key: &SessionKey) -> Result<Ticket> {
        let ticket = self.get_ticket(session_key).await?;
        match ticket.status {
            TicketStatus::Pending => Ok(ticket),
            TicketStatus::Expired => Err(TicketError::Expired(ticket.number)),
            TicketStatus::Completed => Err(TicketError::Completed(ticket.number)),
        }
    }

    /// Cancel the session's pending ticket by expiring it.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the session has no ticket
    /// - `InvalidTransition`: the ticket is not pending (lazy expiry counts)
    /// - `Storage`: the store failed
    pub async fn cancel_ticket(&self, session_key: &SessionKey) -> Result<Ticket> {
        let _gate = self.reset_gate.read().await;

        let mut ticket = self
            .latest_refreshed(session_key)
            .await?
            .ok_or(TicketError::NotFound)?;
        self.move_pending(&mut ticket, TicketStatus::Expired).await?;

        metrics::counter!("take_a_number_tickets_expired_total", "reason" => "cancelled")
            .increment(1);
        tracing::info!(
            ticket_id = %ticket.id,
            number = %ticket.number,
            session = session_key.redacted(),
            "Ticket cancelled"
        );
        Ok(ticket)
    }

    /// Pending tickets whose `expires_at` is still in the future, by number.
    ///
    /// Tickets that ran out but were never read are excluded here even though
    /// they are still stored as pending.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn list_active(&self) -> Result<Vec<Ticket>> {
        self.store.list_active(self.clock.now()).await
    }

    /// Mark a pending ticket completed.
    ///
    /// Returns `false`, changing nothing, if the ticket is missing or not pending.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn complete(&self, id: TicketId) -> Result<bool> {
        let _gate = self.reset_gate.read().await;

        let completed = self
            .store
            .transition_status(id, TicketStatus::Pending, TicketStatus::Completed)
            .await?;
        if completed {
            metrics::counter!("take_a_number_tickets_completed_total").increment(1);
            tracing::info!(ticket_id = %id, "Ticket completed");
        }
        Ok(completed)
    }

    /// Mark a pending ticket completed, reporting why it could not be.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no ticket has this id
    /// - `InvalidTransition`: the ticket is not pending
    /// - `Storage`: the store failed
    pub async fn complete_ticket(&self, id: TicketId) -> Result<Ticket> {
        let _gate = self.reset_gate.read().await;

        let mut ticket = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(TicketError::NotFound)?;
        self.move_pending(&mut ticket, TicketStatus::Completed).await?;

        metrics::counter!("take_a_number_tickets_completed_total").increment(1);
        tracing::info!(ticket_id = %ticket.id, number = %ticket.number, "Ticket completed");
        Ok(ticket)
    }

    /// Force a ticket to expired, whatever its status. Idempotent.
    ///
    /// Returns `false` only if no ticket has this id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn expire(&self, id: TicketId) -> Result<bool> {
        let _gate = self.reset_gate.read().await;

        let expired = self.store.force_status(id, TicketStatus::Expired).await?;
        if expired {
            metrics::counter!("take_a_number_tickets_expired_total", "reason" => "forced")
                .increment(1);
            tracing::info!(ticket_id = %id, "Ticket expired");
        }
        Ok(expired)
    }

    /// Delete every ticket and restart numbering at 1.
    ///
    /// Waits for in-flight issues and transitions to finish and blocks new
    /// ones until the reset is done. Returns the number of tickets deleted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails; the store guarantees nothing was
    /// changed in that case.
    pub async fn reset_all(&self) -> Result<u64> {
        let _gate = self.reset_gate.write().await;

        let cleared = self.store.reset().await?;
        metrics::counter!("take_a_number_resets_total").increment(1);
        tracing::info!(tickets_cleared = cleared, "All tickets reset, numbering restarts at 001");
        Ok(cleared)
    }

    /// Delete tickets older than `max_age_hours` (configured default if `None`),
    /// whatever their status. Returns the number deleted.
    ///
    /// Thresholds beyond a century are treated as a century.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn cleanup_expired(&self, max_age_hours: Option<u32>) -> Result<u64> {
        let max_age = max_age_hours.map_or_else(
            || self.config.cleanup_max_age(),
            |hours| config::max_age(i64::from(hours)),
        );
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) else {
            tracing::debug!(?max_age, "Cleanup threshold predates every ticket");
            return Ok(0);
        };

        let deleted = self.store.delete_created_before(cutoff).await?;
        if deleted > 0 {
            metrics::counter!("take_a_number_tickets_purged_total").increment(deleted);
            tracing::info!(deleted, cutoff = %cutoff, "Cleaned up old tickets");
        } else {
            tracing::debug!(cutoff = %cutoff, "Cleanup found nothing to delete");
        }
        Ok(deleted)
    }

    /// Counts by status.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn stats(&self) -> Result<TicketStats> {
        self.store.stats().await
    }

    /// Readiness check against the store.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    async fn issue(&self, session_key: SessionKey) -> Result<Ticket> {
        let now = self.clock.now();
        let draft = NewTicket {
            session_key,
            created_at: now,
            expires_at: now
                .checked_add_signed(self.config.ttl())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        match self.store.issue_ticket(draft).await {
            Ok(ticket) => {
                metrics::counter!("take_a_number_tickets_issued_total").increment(1);
                tracing::info!(
                    ticket_id = %ticket.id,
                    number = %ticket.number,
                    session = ticket.session_key.redacted(),
                    expires_at = %ticket.expires_at,
                    "Ticket issued"
                );
                Ok(ticket)
            }
            Err(TicketError::SessionConflict(key)) => {
                tracing::warn!(
                    session = key.redacted(),
                    "Concurrent request already issued a ticket for this session"
                );
                match self.latest_refreshed(&key).await? {
                    Some(winner) if winner.is_pending() => Ok(winner),
                    _ => Err(TicketError::SessionConflict(key)),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Latest ticket for the session with lazy expiry applied. Caller holds the gate.
    async fn latest_refreshed(&self, session_key: &SessionKey) -> Result<Option<Ticket>> {
        match self.store.find_latest_by_session(session_key).await? {
            Some(ticket) => self.expire_if_due(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    async fn expire_if_due(&self, mut ticket: Ticket) -> Result<Ticket> {
        if !ticket.is_pending() || !ticket.is_past_expiry(self.clock.now()) {
            return Ok(ticket);
        }

        let expired = self
            .store
            .transition_status(ticket.id, TicketStatus::Pending, TicketStatus::Expired)
            .await?;
        if expired {
            metrics::counter!("take_a_number_tickets_expired_total", "reason" => "ttl")
                .increment(1);
            tracing::debug!(ticket_id = %ticket.id, number = %ticket.number, "Ticket lazily expired");
            ticket.status = TicketStatus::Expired;
            return Ok(ticket);
        }

        // Someone else moved it first; report what is stored now.
        self.store
            .find_by_id(ticket.id)
            .await?
            .ok_or(TicketError::NotFound)
    }

    /// Conditionally move a pending ticket to `to`, updating it in place.
    async fn move_pending(&self, ticket: &mut Ticket, to: TicketStatus) -> Result<()> {
        let id = ticket.id;
        let invalid = |from: TicketStatus| TicketError::InvalidTransition { id, from, to };

        if !ticket.is_pending() {
            return Err(invalid(ticket.status));
        }

        if self
            .store
            .transition_status(id, TicketStatus::Pending, to)
            .await?
        {
            ticket.status = to;
            return Ok(());
        }

        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(TicketError::NotFound)?;
        Err(invalid(current.status))
    }
}
