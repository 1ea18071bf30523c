//! In-memory ticket store.
//!
//! Tickets and the counter live behind one mutex, so `issue_ticket` and
//! `reset` are trivially atomic. `set_unavailable` makes every call fail with
//! a storage error, for exercising error propagation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use take_a_number_core::store::StoreFuture;
use take_a_number_core::{
    NewTicket, Result, SequenceCounter, SessionKey, Ticket, TicketError, TicketId, TicketStats,
    TicketStatus, TicketStore,
};

#[derive(Debug, Default)]
struct State {
    counter: SequenceCounter,
    last_id: i64,
    tickets: BTreeMap<TicketId, Ticket>,
}

/// In-memory ticket store for fast, deterministic testing.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use take_a_number_core::{NewTicket, SessionKey, TicketNumber, TicketStore};
/// use take_a_number_testing::{test_clock, InMemoryTicketStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryTicketStore::new();
/// let now = test_clock().time();
/// let ticket = store
///     .issue_ticket(NewTicket {
///         session_key: SessionKey::generate(),
///         created_at: now,
///         expires_at: now,
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(ticket.number, TicketNumber::new(1));
/// assert_eq!(store.current_number().unwrap(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    state: Arc<Mutex<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryTicketStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `TicketError::Storage` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Counter cursor: last number handed out in this epoch.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store is unavailable.
    pub fn current_number(&self) -> Result<u64> {
        Ok(self.lock()?.counter.current())
    }

    /// Number of stored tickets.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store is unavailable.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.tickets.len())
    }

    /// `true` if no tickets are stored.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store is unavailable.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.tickets.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TicketError::Storage("store unavailable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| TicketError::Storage("Mutex lock failed".to_string()))
    }
}

impl TicketStore for InMemoryTicketStore {
    fn issue_ticket(&self, draft: NewTicket) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut state = self.lock()?;

            let holds_pending = state
                .tickets
                .values()
                .any(|t| t.is_pending() && t.session_key == draft.session_key);
            if holds_pending {
                return Err(TicketError::SessionConflict(draft.session_key));
            }

            let number = state.counter.next()?;
            state.last_id += 1;
            let ticket = Ticket {
                id: TicketId::new(state.last_id),
                number,
                session_key: draft.session_key,
                status: TicketStatus::Pending,
                created_at: draft.created_at,
                expires_at: draft.expires_at,
            };
            state.tickets.insert(ticket.id, ticket.clone());
            Ok(ticket)
        })
    }

    fn find_by_id(&self, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move { Ok(self.lock()?.tickets.get(&id).cloned()) })
    }

    fn find_latest_by_session<'a>(
        &'a self,
        session_key: &'a SessionKey,
    ) -> StoreFuture<'a, Option<Ticket>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .tickets
                .values()
                .filter(|t| &t.session_key == session_key)
                .max_by_key(|t| (t.created_at, t.id))
                .cloned())
        })
    }

    fn list_active(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let mut active: Vec<Ticket> = self
                .lock()?
                .tickets
                .values()
                .filter(|t| t.is_pending() && t.expires_at > now)
                .cloned()
                .collect();
            active.sort_by_key(|t| t.number);
            Ok(active)
        })
    }

    fn transition_status(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    ) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.lock()?;
            match state.tickets.get_mut(&id) {
                Some(ticket) if ticket.status == from => {
                    ticket.status = to;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn force_status(&self, id: TicketId, to: TicketStatus) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.lock()?;
            Ok(state.tickets.get_mut(&id).is_some_and(|ticket| {
                ticket.status = to;
                true
            }))
        })
    }

    fn reset(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.lock()?;
            let cleared = state.tickets.len() as u64;
            state.tickets.clear();
            state.counter.reset();
            Ok(cleared)
        })
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.lock()?;
            let before = state.tickets.len();
            state.tickets.retain(|_, t| t.created_at >= cutoff);
            Ok((before - state.tickets.len()) as u64)
        })
    }

    fn stats(&self) -> StoreFuture<'_, TicketStats> {
        Box::pin(async move {
            let state = self.lock()?;
            let count = |status: TicketStatus| {
                state.tickets.values().filter(|t| t.status == status).count() as u64
            };
            Ok(TicketStats {
                total: state.tickets.len() as u64,
                pending: count(TicketStatus::Pending),
                completed: count(TicketStatus::Completed),
                expired: count(TicketStatus::Expired),
            })
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.lock().map(drop) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_clock;
    use chrono::Duration;

    fn draft(key: &str, created_at: DateTime<Utc>) -> NewTicket {
        NewTicket {
            session_key: SessionKey::parse(key).unwrap(),
            created_at,
            expires_at: created_at + Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn second_pending_ticket_for_a_session_conflicts() {
        let store = InMemoryTicketStore::new();
        let now = test_clock().time();

        store.issue_ticket(draft("a", now)).await.unwrap();
        let result = store.issue_ticket(draft("a", now)).await;

        assert!(matches!(result, Err(TicketError::SessionConflict(_))));
        assert_eq!(store.current_number().unwrap(), 1, "conflict must not consume a number");
    }

    #[tokio::test]
    async fn latest_by_session_breaks_ties_by_id() {
        let store = InMemoryTicketStore::new();
        let now = test_clock().time();

        let first = store.issue_ticket(draft("a", now)).await.unwrap();
        store
            .force_status(first.id, TicketStatus::Expired)
            .await
            .unwrap();
        let second = store.issue_ticket(draft("a", now)).await.unwrap();

        let latest = store
            .find_latest_by_session(&second.session_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryTicketStore::new();
        store.set_unavailable(true);

        let result = store.issue_ticket(draft("a", test_clock().time())).await;
        assert!(matches!(result, Err(TicketError::Storage(_))));
        assert!(store.ping().await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
        assert!(store.is_empty().unwrap());
    }
}
