//! Lifecycle tests for `TicketService` against the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code uses unwrap for clarity

use chrono::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;
use take_a_number_core::config::MAX_TTL_MINUTES;
use take_a_number_core::{
    Clock, DateTime, LifecycleConfig, SessionKey, TicketError, TicketId, TicketNumber,
    TicketService, TicketStatus, Utc,
};
use take_a_number_testing::{InMemoryTicketStore, MockClock, test_clock};

struct Harness {
    service: Arc<TicketService>,
    store: InMemoryTicketStore,
    clock: MockClock,
}

fn harness() -> Harness {
    let store = InMemoryTicketStore::new();
    let clock = MockClock::new(test_clock().time());
    let service = TicketService::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        LifecycleConfig::default(),
    );
    Harness {
        service: Arc::new(service),
        store,
        clock,
    }
}

fn key(raw: &str) -> SessionKey {
    SessionKey::parse(raw).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_receive_exactly_one_through_n() {
    let h = harness();
    let n = 64;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move { service.request_ticket(None).await })
        })
        .collect();

    let mut numbers = BTreeSet::new();
    for handle in handles {
        let ticket = handle.await.unwrap().unwrap();
        assert!(numbers.insert(ticket.number.value()), "duplicate number issued");
    }

    let expected: BTreeSet<u64> = (1..=n).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn same_pending_session_gets_the_identical_ticket() {
    let h = harness();

    let first = h.service.request_ticket(Some(key("alice"))).await.unwrap();
    h.clock.advance(Duration::minutes(5));
    let second = h.service.request_ticket(Some(key("alice"))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.current_number().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_on_one_session_share_a_ticket() {
    let h = harness();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move { service.request_ticket(Some(key("shared"))).await })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(h.service.stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn request_without_session_generates_a_key() {
    let h = harness();

    let a = h.service.request_ticket(None).await.unwrap();
    let b = h.service.request_ticket(None).await.unwrap();

    assert_ne!(a.session_key, b.session_key);
    assert_eq!(a.number, TicketNumber::new(1));
    assert_eq!(b.number, TicketNumber::new(2));
}

#[tokio::test]
async fn expires_at_is_created_at_plus_ttl() {
    let h = harness();
    let t0 = h.clock.now();

    let ticket = h.service.request_ticket(None).await.unwrap();

    assert_eq!(ticket.created_at, t0);
    assert_eq!(ticket.expires_at, t0 + Duration::minutes(15));
    assert_eq!(ticket.status, TicketStatus::Pending);
}

#[tokio::test]
async fn custom_ttl_is_honoured() {
    let store = InMemoryTicketStore::new();
    let clock = MockClock::new(test_clock().time());
    let service = TicketService::new(
        Arc::new(store),
        Arc::new(clock),
        LifecycleConfig::default().with_ttl_minutes(3),
    );

    let ticket = service.request_ticket(None).await.unwrap();
    assert_eq!(ticket.expires_at - ticket.created_at, Duration::minutes(3));
}

#[tokio::test]
async fn read_past_expiry_marks_ticket_expired_and_it_stays_expired() {
    let h = harness();
    let ticket = h.service.request_ticket(Some(key("bob"))).await.unwrap();

    h.clock.advance(Duration::minutes(15) + Duration::seconds(1));
    let read = h.service.get_ticket(&key("bob")).await.unwrap();

    assert_eq!(read.id, ticket.id);
    assert_eq!(read.status, TicketStatus::Expired);
    assert_eq!(h.service.view(&read).seconds_remaining, 0);

    // Sticky even if the clock were to move backwards.
    h.clock.advance(Duration::minutes(-10));
    let again = h.service.get_ticket(&key("bob")).await.unwrap();
    assert_eq!(again.status, TicketStatus::Expired);
    assert_eq!(h.service.stats().await.unwrap().expired, 1);
}

#[tokio::test]
async fn read_exactly_at_expiry_is_still_pending() {
    let h = harness();
    h.service.request_ticket(Some(key("edge"))).await.unwrap();

    h.clock.advance(Duration::minutes(15));
    let read = h.service.get_ticket(&key("edge")).await.unwrap();

    assert_eq!(read.status, TicketStatus::Pending);
    assert_eq!(h.service.view(&read).seconds_remaining, 0);
}

#[tokio::test]
async fn expired_session_gets_a_new_ticket_under_the_same_key() {
    let h = harness();
    let first = h.service.request_ticket(Some(key("carol"))).await.unwrap();

    h.clock.advance(Duration::minutes(20));
    let second = h.service.request_ticket(Some(key("carol"))).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.session_key, key("carol"));
    assert_eq!(second.number, TicketNumber::new(2));
    assert_eq!(second.status, TicketStatus::Pending);

    let stats = h.service.stats().await.unwrap();
    assert_eq!((stats.expired, stats.pending), (1, 1));
}

#[tokio::test]
async fn completed_session_gets_a_new_ticket() {
    let h = harness();
    let first = h.service.request_ticket(Some(key("dave"))).await.unwrap();
    assert!(h.service.complete(first.id).await.unwrap());

    let second = h.service.request_ticket(Some(key("dave"))).await.unwrap();
    assert_eq!(second.number, TicketNumber::new(2));
}

#[tokio::test]
async fn list_active_is_ordered_and_skips_unmarked_expired() {
    let h = harness();
    let old = h.service.request_ticket(Some(key("old"))).await.unwrap();
    h.clock.advance(Duration::minutes(10));
    let mid = h.service.request_ticket(Some(key("mid"))).await.unwrap();
    let new = h.service.request_ticket(Some(key("new"))).await.unwrap();
    h.service.complete(mid.id).await.unwrap();

    h.clock.advance(Duration::minutes(6));
    let active = h.service.list_active().await.unwrap();

    assert_eq!(active.iter().map(|t| t.id).collect::<Vec<_>>(), vec![new.id]);

    // `old` is still stored as pending until someone reads it.
    assert_eq!(h.service.stats().await.unwrap().pending, 2);
    let read = h.service.get_ticket(&old.session_key).await.unwrap();
    assert_eq!(read.status, TicketStatus::Expired);
    assert_eq!(h.service.stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn complete_only_moves_pending_tickets() {
    let h = harness();
    let a = h.service.request_ticket(None).await.unwrap();
    let b = h.service.request_ticket(None).await.unwrap();

    assert!(h.service.complete(a.id).await.unwrap());
    assert!(!h.service.complete(a.id).await.unwrap());

    assert!(h.service.expire(b.id).await.unwrap());
    assert!(!h.service.complete(b.id).await.unwrap());

    assert!(!h.service.complete(TicketId::new(999)).await.unwrap());

    let stats = h.service.stats().await.unwrap();
    assert_eq!((stats.completed, stats.expired), (1, 1));
}

#[tokio::test]
async fn complete_ticket_reports_why_it_failed() {
    let h = harness();
    let ticket = h.service.request_ticket(None).await.unwrap();

    let completed = h.service.complete_ticket(ticket.id).await.unwrap();
    assert_eq!(completed.status, TicketStatus::Completed);

    let again = h.service.complete_ticket(ticket.id).await;
    assert_eq!(
        again,
        Err(TicketError::InvalidTransition {
            id: ticket.id,
            from: TicketStatus::Completed,
            to: TicketStatus::Completed,
        })
    );

    assert_eq!(
        h.service.complete_ticket(TicketId::new(42)).await,
        Err(TicketError::NotFound)
    );
}

#[tokio::test]
async fn expire_forces_any_status_and_is_idempotent() {
    let h = harness();
    let ticket = h.service.request_ticket(None).await.unwrap();
    h.service.complete(ticket.id).await.unwrap();

    assert!(h.service.expire(ticket.id).await.unwrap());
    assert!(h.service.expire(ticket.id).await.unwrap());
    assert!(!h.service.expire(TicketId::new(999)).await.unwrap());

    let read = h.service.get_ticket(&ticket.session_key).await.unwrap();
    assert_eq!(read.status, TicketStatus::Expired);
}

#[tokio::test]
async fn current_ticket_distinguishes_terminal_states_from_not_found() {
    let h = harness();
    assert_eq!(
        h.service.current_ticket(&key("nobody")).await,
        Err(TicketError::NotFound)
    );

    let served = h.service.request_ticket(Some(key("served"))).await.unwrap();
    h.service.complete(served.id).await.unwrap();
    assert_eq!(
        h.service.current_ticket(&key("served")).await,
        Err(TicketError::Completed(served.number))
    );

    let late = h.service.request_ticket(Some(key("late"))).await.unwrap();
    h.clock.advance(Duration::minutes(16));
    assert_eq!(
        h.service.current_ticket(&key("late")).await,
        Err(TicketError::Expired(late.number))
    );
}

#[tokio::test]
async fn cancel_expires_a_pending_ticket_once() {
    let h = harness();
    let ticket = h.service.request_ticket(Some(key("erin"))).await.unwrap();

    let cancelled = h.service.cancel_ticket(&key("erin")).await.unwrap();
    assert_eq!(cancelled.id, ticket.id);
    assert_eq!(cancelled.status, TicketStatus::Expired);

    let again = h.service.cancel_ticket(&key("erin")).await;
    assert!(matches!(
        again,
        Err(TicketError::InvalidTransition {
            from: TicketStatus::Expired,
            ..
        })
    ));
    assert_eq!(
        h.service.cancel_ticket(&key("nobody")).await,
        Err(TicketError::NotFound)
    );
}

#[tokio::test]
async fn reset_restarts_numbering_at_one() {
    let h = harness();
    for _ in 0..5 {
        h.service.request_ticket(None).await.unwrap();
    }

    let cleared = h.service.reset_all().await.unwrap();
    assert_eq!(cleared, 5);
    assert!(h.store.is_empty().unwrap());

    let next = h.service.request_ticket(None).await.unwrap();
    assert_eq!(next.number, TicketNumber::FIRST);
    assert_eq!(next.number.to_string(), "001");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reset_racing_requests_leaves_one_consistent_epoch() {
    let h = harness();

    let mut handles = Vec::new();
    for i in 0..40 {
        let service = Arc::clone(&h.service);
        handles.push(tokio::spawn(async move {
            if i == 20 {
                service.reset_all().await.map(|_| ())
            } else {
                service.request_ticket(None).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let remaining = h.service.stats().await.unwrap().total;
    assert_eq!(h.store.current_number().unwrap(), remaining);
    let numbers: BTreeSet<u64> = h
        .service
        .list_active()
        .await
        .unwrap()
        .iter()
        .map(|t| t.number.value())
        .collect();
    assert_eq!(numbers, (1..=remaining).collect());
}

#[tokio::test]
async fn cleanup_deletes_only_tickets_older_than_threshold() {
    let h = harness();

    let ancient_done = h.service.request_ticket(None).await.unwrap();
    h.service.complete(ancient_done.id).await.unwrap();
    h.service.request_ticket(None).await.unwrap();

    h.clock.advance(Duration::hours(23));
    let recent_expired = h.service.request_ticket(None).await.unwrap();
    h.service.expire(recent_expired.id).await.unwrap();
    let recent_pending = h.service.request_ticket(None).await.unwrap();

    h.clock.advance(Duration::hours(1) + Duration::minutes(1));
    let deleted = h.service.cleanup_expired(None).await.unwrap();

    assert_eq!(deleted, 2);
    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.expired, 1);
    assert!(h
        .service
        .get_ticket(&recent_pending.session_key)
        .await
        .is_ok());
}

#[tokio::test]
async fn cleanup_accepts_an_explicit_threshold() {
    let h = harness();
    h.service.request_ticket(None).await.unwrap();
    h.clock.advance(Duration::hours(3));
    h.service.request_ticket(None).await.unwrap();

    assert_eq!(h.service.cleanup_expired(Some(2)).await.unwrap(), 1);
    assert_eq!(h.service.cleanup_expired(Some(0)).await.unwrap(), 0);
    h.clock.advance(Duration::seconds(1));
    assert_eq!(h.service.cleanup_expired(Some(0)).await.unwrap(), 1);
}

#[tokio::test]
async fn cleanup_with_a_huge_threshold_deletes_nothing() {
    let h = harness();
    h.service.request_ticket(None).await.unwrap();
    h.clock.advance(Duration::days(30));

    assert_eq!(h.service.cleanup_expired(Some(u32::MAX)).await.unwrap(), 0);
    assert_eq!(h.service.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn cleanup_near_the_start_of_time_deletes_nothing() {
    let h = harness();
    h.clock.set(DateTime::<Utc>::MIN_UTC + Duration::hours(1));
    h.service.request_ticket(None).await.unwrap();

    assert_eq!(h.service.cleanup_expired(Some(48)).await.unwrap(), 0);
    assert_eq!(h.service.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn oversized_ttl_is_capped_at_a_year() {
    let service = TicketService::new(
        Arc::new(InMemoryTicketStore::new()),
        Arc::new(MockClock::new(test_clock().time())),
        LifecycleConfig::default().with_ttl_minutes(999_999_999_999_999),
    );

    let ticket = service.request_ticket(None).await.unwrap();
    assert_eq!(
        ticket.expires_at - ticket.created_at,
        Duration::minutes(MAX_TTL_MINUTES)
    );
}

#[tokio::test]
async fn stats_after_three_creates_one_complete_one_expire() {
    let h = harness();
    let a = h.service.request_ticket(None).await.unwrap();
    let b = h.service.request_ticket(None).await.unwrap();
    h.service.request_ticket(None).await.unwrap();

    h.service.complete(a.id).await.unwrap();
    h.service.expire(b.id).await.unwrap();

    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.expired, 1);
}

#[tokio::test]
async fn storage_failures_propagate() {
    let h = harness();
    let ticket = h.service.request_ticket(None).await.unwrap();
    h.store.set_unavailable(true);

    assert!(matches!(
        h.service.request_ticket(None).await,
        Err(TicketError::Storage(_))
    ));
    assert!(matches!(
        h.service.get_ticket(&ticket.session_key).await,
        Err(TicketError::Storage(_))
    ));
    assert!(matches!(h.service.complete(ticket.id).await, Err(TicketError::Storage(_))));
    assert!(matches!(h.service.reset_all().await, Err(TicketError::Storage(_))));
    assert!(matches!(h.service.stats().await, Err(TicketError::Storage(_))));
    assert!(h.service.ping().await.is_err());

    h.store.set_unavailable(false);
    assert_eq!(h.service.stats().await.unwrap().total, 1);
}
