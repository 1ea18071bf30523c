//! # Take-a-Number Testing
//!
//! Testing utilities for the take-a-number queue.
//!
//! This crate provides:
//! - [`InMemoryTicketStore`]: mutex-guarded `TicketStore` with failure injection
//! - [`FixedClock`] and [`MockClock`]: deterministic time
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Duration;
//! use take_a_number_core::{LifecycleConfig, TicketService};
//! use take_a_number_testing::{test_clock, InMemoryTicketStore, MockClock};
//!
//! # tokio_test::block_on(async {
//! let clock = Arc::new(MockClock::new(test_clock().time()));
//! let service = TicketService::new(
//!     Arc::new(InMemoryTicketStore::new()),
//!     clock.clone(),
//!     LifecycleConfig::default(),
//! );
//!
//! let ticket = service.request_ticket(None).await.unwrap();
//! clock.advance(Duration::minutes(16));
//! let read = service.get_ticket(&ticket.session_key).await.unwrap();
//! assert!(read.status.is_terminal());
//! # });
//! ```

pub mod memory;

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use take_a_number_core::environment::Clock;

pub use memory::InMemoryTicketStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, Mutex, PoisonError, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use take_a_number_testing::mocks::FixedClock;
    /// use take_a_number_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// The instant this clock reports.
        #[must_use]
        pub const fn time(&self) -> DateTime<Utc> {
            self.time
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that tests can move forward.
    ///
    /// Clones share the same instant, so a test can keep one handle and give
    /// another to the service.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Create a clock starting at `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(start)),
            }
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{FixedClock, MockClock, test_clock};
