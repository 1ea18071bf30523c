//! # Take-a-Number Core
//!
//! Ticket lifecycle and sequence numbering for a "take-a-number" queue.
//!
//! Customers request a sequential ticket bound to an opaque session key, then
//! wait for staff to complete it or for it to expire. This crate holds the part
//! of the system with actual invariants:
//!
//! - **Sequence Counter**: one persisted cursor issuing 1, 2, 3, ... per epoch
//! - **Ticket Store**: durable ticket records keyed by id and session
//! - **Ticket Service**: create/find/expire/complete/reset/cleanup orchestration
//!
//! Storage backends live in sibling crates (`take-a-number-postgres` for
//! production, `take-a-number-testing` for in-memory tests). HTTP lives in
//! `take-a-number-web`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use take_a_number_core::{LifecycleConfig, SystemClock, TicketService};
//!
//! let service = TicketService::new(store, Arc::new(SystemClock), LifecycleConfig::default());
//!
//! let ticket = service.request_ticket(None).await?;
//! println!("your number is {}", ticket.number); // "001"
//! ```

pub mod config;
pub mod counter;
pub mod error;
pub mod service;
pub mod store;
pub mod ticket;

pub use chrono::{DateTime, Utc};

pub use config::LifecycleConfig;
pub use counter::SequenceCounter;
pub use error::{Result, TicketError};
pub use service::TicketService;
pub use store::TicketStore;
pub use ticket::{
    NewTicket, SessionKey, Ticket, TicketId, TicketNumber, TicketStats, TicketStatus, TicketView,
};

/// Environment module - time abstraction
///
/// All "now" reads in the lifecycle go through [`environment::Clock`] so that
/// expiry can be tested without sleeping.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use take_a_number_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use environment::{Clock, SystemClock};
