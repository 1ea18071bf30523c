//! `PostgreSQL` ticket store for the take-a-number queue.
//!
//! This crate provides [`PostgresTicketStore`], the production implementation
//! of the `TicketStore` trait from `take-a-number-core`. It supports:
//!
//! - Ticket issue as one transaction (counter increment + insert)
//! - One pending ticket per session, enforced by a partial unique index
//! - Atomic reset (delete all + counter back to 0)
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use take_a_number_postgres::PostgresTicketStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresTicketStore::new("postgres://localhost/take_a_number").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod store;

pub use store::PostgresTicketStore;
