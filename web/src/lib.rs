//! Axum HTTP surface for the take-a-number queue.
//!
//! The handlers are thin: they parse path, query and body, call one
//! [`TicketService`](take_a_number_core::TicketService) operation and map the
//! result to JSON. Lifecycle rules live entirely in `take-a-number-core`.
//!
//! # Routes
//!
//! ```text
//! GET    /health                      liveness
//! GET    /health/ready                store round trip
//! GET    /metrics                     Prometheus text (when a recorder is installed)
//! POST   /tickets                     request a ticket
//! GET    /tickets/:token              read the session's ticket
//! DELETE /tickets/:token              cancel the session's ticket
//! GET    /admin/tickets               active tickets in number order
//! PUT    /admin/tickets/:id/complete  mark served
//! POST   /admin/reset                 delete everything, restart at 001
//! POST   /admin/cleanup               purge old tickets
//! GET    /admin/stats                 counts by status
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use take_a_number_core::{LifecycleConfig, SystemClock, TicketService};
//! use take_a_number_testing::InMemoryTicketStore;
//! use take_a_number_web::{build_router, AppState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TicketService::new(
//!     Arc::new(InMemoryTicketStore::new()),
//!     Arc::new(SystemClock),
//!     LifecycleConfig::default(),
//! );
//! let app = build_router(AppState::new(Arc::new(service)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use middleware::REQUEST_ID_HEADER;
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
