//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by audience.

pub mod admin;
pub mod health;
pub mod tickets;

// Re-export common handler utilities
pub use health::health_check;
