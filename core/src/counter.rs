//! Sequence counter for ticket numbers.
//!
//! The counter is a single cursor: `next()` increments and then reads, so the
//! first number of an epoch is 1. Stores keep exactly one counter and mutate it
//! under the same lock (or transaction) that inserts the ticket.

use crate::error::{Result, TicketError};
use crate::ticket::TicketNumber;

/// In-process representation of the singleton ticket counter.
///
/// # Examples
///
/// ```
/// use take_a_number_core::{SequenceCounter, TicketNumber};
///
/// let mut counter = SequenceCounter::new();
/// assert_eq!(counter.next().unwrap(), TicketNumber::new(1));
/// assert_eq!(counter.next().unwrap(), TicketNumber::new(2));
///
/// counter.reset();
/// assert_eq!(counter.next().unwrap(), TicketNumber::new(1));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    current: u64,
}

impl SequenceCounter {
    /// Counter at the start of an epoch.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Resume a counter from a persisted cursor.
    #[must_use]
    pub const fn from_current(current: u64) -> Self {
        Self { current }
    }

    /// Increment, then return the new value.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Storage`] if the cursor would overflow; the
    /// counter is left unchanged in that case.
    pub fn next(&mut self) -> Result<TicketNumber> {
        let next = self
            .current
            .checked_add(1)
            .ok_or_else(|| TicketError::Storage("ticket counter overflow".to_string()))?;
        self.current = next;
        Ok(TicketNumber::new(next))
    }

    /// Last number handed out in this epoch (0 if none).
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Start a new epoch.
    pub const fn reset(&mut self) {
        self.current = 0;
    }
}
