//! Error types for ticket lifecycle operations.

use crate::ticket::{SessionKey, TicketId, TicketNumber, TicketStatus};
use thiserror::Error;

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Everything that can go wrong while issuing or moving a ticket.
///
/// `NotFound`, `InvalidTransition`, `Expired`, `Completed` and
/// `InvalidSessionKey` are expected outcomes of client input. `Storage` is the
/// only variant that signals a system failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// No ticket for the given session key or id.
    #[error("Ticket not found")]
    NotFound,

    /// Complete or cancel attempted on a ticket that is not pending.
    #[error("Ticket {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Ticket the transition was attempted on
        id: TicketId,
        /// Status the ticket actually had
        from: TicketStatus,
        /// Status that was requested
        to: TicketStatus,
    },

    /// The session's ticket has expired.
    #[error("Ticket {0} has expired")]
    Expired(TicketNumber),

    /// The session's ticket has already been served.
    #[error("Ticket {0} has already been completed")]
    Completed(TicketNumber),

    /// Client supplied an unusable session key.
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    /// Another request already holds a pending ticket for this session.
    ///
    /// Raised by stores; the service resolves it by returning the existing ticket.
    #[error("Session {0} already holds a pending ticket")]
    SessionConflict(SessionKey),

    /// Underlying persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TicketError {
    /// `true` for failures of the system rather than of the request.
    #[must_use]
    pub const fn is_system_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let error = TicketError::InvalidTransition {
            id: TicketId::new(7),
            from: TicketStatus::Completed,
            to: TicketStatus::Expired,
        };
        assert_eq!(
            error.to_string(),
            "Ticket 7 cannot move from completed to expired"
        );
    }

    #[test]
    fn terminal_reads_show_padded_number() {
        assert_eq!(
            TicketError::Expired(TicketNumber::new(3)).to_string(),
            "Ticket 003 has expired"
        );
        assert_eq!(
            TicketError::Completed(TicketNumber::new(12)).to_string(),
            "Ticket 012 has already been completed"
        );
    }

    #[test]
    fn only_storage_is_a_system_failure() {
        assert!(TicketError::Storage("db down".into()).is_system_failure());
        assert!(!TicketError::NotFound.is_system_failure());
        assert!(!TicketError::Expired(TicketNumber::FIRST).is_system_failure());
    }
}
