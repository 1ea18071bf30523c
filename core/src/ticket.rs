//! Ticket domain types.
//!
//! A [`Ticket`] is one customer's place in the queue. Its number, session
//! binding and timestamps never change after issue; only [`TicketStatus`]
//! moves, and only forward.

use crate::error::{Result, TicketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest session key accepted from a client.
pub const MAX_SESSION_KEY_LEN: usize = 128;

/// Store-assigned surrogate identifier of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl TicketId {
    /// Create a ticket id from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential queue number, unique within an epoch.
///
/// `Display` renders the customer-facing form, zero-padded to three digits
/// (`1` → `"001"`). Comparison and equality always use the raw integer.
///
/// # Examples
///
/// ```
/// use take_a_number_core::TicketNumber;
///
/// assert_eq!(TicketNumber::new(7).to_string(), "007");
/// assert_eq!(TicketNumber::new(1234).to_string(), "1234");
/// assert!(TicketNumber::new(99) < TicketNumber::new(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(pub u64);

impl TicketNumber {
    /// Number handed out first in every epoch.
    pub const FIRST: Self = Self(1);

    /// Create a ticket number from its raw value.
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Opaque token binding a ticket to one client session.
///
/// How the token travels (cookie, header, local storage) is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Validate and wrap a client-supplied session key.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidSessionKey`] if the key is blank or longer
    /// than [`MAX_SESSION_KEY_LEN`].
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TicketError::InvalidSessionKey(
                "session key must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_SESSION_KEY_LEN {
            return Err(TicketError::InvalidSessionKey(format!(
                "session key exceeds {MAX_SESSION_KEY_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Fresh random session key (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines, so full keys never end up in logs.
    #[must_use]
    pub fn redacted(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a ticket.
///
/// Transitions only run forward: `Pending → Completed` or `Pending → Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Waiting to be served
    Pending,
    /// Served by staff
    Completed,
    /// Cancelled by the customer or past its TTL
    Expired,
}

impl TicketStatus {
    /// Convert status to its storage string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    /// Parse status from its storage string.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Storage`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            _ => Err(TicketError::Storage(format!("Invalid ticket status: {s}"))),
        }
    }

    /// `true` for completed and expired tickets.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted ticket record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier
    pub id: TicketId,
    /// Queue number within the current epoch
    pub number: TicketNumber,
    /// Session the ticket is bound to
    pub session_key: SessionKey,
    /// Current lifecycle state
    pub status: TicketStatus,
    /// When the ticket was issued
    pub created_at: DateTime<Utc>,
    /// `created_at + TTL`, fixed at issue
    pub expires_at: DateTime<Utc>,
}

impl Ticket {
    /// `true` while the ticket is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, TicketStatus::Pending)
    }

    /// `true` once `now` is strictly past `expires_at`.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole seconds left before expiry, never negative.
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Draft of a ticket before the store assigns its id and number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Session the ticket will be bound to
    pub session_key: SessionKey,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

/// Aggregate counts over stored tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    /// All stored tickets
    pub total: u64,
    /// Tickets with status pending
    pub pending: u64,
    /// Tickets with status completed
    pub completed: u64,
    /// Tickets with status expired
    pub expired: u64,
}

/// Client-facing rendering of a ticket at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// Ticket id
    pub id: TicketId,
    /// Raw queue number
    pub number: TicketNumber,
    /// Zero-padded queue number
    pub display_number: String,
    /// Session token the client should keep
    pub session_token: SessionKey,
    /// Lifecycle state
    pub status: TicketStatus,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Whole seconds until expiry
    pub seconds_remaining: i64,
}

impl TicketView {
    /// Render `ticket` as seen at `now`.
    #[must_use]
    pub fn at(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        Self {
            id: ticket.id,
            number: ticket.number,
            display_number: ticket.number.to_string(),
            session_token: ticket.session_key.clone(),
            status: ticket.status,
            created_at: ticket.created_at,
            expires_at: ticket.expires_at,
            seconds_remaining: ticket.seconds_remaining(now),
        }
    }
}
