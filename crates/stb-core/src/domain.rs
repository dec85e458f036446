use std::fmt;

use chrono::NaiveDateTime;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Ticket id assigned by the store, strictly increasing from 1, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(pub i64);

/// Thread message id, monotonically increasing across all tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a ticket. The only legal transition is open -> closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    /// Literal persisted in the `tickets.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Author role of a thread message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageSender {
    Requester,
    Admin,
}

impl MessageSender {
    /// Literal persisted in the `messages.sender` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::Requester),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A support ticket as stored. Field names mirror the `tickets` table.
///
/// `user_id`, `username` and `message` are fixed at creation time; only
/// `status` ever changes, and only through the store's close operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub status: TicketStatus,
}

/// One entry in a ticket's conversation thread. Never mutated after append.
#[derive(Clone, Debug, PartialEq)]
pub struct TicketMessage {
    pub id: MessageId,
    pub ticket_id: TicketId,
    pub sender: MessageSender,
    pub text: String,
    pub created_at: NaiveDateTime,
}
