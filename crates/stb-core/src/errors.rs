use crate::domain::{TicketId, UserId};

/// Core error type for the support bot.
///
/// Adapter crates map their specific failures into this type so the command
/// layer can translate every outcome into user-visible text in one place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("ticket #{0} not found")]
    NotFound(TicketId),

    #[error("admin access required")]
    Unauthorized,

    #[error("user {0} is banned from opening tickets")]
    Banned(UserId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("delivery to {recipient} failed: {reason}")]
    DeliveryFailed { recipient: UserId, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
