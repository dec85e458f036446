use std::sync::Arc;

use rusqlite::{params, Transaction};

use crate::{
    domain::{MessageId, MessageSender, TicketId, TicketMessage},
    errors::Error,
    Result,
};

use super::Database;

/// Append-only conversation thread per ticket.
///
/// Messages are never mutated or deleted; `ticket_id` must reference an
/// existing ticket, checked at append time.
#[derive(Clone)]
pub struct MessageLog {
    db: Arc<Database>,
}

impl MessageLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one message to a ticket's thread.
    ///
    /// Fails with `NotFound` (leaving the log untouched) when the ticket
    /// does not exist.
    pub async fn append(
        &self,
        ticket_id: TicketId,
        sender: MessageSender,
        body: &str,
    ) -> Result<TicketMessage> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::InvalidArgument(
                "message text must not be empty".to_string(),
            ));
        }

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE id = ?1)",
            params![ticket_id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::NotFound(ticket_id));
        }
        let message = Self::append_in_tx(&tx, ticket_id, sender, body)?;
        tx.commit()?;
        Ok(message)
    }

    /// Insert a message on an open transaction.
    ///
    /// Used by `TicketStore` to seed the thread in the same transaction that
    /// creates the ticket row; the caller guarantees the ticket exists.
    pub(crate) fn append_in_tx(
        tx: &Transaction<'_>,
        ticket_id: TicketId,
        sender: MessageSender,
        body: &str,
    ) -> Result<TicketMessage> {
        tx.execute(
            "INSERT INTO messages (ticket_id, sender, text) VALUES (?1, ?2, ?3)",
            params![ticket_id.0, sender.as_str(), body],
        )?;
        let id = tx.last_insert_rowid();

        // created_at comes from the column default; read the stored row back
        // so the returned value is exactly what was persisted.
        let message = tx.query_row(
            "SELECT id, ticket_id, sender, text, created_at FROM messages WHERE id = ?1",
            params![id],
            map_message_row,
        )?;
        Ok(message)
    }

    /// A ticket's thread in append order (ascending id).
    pub async fn list_by_ticket(&self, ticket_id: TicketId) -> Result<Vec<TicketMessage>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, sender, text, created_at FROM messages \
             WHERE ticket_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![ticket_id.0], map_message_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketMessage> {
    let sender_raw: String = row.get(2)?;
    let sender = MessageSender::parse(&sender_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown message sender '{sender_raw}'").into(),
        )
    })?;

    Ok(TicketMessage {
        id: MessageId(row.get(0)?),
        ticket_id: TicketId(row.get(1)?),
        sender,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}
