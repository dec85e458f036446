use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    domain::{MessageSender, Ticket, TicketId, TicketStatus, UserId},
    errors::Error,
    Result,
};

use super::{BanRegistry, Database, MessageLog};

/// Ticket records and their lifecycle.
///
/// Owns id assignment and the open -> closed transition. Creation consults
/// the ban registry and seeds the message log; authorization is the command
/// layer's concern, every operation here is identity-blind.
#[derive(Clone)]
pub struct TicketStore {
    db: Arc<Database>,
    bans: BanRegistry,
}

impl TicketStore {
    pub fn new(db: Arc<Database>, bans: BanRegistry) -> Self {
        Self { db, bans }
    }

    /// Create a ticket and seed its thread with the subject text.
    ///
    /// The ticket row and the seed message commit in one transaction: a
    /// ticket never exists without its first message. Banned requesters are
    /// rejected before anything is written.
    pub async fn create_ticket(
        &self,
        requester: UserId,
        username: &str,
        subject: &str,
    ) -> Result<Ticket> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(Error::InvalidArgument(
                "ticket text must not be empty".to_string(),
            ));
        }
        if self.bans.is_banned(requester).await? {
            return Err(Error::Banned(requester));
        }

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO tickets (user_id, username, message) VALUES (?1, ?2, ?3)",
            params![requester.0, username, subject],
        )?;
        let id = TicketId(tx.last_insert_rowid());
        MessageLog::append_in_tx(&tx, id, MessageSender::Requester, subject)?;
        tx.commit()?;

        Ok(Ticket {
            id,
            user_id: requester,
            username: username.to_string(),
            message: subject.to_string(),
            status: TicketStatus::Open,
        })
    }

    pub async fn get_ticket(&self, id: TicketId) -> Result<Ticket> {
        let conn = self.db.lock().await;
        get_ticket_row(&conn, id)
    }

    /// Tickets opened by `requester`, oldest first.
    ///
    /// Bans gate creation only; a banned requester still sees their
    /// existing tickets.
    pub async fn list_by_requester(&self, requester: UserId) -> Result<Vec<Ticket>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, username, message, status FROM tickets \
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![requester.0], map_ticket_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Every ticket in creation order. Admin gating happens in the command layer.
    pub async fn list_all(&self) -> Result<Vec<Ticket>> {
        let conn = self.db.lock().await;
        let mut stmt =
            conn.prepare("SELECT id, user_id, username, message, status FROM tickets ORDER BY id")?;
        let rows = stmt.query_map([], map_ticket_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Close a ticket. Closing an already-closed ticket succeeds unchanged.
    pub async fn close_ticket(&self, id: TicketId) -> Result<Ticket> {
        let conn = self.db.lock().await;
        let updated = conn.execute(
            "UPDATE tickets SET status = 'closed' WHERE id = ?1",
            params![id.0],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(id));
        }
        get_ticket_row(&conn, id)
    }

    /// Identity of the requester who opened the ticket. The reply flow uses
    /// this to resolve the delivery target.
    pub async fn owner_of(&self, id: TicketId) -> Result<UserId> {
        let conn = self.db.lock().await;
        conn.query_row(
            "SELECT user_id FROM tickets WHERE id = ?1",
            params![id.0],
            |row| row.get::<_, i64>(0).map(UserId),
        )
        .optional()?
        .ok_or(Error::NotFound(id))
    }
}

fn get_ticket_row(conn: &Connection, id: TicketId) -> Result<Ticket> {
    conn.query_row(
        "SELECT id, user_id, username, message, status FROM tickets WHERE id = ?1",
        params![id.0],
        map_ticket_row,
    )
    .optional()?
    .ok_or(Error::NotFound(id))
}

fn map_ticket_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let status_raw: String = row.get(4)?;
    let status = TicketStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown ticket status '{status_raw}'").into(),
        )
    })?;

    Ok(Ticket {
        id: TicketId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        username: row.get(2)?,
        message: row.get(3)?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_stores;

    fn stores() -> (TicketStore, MessageLog, BanRegistry) {
        open_stores(Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn assigns_sequential_ids_starting_at_one() {
        let (tickets, _, _) = stores();

        for (i, subject) in ["printer jam", "no sound", "vpn down"].iter().enumerate() {
            let t = tickets
                .create_ticket(UserId(100 + i as i64), "user", subject)
                .await
                .unwrap();
            assert_eq!(t.id, TicketId(i as i64 + 1));
            assert_eq!(t.status, TicketStatus::Open);
        }
    }

    #[tokio::test]
    async fn creation_seeds_the_thread_with_the_subject() {
        let (tickets, log, _) = stores();

        let t = tickets
            .create_ticket(UserId(42), "alice", "printer jam")
            .await
            .unwrap();
        assert_eq!(t.id, TicketId(1));

        let thread = log.list_by_ticket(t.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].sender, MessageSender::Requester);
        assert_eq!(thread[0].text, "printer jam");
    }

    #[tokio::test]
    async fn rejects_blank_subject() {
        let (tickets, _, _) = stores();

        for subject in ["", "   ", "\n"] {
            let err = tickets
                .create_ticket(UserId(42), "alice", subject)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert!(tickets.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn banned_requester_cannot_create_until_unbanned() {
        let (tickets, log, bans) = stores();

        tickets
            .create_ticket(UserId(42), "alice", "printer jam")
            .await
            .unwrap();

        bans.ban(UserId(42)).await.unwrap();
        let err = tickets
            .create_ticket(UserId(42), "alice", "again")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Banned(UserId(42))));

        // Nothing was written: one ticket, one seed message.
        assert_eq!(tickets.list_by_requester(UserId(42)).await.unwrap().len(), 1);
        assert_eq!(log.list_by_ticket(TicketId(1)).await.unwrap().len(), 1);

        bans.unban(UserId(42)).await.unwrap();
        let t = tickets
            .create_ticket(UserId(42), "alice", "again")
            .await
            .unwrap();
        assert_eq!(t.id, TicketId(2));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (tickets, _, _) = stores();

        tickets
            .create_ticket(UserId(42), "alice", "printer jam")
            .await
            .unwrap();

        let closed = tickets.close_ticket(TicketId(1)).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);

        let closed_again = tickets.close_ticket(TicketId(1)).await.unwrap();
        assert_eq!(closed_again.status, TicketStatus::Closed);
    }

    #[tokio::test]
    async fn closing_a_missing_ticket_is_not_found() {
        let (tickets, _, _) = stores();
        let err = tickets.close_ticket(TicketId(999)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(TicketId(999))));
    }

    #[tokio::test]
    async fn get_and_owner_resolve_stored_fields() {
        let (tickets, _, _) = stores();

        tickets
            .create_ticket(UserId(42), "alice", "printer jam")
            .await
            .unwrap();

        let t = tickets.get_ticket(TicketId(1)).await.unwrap();
        assert_eq!(t.user_id, UserId(42));
        assert_eq!(t.username, "alice");
        assert_eq!(t.message, "printer jam");

        assert_eq!(tickets.owner_of(TicketId(1)).await.unwrap(), UserId(42));
        assert!(matches!(
            tickets.owner_of(TicketId(999)).await.unwrap_err(),
            Error::NotFound(TicketId(999))
        ));
        assert!(matches!(
            tickets.get_ticket(TicketId(999)).await.unwrap_err(),
            Error::NotFound(TicketId(999))
        ));
    }

    #[tokio::test]
    async fn listings_are_in_creation_order() {
        let (tickets, _, _) = stores();

        tickets
            .create_ticket(UserId(1), "alice", "first")
            .await
            .unwrap();
        tickets
            .create_ticket(UserId(2), "bob", "second")
            .await
            .unwrap();
        tickets
            .create_ticket(UserId(1), "alice", "third")
            .await
            .unwrap();

        let mine = tickets.list_by_requester(UserId(1)).await.unwrap();
        assert_eq!(
            mine.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![TicketId(1), TicketId(3)]
        );

        let all = tickets.list_all().await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![TicketId(1), TicketId(2), TicketId(3)]
        );

        assert!(tickets
            .list_by_requester(UserId(99))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn reply_then_close_scenario() {
        let (tickets, log, _) = stores();

        tickets
            .create_ticket(UserId(42), "alice", "printer jam")
            .await
            .unwrap();
        log.append(TicketId(1), MessageSender::Admin, "sending a technician")
            .await
            .unwrap();
        tickets.close_ticket(TicketId(1)).await.unwrap();

        let t = tickets.get_ticket(TicketId(1)).await.unwrap();
        assert_eq!(t.status, TicketStatus::Closed);

        let thread = log.list_by_ticket(TicketId(1)).await.unwrap();
        assert_eq!(
            thread.iter().map(|m| m.sender).collect::<Vec<_>>(),
            vec![MessageSender::Requester, MessageSender::Admin]
        );
    }

    #[tokio::test]
    async fn concurrent_creates_yield_distinct_sequential_ids() {
        let (tickets, _, _) = stores();

        let mut handles = Vec::new();
        for i in 0..8i64 {
            let tickets = tickets.clone();
            handles.push(tokio::spawn(async move {
                tickets
                    .create_ticket(UserId(i), "user", "subject")
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().0);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }
}
