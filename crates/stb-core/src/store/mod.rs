//! SQLite-backed record store.
//!
//! One connection is shared by all components behind an async mutex; the
//! components (`TicketStore`, `MessageLog`, `BanRegistry`) are cheap
//! cloneable handles over it. Mutating operations hold the lock only for the
//! duration of their statement or transaction; nothing slow (in particular,
//! notification delivery) runs under it.

mod bans;
mod messages;
mod tickets;

pub use bans::BanRegistry;
pub use messages::MessageLog;
pub use tickets::TicketStore;

use std::{path::Path, sync::Arc};

use rusqlite::Connection;
use tokio::sync::{Mutex, MutexGuard};

use crate::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    username TEXT,
    message TEXT,
    status TEXT DEFAULT 'open'
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER,
    sender TEXT,
    text TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS bans (
    user_id INTEGER PRIMARY KEY
);
";

/// Shared handle to the SQLite database.
///
/// Constructed once at startup and passed to every component by `Arc`;
/// there is no process-global connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let db = Self::from_conn(Connection::open(path)?)?;
        tracing::info!(path = %path.display(), "ticket database ready");
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Arc<Self>> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Arc<Self>> {
        conn.execute_batch(SCHEMA)?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
        }))
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

/// Build the three store components over one database handle.
pub fn open_stores(db: Arc<Database>) -> (TicketStore, MessageLog, BanRegistry) {
    let bans = BanRegistry::new(db.clone());
    let log = MessageLog::new(db.clone());
    let tickets = TicketStore::new(db, bans.clone());
    (tickets, log, bans)
}
