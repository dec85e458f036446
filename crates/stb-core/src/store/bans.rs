use std::sync::Arc;

use rusqlite::params;

use crate::{domain::UserId, errors::Error, Result};

use super::Database;

/// Identities blocked from opening new tickets.
///
/// Membership only, no metadata. Bans never touch existing tickets: a banned
/// requester can still list their tickets and receive replies.
#[derive(Clone)]
pub struct BanRegistry {
    db: Arc<Database>,
}

impl BanRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add `user` to the ban set. Banning an already-banned id is a no-op.
    pub async fn ban(&self, user: UserId) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO bans (user_id) VALUES (?1)",
            params![user.0],
        )?;
        Ok(())
    }

    /// Remove `user` from the ban set. Unbanning a non-member is a no-op.
    pub async fn unban(&self, user: UserId) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM bans WHERE user_id = ?1", params![user.0])?;
        Ok(())
    }

    pub async fn is_banned(&self, user: UserId) -> Result<bool> {
        let conn = self.db.lock().await;
        let banned = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bans WHERE user_id = ?1)",
            params![user.0],
            |row| row.get(0),
        )?;
        Ok(banned)
    }

    /// Current ban set in ascending user id.
    pub async fn list_banned(&self) -> Result<Vec<UserId>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare("SELECT user_id FROM bans ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0).map(UserId))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn registry() -> BanRegistry {
        BanRegistry::new(Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn ban_and_unban_are_idempotent() {
        let bans = registry();

        bans.ban(UserId(42)).await.unwrap();
        bans.ban(UserId(42)).await.unwrap();
        assert!(bans.is_banned(UserId(42)).await.unwrap());
        assert_eq!(bans.list_banned().await.unwrap(), vec![UserId(42)]);

        bans.unban(UserId(42)).await.unwrap();
        bans.unban(UserId(42)).await.unwrap();
        assert!(!bans.is_banned(UserId(42)).await.unwrap());
        assert!(bans.list_banned().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_not_banned() {
        let bans = registry();
        assert!(!bans.is_banned(UserId(7)).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_sorted_by_user_id() {
        let bans = registry();
        for id in [30, 10, 20] {
            bans.ban(UserId(id)).await.unwrap();
        }
        assert_eq!(
            bans.list_banned().await.unwrap(),
            vec![UserId(10), UserId(20), UserId(30)]
        );
    }
}
