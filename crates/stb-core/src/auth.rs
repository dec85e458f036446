//! Admin authorization.

use crate::{domain::UserId, errors::Error, Result};

/// Fixed admin identity set, injected at construction and immutable for the
/// process lifetime.
///
/// Store operations are identity-blind; every admin-only command goes
/// through this policy in the layer above the store.
#[derive(Clone, Debug)]
pub struct AuthorizationPolicy {
    admin_ids: Vec<i64>,
}

impl AuthorizationPolicy {
    pub fn new(admin_ids: Vec<i64>) -> Self {
        Self { admin_ids }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_ids.contains(&user.0)
    }

    /// `Unauthorized` unless `user` is in the admin set.
    pub fn ensure_admin(&self, user: UserId) -> Result<()> {
        if self.is_admin(user) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Every admin identity, in configuration order. Used for new-ticket fan-out.
    pub fn admins(&self) -> Vec<UserId> {
        self.admin_ids.iter().copied().map(UserId).collect()
    }
}
