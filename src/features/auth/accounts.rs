use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::users::models::UserRole;

/// Live account lookup for session checks.
///
/// Session tokens outlive role changes and deletions, so the role in the
/// claims is never trusted on its own.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Current role of the account, `None` once it has been deleted
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory accounts keyed by user id
    #[derive(Default)]
    pub struct MemoryAccounts {
        pub roles: Mutex<HashMap<Uuid, UserRole>>,
    }

    #[async_trait]
    impl AccountDirectory for MemoryAccounts {
        async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>> {
            Ok(self.roles.lock().unwrap().get(&user_id).copied())
        }
    }
}
