/// In-memory store
///
/// Keeps accounts and sessions in process-local maps behind a single
/// `RwLock`, so every operation is atomic with respect to the others. Data is
/// lost on restart. Selected with `database.url = "memory://"`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountRepository, SessionRepository, StoreError};
use crate::models::{account::Account, session::SessionRecord};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<Uuid, SessionRecord>,
}

impl MemoryState {
    /// Checks the unique fields of `account` against every other account
    fn check_unique(&self, account: &Account) -> Result<(), StoreError> {
        for other in self.accounts.values().filter(|other| other.id != account.id) {
            if other.username == account.username {
                return Err(StoreError::Conflict { field: "username" });
            }
            if other.email.eq_ignore_ascii_case(&account.email) {
                return Err(StoreError::Conflict { field: "email" });
            }
        }
        Ok(())
    }

    fn find(&self, predicate: impl Fn(&Account) -> bool) -> Option<Account> {
        self.accounts.values().find(|&account| predicate(account)).cloned()
    }
}

/// Process-local account and session store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict { field: "id" });
        }
        state.check_unique(account)?;
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_unique(account)?;

        let stored = state.accounts.get_mut(&account.id).ok_or(StoreError::NotFound)?;
        let created_time = stored.created_time;
        *stored = account.clone();
        stored.created_time = created_time;
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.find(|a| a.username == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.find(|a| a.email.eq_ignore_ascii_case(email)))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .find(|a| a.username == login || a.email.eq_ignore_ascii_case(login)))
    }

    async fn find_by_activation(&self, email: &str, key: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.find(|a| {
            a.email.eq_ignore_ascii_case(email) && a.activation_key.as_deref() == Some(key)
        }))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.state.read().await.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_time.cmp(&b.created_time).then(a.username.cmp(&b.username)));
        Ok(accounts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&session.account_id) {
            return Err(StoreError::NotFound);
        }
        if state.sessions.values().any(|s| s.token_hash == session.token_hash) {
            return Err(StoreError::Conflict { field: "token_hash" });
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn refresh_session(&self, session_id: Uuid, fresh_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(&session_id) {
            Some(session) => {
                session.fresh_at = fresh_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().await.sessions.remove(&session_id).is_some())
    }

    async fn delete_account_sessions(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.account_id != account_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}
