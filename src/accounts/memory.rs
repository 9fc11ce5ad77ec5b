//! In-memory account store used by tests and `AppState::fake()`.
//!
//! A transaction holds the table lock for its whole lifetime and works on a copy,
//! so transactions are serialized and an uncommitted one leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::repo::{AccountStore, AccountTx};
use super::repo_types::{ResetRequest, User};

#[derive(Clone, Default)]
struct Tables {
    users: Vec<User>,
    resets: Vec<ResetRequest>,
}

#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str, password_hash: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().await.users.push(user.clone());
        user
    }

    /// Seeds a reset request directly, bypassing the workflow.
    pub async fn add_reset(&self, reset: ResetRequest) {
        self.tables.lock().await.resets.push(reset);
    }

    pub async fn user(&self, user_id: Uuid) -> Option<User> {
        let tables = self.tables.lock().await;
        tables.users.iter().find(|u| u.id == user_id).cloned()
    }

    pub async fn resets(&self) -> Vec<ResetRequest> {
        self.tables.lock().await.resets.clone()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn AccountTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl AccountTx for MemoryTx {
    async fn find_user_by_username(&mut self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .work
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.work.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_reset_by_user(&mut self, user_id: Uuid) -> anyhow::Result<Option<ResetRequest>> {
        Ok(self.work.resets.iter().find(|r| r.user_id == user_id).cloned())
    }

    async fn find_reset_by_token(&mut self, token: &str) -> anyhow::Result<Option<ResetRequest>> {
        Ok(self.work.resets.iter().find(|r| r.token == token).cloned())
    }

    async fn lock_reset(&mut self, reset_id: Uuid) -> anyhow::Result<Option<ResetRequest>> {
        Ok(self.work.resets.iter().find(|r| r.id == reset_id).cloned())
    }

    async fn insert_reset(&mut self, reset: &ResetRequest) -> anyhow::Result<()> {
        // Same unique constraints as the reset_requests table.
        if self.work.resets.iter().any(|r| r.user_id == reset.user_id) {
            anyhow::bail!("duplicate reset request for user {}", reset.user_id);
        }
        if self.work.resets.iter().any(|r| r.token == reset.token) {
            anyhow::bail!("duplicate reset token");
        }
        self.work.resets.push(reset.clone());
        Ok(())
    }

    async fn delete_reset(&mut self, reset_id: Uuid) -> anyhow::Result<()> {
        self.work.resets.retain(|r| r.id != reset_id);
        Ok(())
    }

    async fn update_password(&mut self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let user = self
            .work
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = InMemoryAccountStore::new();
        let user = store.add_user("a@x.com", "hash").await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_reset(&ResetRequest::new(user.id, "t1".into(), OffsetDateTime::now_utc()))
            .await
            .unwrap();
        drop(tx);

        assert!(store.resets().await.is_empty());
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryAccountStore::new();
        let user = store.add_user("a@x.com", "hash").await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_reset(&ResetRequest::new(user.id, "t1".into(), OffsetDateTime::now_utc()))
            .await
            .unwrap();
        tx.update_password(user.id, "new-hash").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.resets().await.len(), 1);
        assert_eq!(store.user(user.id).await.unwrap().password_hash, "new-hash");
    }

    #[tokio::test]
    async fn second_request_for_same_user_is_rejected() {
        let store = InMemoryAccountStore::new();
        let user = store.add_user("a@x.com", "hash").await;
        let now = OffsetDateTime::now_utc();

        let mut tx = store.begin().await.unwrap();
        tx.insert_reset(&ResetRequest::new(user.id, "t1".into(), now)).await.unwrap();
        let err = tx
            .insert_reset(&ResetRequest::new(user.id, "t2".into(), now))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate reset request"));
    }

    #[tokio::test]
    async fn username_lookup_ignores_case() {
        let store = InMemoryAccountStore::new();
        let user = store.add_user("Alice@Example.com", "hash").await;

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_user_by_username("alice@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }
}
