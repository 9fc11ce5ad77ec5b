use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::accounts::repo_types::{ResetRequest, User};

/// Entry point to the account store. Every workflow step runs inside one transaction.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn AccountTx>>;
}

/// One open transaction. Dropping it without `commit` discards all writes.
///
/// Lock order is always user row first, reset row second. `find_user_by_*` take the
/// user lock; `lock_reset`, `delete_reset` and `insert_reset` touch the reset row.
/// `find_reset_by_*` are plain reads.
#[async_trait]
pub trait AccountTx: Send {
    /// Case-insensitive lookup. Locks the user row until the transaction ends.
    async fn find_user_by_username(&mut self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&mut self, user_id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_reset_by_user(&mut self, user_id: Uuid) -> anyhow::Result<Option<ResetRequest>>;
    async fn find_reset_by_token(&mut self, token: &str) -> anyhow::Result<Option<ResetRequest>>;
    /// Re-reads the reset row under lock; `None` if it was consumed or replaced meanwhile.
    async fn lock_reset(&mut self, reset_id: Uuid) -> anyhow::Result<Option<ResetRequest>>;
    async fn insert_reset(&mut self, reset: &ResetRequest) -> anyhow::Result<()>;
    async fn delete_reset(&mut self, reset_id: Uuid) -> anyhow::Result<()>;
    async fn update_password(&mut self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn AccountTx>> {
        let tx = self.db.begin().await.context("begin tx")?;
        Ok(Box::new(PgAccountTx { tx }))
    }
}

pub struct PgAccountTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountTx for PgAccountTx {
    async fn find_user_by_username(&mut self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE lower(username) = lower($1)
            FOR UPDATE
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_reset_by_user(&mut self, user_id: Uuid) -> anyhow::Result<Option<ResetRequest>> {
        let reset = sqlx::query_as::<_, ResetRequest>(
            r#"
            SELECT id, user_id, token, created_at
              FROM reset_requests
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find reset request by user")?;
        Ok(reset)
    }

    async fn find_reset_by_token(&mut self, token: &str) -> anyhow::Result<Option<ResetRequest>> {
        let reset = sqlx::query_as::<_, ResetRequest>(
            r#"
            SELECT id, user_id, token, created_at
              FROM reset_requests
             WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find reset request by token")?;
        Ok(reset)
    }

    async fn lock_reset(&mut self, reset_id: Uuid) -> anyhow::Result<Option<ResetRequest>> {
        // Row lock keeps two concurrent redemptions of one token from both succeeding.
        let reset = sqlx::query_as::<_, ResetRequest>(
            r#"
            SELECT id, user_id, token, created_at
              FROM reset_requests
             WHERE id = $1
               FOR UPDATE
            "#,
        )
        .bind(reset_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock reset request")?;
        Ok(reset)
    }

    async fn insert_reset(&mut self, reset: &ResetRequest) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reset_requests (id, user_id, token, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(reset.id)
        .bind(reset.user_id)
        .bind(&reset.token)
        .bind(reset.created_at)
        .execute(&mut *self.tx)
        .await
        .context("insert reset request")?;
        Ok(())
    }

    async fn delete_reset(&mut self, reset_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM reset_requests WHERE id = $1"#)
            .bind(reset_id)
            .execute(&mut *self.tx)
            .await
            .context("delete reset request")?;
        Ok(())
    }

    async fn update_password(&mut self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *self.tx)
            .await
            .context("update password hash")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
