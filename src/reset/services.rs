use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    accounts::{AccountStore, ResetRequest},
    mail::Mailer,
    reset::{extractors::RequestOrigin, password::hash_password, token::generate_token},
    state::AppState,
};

/// What `request_token` did. Never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequestOutcome {
    UnknownUser,
    /// A fresh request already existed; its link was mailed again.
    Resent,
    Issued,
}

/// What `redeem_token` did. Never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    UnknownToken,
    /// Token exists but the passwords were missing, different, or the owner is gone.
    Rejected,
    PasswordChanged,
}

/// Password reset workflow: token issuance and redemption.
pub struct PasswordResets {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    resend_window: Duration,
}

impl PasswordResets {
    pub fn new(store: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>, resend_window: Duration) -> Self {
        Self {
            store,
            mailer,
            resend_window,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.mailer.clone(),
            state.config.reset.resend_window(),
        )
    }

    /// Issues (or re-sends) a reset link for `username`.
    ///
    /// Unknown users and mail failures are not errors; `Err` means the store failed.
    pub async fn request_token(
        &self,
        username: &str,
        origin: &RequestOrigin,
    ) -> anyhow::Result<TokenRequestOutcome> {
        let username = username.trim();
        if username.is_empty() {
            debug!("reset requested with empty username");
            return Ok(TokenRequestOutcome::UnknownUser);
        }

        let mut tx = self.store.begin().await?;
        let Some(user) = tx.find_user_by_username(username).await? else {
            info!("reset requested for unknown username");
            return Ok(TokenRequestOutcome::UnknownUser);
        };

        let now = OffsetDateTime::now_utc();
        let (token, outcome) = match tx.find_reset_by_user(user.id).await? {
            Some(existing) if existing.is_fresh(now, self.resend_window) => {
                (existing.token, TokenRequestOutcome::Resent)
            }
            previous => {
                if let Some(stale) = previous {
                    tx.delete_reset(stale.id).await?;
                    debug!(user_id = %user.id, reset_id = %stale.id, "stale reset request replaced");
                }
                let reset = ResetRequest::new(user.id, generate_token(), now);
                tx.insert_reset(&reset).await?;
                (reset.token, TokenRequestOutcome::Issued)
            }
        };
        tx.commit().await?;

        let link = origin.reset_link(&token);
        if let Err(e) = self.mailer.send_reset_link(&user, &link).await {
            warn!(error = %e, user_id = %user.id, "reset mail delivery failed");
        }

        info!(user_id = %user.id, outcome = ?outcome, "reset token requested");
        Ok(outcome)
    }

    /// Sets a new password through `token` when both fields are non-empty and equal.
    /// The token is consumed only on success.
    pub async fn redeem_token(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> anyhow::Result<RedeemOutcome> {
        let mut tx = self.store.begin().await?;
        let Some(found) = tx.find_reset_by_token(token).await? else {
            info!("reset attempted with unknown token");
            return Ok(RedeemOutcome::UnknownToken);
        };

        if password.is_empty() || password != password_confirm {
            info!(user_id = %found.user_id, "reset rejected: passwords missing or different");
            return Ok(RedeemOutcome::Rejected);
        }

        // User row before reset row, same order as `request_token`.
        let Some(user) = tx.find_user_by_id(found.user_id).await? else {
            warn!(reset_id = %found.id, "reset request without owner");
            return Ok(RedeemOutcome::Rejected);
        };
        let Some(reset) = tx.lock_reset(found.id).await? else {
            info!(user_id = %user.id, "reset token consumed or replaced concurrently");
            return Ok(RedeemOutcome::UnknownToken);
        };

        let hash = hash_password(password)?;
        tx.update_password(user.id, &hash).await?;
        tx.delete_reset(reset.id).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "password reset");
        Ok(RedeemOutcome::PasswordChanged)
    }
}
