use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use super::{reset_body, MailError, Mailer, RESET_SUBJECT};
use crate::{accounts::User, config::SmtpConfig};

/// SMTP relay with STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = cfg.from.parse().context("parse MAIL_FROM")?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .with_context(|| format!("smtp relay {}", cfg.host))?
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(10)));
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        info!(host = %cfg.host, port = cfg.port, "smtp mailer configured");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn reset_message(from: &Mailbox, to: &str, url: &str) -> Result<Message, MailError> {
    let to: Mailbox = to.parse()?;
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(RESET_SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(reset_body(url))?;
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_reset_link(&self, user: &User, url: &str) -> Result<(), MailError> {
        let message = reset_message(&self.from, &user.username, url)?;
        self.transport.send(message).await?;
        debug!(user_id = %user.id, "reset mail sent");
        Ok(())
    }
}
