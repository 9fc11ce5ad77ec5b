use async_trait::async_trait;

use crate::accounts::User;

mod smtp;

pub use smtp::SmtpMailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp delivery: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivers password reset links.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_link(&self, user: &User, url: &str) -> Result<(), MailError>;
}

pub const RESET_SUBJECT: &str = "Reset your FindLunch password";

pub fn reset_body(url: &str) -> String {
    format!(
        "Hello,\n\
         \n\
         someone asked to reset the password of your FindLunch account.\n\
         Open the following link to choose a new password:\n\
         \n\
         {url}\n\
         \n\
         If you did not ask for this, you can ignore this email.\n"
    )
}
