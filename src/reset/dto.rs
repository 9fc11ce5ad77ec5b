use std::fmt;

use serde::Deserialize;

/// Every reset endpoint answers with this body, whatever happened.
pub const ACK: i32 = 0;

/// Request body for `POST /api/get_reset_token`.
#[derive(Debug, Deserialize)]
pub struct ResetTokenRequest {
    #[serde(default)]
    pub username: String,
}

/// Request body for `PUT /api/reset_password/{token}`.
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub passwordconfirm: Option<String>,
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("passwordconfirm", &self.passwordconfirm.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
