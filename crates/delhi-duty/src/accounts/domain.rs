use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// A registered calculator account. Passwords are stored as hex SHA-256
/// digests, never in clear text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_digest: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// What an OTP was issued for; a signup code cannot confirm a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

impl OtpPurpose {
    pub const fn label(self) -> &'static str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

/// One issued OTP. Codes are single-use and expire; verification always
/// consults the latest record for the email/purpose pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}
