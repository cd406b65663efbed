use super::domain::{OtpPurpose, OtpRecord, UserAccount, UserId};
use chrono::{DateTime, Utc};

/// Storage abstraction for user accounts so the service can be exercised in
/// isolation and swapped onto a real database by the host.
pub trait UserRepository: Send + Sync {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, AccountRepositoryError>;
    fn by_email(&self, email: &str) -> Result<Option<UserAccount>, AccountRepositoryError>;
    fn by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountRepositoryError>;
    fn update_password(
        &self,
        email: &str,
        password_digest: String,
    ) -> Result<(), AccountRepositoryError>;
    fn touch_last_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), AccountRepositoryError>;
    fn delete(&self, id: &UserId) -> Result<(), AccountRepositoryError>;
    fn list(&self) -> Result<Vec<UserAccount>, AccountRepositoryError>;
}

/// Storage abstraction for issued OTPs.
pub trait OtpStore: Send + Sync {
    fn append(&self, record: OtpRecord) -> Result<(), AccountRepositoryError>;
    /// Most recently issued record for the email/purpose pair, used or not.
    fn latest_for(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, AccountRepositoryError>;
    fn mark_used(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), AccountRepositoryError>;
    fn list(&self) -> Result<Vec<OtpRecord>, AccountRepositoryError>;
    fn clear(&self) -> Result<usize, AccountRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AccountRepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound OTP delivery boundary. The email transport itself lives with the
/// host; tests and the demo use a capturing implementation.
pub trait OtpSender: Send + Sync {
    fn send(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<(), OtpDeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OtpDeliveryError {
    #[error("otp delivery failed: {0}")]
    Transport(String),
}
