use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::info;

use super::domain::{OtpPurpose, OtpRecord, UserAccount, UserId};
use super::repository::{
    AccountRepositoryError, OtpDeliveryError, OtpSender, OtpStore, UserRepository,
};

const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("user-{id:06}"))
}

/// Hex SHA-256 digest used for stored passwords.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(100_000..1_000_000))
}

/// Signup, login and password-reset flows, all gated by single-use OTPs.
pub struct AccountService<U, O, S> {
    users: Arc<U>,
    otps: Arc<O>,
    sender: Arc<S>,
    otp_ttl: Duration,
}

impl<U, O, S> AccountService<U, O, S>
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    pub fn new(users: Arc<U>, otps: Arc<O>, sender: Arc<S>) -> Self {
        Self::with_otp_ttl_minutes(users, otps, sender, DEFAULT_OTP_TTL_MINUTES)
    }

    pub fn with_otp_ttl_minutes(
        users: Arc<U>,
        otps: Arc<O>,
        sender: Arc<S>,
        otp_ttl_minutes: i64,
    ) -> Self {
        let minutes = if otp_ttl_minutes > 0 {
            otp_ttl_minutes
        } else {
            DEFAULT_OTP_TTL_MINUTES
        };
        Self {
            users,
            otps,
            sender,
            otp_ttl: Duration::minutes(minutes),
        }
    }

    /// Issue and dispatch a signup OTP. Fails if the email or username is
    /// already registered.
    pub fn begin_signup(
        &self,
        email: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let email = normalize(email);
        let username = normalize(username);

        if self.users.by_email(&email)?.is_some() {
            return Err(AccountError::EmailTaken(email));
        }
        if self.users.by_username(&username)?.is_some() {
            return Err(AccountError::UsernameTaken(username));
        }

        self.issue_otp(&email, OtpPurpose::Signup, now)
    }

    /// Verify the signup OTP and create the account.
    pub fn confirm_signup(
        &self,
        email: &str,
        username: &str,
        code: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserAccount, AccountError> {
        let email = normalize(email);
        self.consume_otp(&email, OtpPurpose::Signup, code, now)?;

        let account = UserAccount {
            id: next_user_id(),
            email: email.clone(),
            username: normalize(username),
            password_digest: password_digest(password),
            is_verified: true,
            created_at: now,
            last_login: None,
        };
        let stored = self.users.insert(account)?;
        info!(user = %stored.id.0, "account created");
        Ok(stored)
    }

    /// Authenticate by email (identifier containing '@') or username, and
    /// stamp the login time.
    pub fn login(
        &self,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserAccount, AccountError> {
        let identifier = normalize(identifier);
        let account = if identifier.contains('@') {
            self.users.by_email(&identifier)?
        } else {
            self.users.by_username(&identifier)?
        }
        .ok_or_else(|| AccountError::UnknownUser(identifier.clone()))?;

        if account.password_digest != password_digest(password) {
            return Err(AccountError::InvalidCredentials);
        }

        self.users.touch_last_login(&account.id, now)?;
        Ok(UserAccount {
            last_login: Some(now),
            ..account
        })
    }

    /// Issue and dispatch a password-reset OTP for an existing account.
    pub fn begin_password_reset(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AccountError> {
        let identifier = normalize(identifier);
        let account = if identifier.contains('@') {
            self.users.by_email(&identifier)?
        } else {
            self.users.by_username(&identifier)?
        }
        .ok_or_else(|| AccountError::UnknownUser(identifier.clone()))?;

        self.issue_otp(&account.email, OtpPurpose::PasswordReset, now)?;
        Ok(account.email)
    }

    /// Verify the reset OTP and store the new password digest.
    pub fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let email = normalize(email);
        self.consume_otp(&email, OtpPurpose::PasswordReset, code, now)?;
        self.users
            .update_password(&email, password_digest(new_password))?;
        info!(%email, "password reset");
        Ok(())
    }

    fn issue_otp(
        &self,
        email: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let code = generate_code();
        self.otps.append(OtpRecord {
            email: email.to_string(),
            code: code.clone(),
            purpose,
            issued_at: now,
            expires_at: now + self.otp_ttl,
            used: false,
        })?;
        self.sender.send(email, &code, purpose)?;
        info!(%email, purpose = purpose.label(), "otp issued");
        Ok(())
    }

    /// Latest-record-wins verification: the code must match the most recent
    /// unexpired, unused record for this email and purpose.
    fn consume_otp(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let record = self
            .otps
            .latest_for(email, purpose)?
            .ok_or(AccountError::InvalidOtp)?;

        if record.used || record.code != code || record.expires_at < now {
            return Err(AccountError::InvalidOtp);
        }

        self.otps.mark_used(email, purpose, code)?;
        Ok(())
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email '{0}' is already registered")]
    EmailTaken(String),
    #[error("username '{0}' is taken")]
    UsernameTaken(String),
    #[error("no account for '{0}'")]
    UnknownUser(String),
    #[error("wrong password")]
    InvalidCredentials,
    #[error("invalid or expired OTP")]
    InvalidOtp,
    #[error(transparent)]
    Repository(#[from] AccountRepositoryError),
    #[error(transparent)]
    Delivery(#[from] OtpDeliveryError),
}
