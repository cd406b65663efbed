//! User accounts and OTP-gated credential flows.
//!
//! Persistence and email transport stay behind traits; the service only
//! encodes the rules (unique email/username, sha-256 digests, single-use
//! codes with a ten-minute default TTL).

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{OtpPurpose, OtpRecord, UserAccount, UserId};
pub use repository::{
    AccountRepositoryError, OtpDeliveryError, OtpSender, OtpStore, UserRepository,
};
pub use router::account_router;
pub use service::{password_digest, AccountError, AccountService};
