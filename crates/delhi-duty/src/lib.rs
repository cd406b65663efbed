//! Delhi property duty engine and its service surface.
//!
//! The heart of the crate is [`valuation`]: a pure, synchronous function family
//! that turns property attributes plus a statutory [`rates::RateSchedule`] into
//! land/construction values, stamp duty, mutation fee, e-fees and TDS. Around
//! it sit the colony-to-category directory, account/OTP handling, and the
//! repository boundaries used by the HTTP service in `services/api`.

pub mod accounts;
pub mod colonies;
pub mod config;
pub mod error;
pub mod history;
pub mod rates;
pub mod telemetry;
pub mod valuation;
