//! Saved calculation history and the analytics event log.
//!
//! Both are boundaries: the engine produces flat records, the host decides
//! where they live. The in-memory implementations ship with `services/api`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::UserId;
use crate::valuation::{PropertyUse, RateCategory};

/// One saved calculation summary, keyed by the acting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user: UserId,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colony_name: Option<String>,
    pub property_use: PropertyUse,
    /// Absent for DDA/CGHS flats, which are priced by plinth slab rather
    /// than colony category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RateCategory>,
    pub consideration: f64,
    pub stamp_duty: f64,
    pub e_fees: f64,
    pub tds: f64,
    pub total_duty: f64,
}

/// Storage abstraction for user-saved summaries.
pub trait HistoryRepository: Send + Sync {
    fn insert(&self, record: HistoryRecord) -> Result<HistoryRecord, HistoryError>;
    /// Records for one user, newest first.
    fn for_user(&self, user: &UserId) -> Result<Vec<HistoryRecord>, HistoryError>;
    /// All records, newest first, capped at `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError>;
    fn delete_for_user(&self, user: &UserId) -> Result<usize, HistoryError>;
    fn clear(&self) -> Result<usize, HistoryError>;
}

/// One analytics event per calculation, logged for signed-in users and
/// guests alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,
    pub recorded_at: DateTime<Utc>,
    pub property_use: PropertyUse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colony_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RateCategory>,
    pub consideration: f64,
    pub total_duty: f64,
}

/// Append-only analytics boundary.
pub trait EventLog: Send + Sync {
    fn record(&self, event: CalcEvent) -> Result<(), HistoryError>;
    /// Latest events, newest first, capped at `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<CalcEvent>, HistoryError>;
    fn count(&self) -> Result<usize, HistoryError>;
    fn clear(&self) -> Result<usize, HistoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("record not found")]
    NotFound,
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}
