//! The valuation/duty calculation core.
//!
//! Pure and synchronous throughout: every operation is a deterministic
//! function of its input and the immutable [`crate::rates::RateSchedule`].
//! [`ValuationEngine`] handles plotted land (with construction, parking and
//! storey apportionment), [`DdaValuationEngine`] handles DDA/CGHS built-up
//! flats, and both feed [`DutyCalculator`].

mod dda;
mod depreciation;
pub mod domain;
mod duty;
mod engine;
pub mod router;
pub mod service;
mod units;

pub use dda::DdaValuationEngine;
pub use depreciation::age_multiplier;
pub use domain::{
    ConstructionDetails, DdaValuationInput, DdaValuationResult, DeclaredValueDuty, OwnershipType,
    PlinthBracket, PropertyUse, RateCategory, ValuationError, ValuationInput, ValuationResult,
};
pub use duty::{DutyCalculator, DutySummary, HIGH_VALUE_THRESHOLD, SURCHARGE_THRESHOLD};
pub use engine::ValuationEngine;
pub use router::valuation_router;
pub use service::{
    DdaValuationOutcome, DdaValuationRequest, ValuationOutcome, ValuationRequest,
    ValuationService, ValuationServiceError,
};
pub use units::{to_square_meters, SQ_YARDS_TO_SQ_METERS};
