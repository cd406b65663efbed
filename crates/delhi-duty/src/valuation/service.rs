use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::accounts::UserId;
use crate::colonies::ColonyDirectory;
use crate::history::{CalcEvent, EventLog, HistoryError, HistoryRecord, HistoryRepository};
use crate::rates::RateSchedule;

use super::dda::DdaValuationEngine;
use super::domain::{
    ConstructionDetails, DdaValuationInput, DdaValuationResult, OwnershipType, PropertyUse,
    RateCategory, ValuationError, ValuationInput, ValuationResult,
};
use super::engine::ValuationEngine;

/// Calculation request as submitted by the form: the category may be named
/// directly or resolved from a colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub property_use: PropertyUse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colony: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RateCategory>,
    pub land_area_sq_yards: f64,
    pub ownership: OwnershipType,
    pub total_storeys: u32,
    pub storeys_purchased: u32,
    #[serde(default)]
    pub has_parking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction: Option<ConstructionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_consideration: Option<f64>,
    /// Opaque acting-user identity supplied by the session layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// DDA/CGHS calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdaValuationRequest {
    pub property_use: PropertyUse,
    pub plinth_area_sq_yards: f64,
    #[serde(default)]
    pub more_than_four_storeys: bool,
    pub ownership: OwnershipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_consideration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// A plotted calculation with the context needed to persist or display it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colony_name: Option<String>,
    pub category: RateCategory,
    pub property_use: PropertyUse,
    pub ownership: OwnershipType,
    pub result: ValuationResult,
}

impl ValuationOutcome {
    pub fn history_record(&self, user: UserId, saved_at: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            user,
            saved_at,
            colony_name: self.colony_name.clone(),
            property_use: self.property_use,
            category: Some(self.category),
            consideration: self.result.final_consideration,
            stamp_duty: self.result.duty.stamp_duty,
            e_fees: self.result.duty.e_fees,
            tds: self.result.duty.tds,
            total_duty: self.result.duty.total_payable,
        }
    }
}

/// A DDA calculation with persistence context. The government value is what
/// gets recorded; a declared value only affects the side-by-side display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdaValuationOutcome {
    pub property_use: PropertyUse,
    pub ownership: OwnershipType,
    pub result: DdaValuationResult,
}

impl DdaValuationOutcome {
    pub fn history_record(&self, user: UserId, saved_at: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            user,
            saved_at,
            colony_name: None,
            property_use: self.property_use,
            category: None,
            consideration: self.result.government_value,
            stamp_duty: self.result.government_duty.stamp_duty,
            e_fees: self.result.government_duty.e_fees,
            tds: self.result.government_duty.tds,
            total_duty: self.result.government_duty.total_payable,
        }
    }
}

/// Service composing the two engines, the colony directory, and the history
/// and analytics boundaries.
pub struct ValuationService<H, E> {
    engine: ValuationEngine,
    dda_engine: DdaValuationEngine,
    colonies: Arc<ColonyDirectory>,
    history: Arc<H>,
    events: Arc<E>,
}

impl<H, E> ValuationService<H, E>
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    pub fn new(
        schedule: Arc<RateSchedule>,
        colonies: Arc<ColonyDirectory>,
        history: Arc<H>,
        events: Arc<E>,
    ) -> Self {
        Self {
            engine: ValuationEngine::new(schedule.clone()),
            dda_engine: DdaValuationEngine::new(schedule),
            colonies,
            history,
            events,
        }
    }

    pub fn colonies(&self) -> &ColonyDirectory {
        &self.colonies
    }

    /// Compute a plotted valuation, resolving the category from the colony
    /// directory when a colony is named, and log one analytics event.
    pub fn calculate(
        &self,
        request: &ValuationRequest,
        now: DateTime<Utc>,
    ) -> Result<ValuationOutcome, ValuationServiceError> {
        let (colony_name, category) = self.resolve_category(request)?;

        let input = ValuationInput {
            property_use: request.property_use,
            category,
            land_area_sq_yards: request.land_area_sq_yards,
            ownership: request.ownership,
            total_storeys: request.total_storeys,
            storeys_purchased: request.storeys_purchased,
            has_parking: request.has_parking,
            construction: request.construction,
            custom_consideration: request.custom_consideration,
        };
        let result = self.engine.compute_valuation(&input)?;

        let outcome = ValuationOutcome {
            colony_name,
            category,
            property_use: request.property_use,
            ownership: request.ownership,
            result,
        };

        self.log_event(CalcEvent {
            actor: request.actor.clone().map(UserId),
            recorded_at: now,
            property_use: outcome.property_use,
            colony_name: outcome.colony_name.clone(),
            category: Some(outcome.category),
            consideration: outcome.result.final_consideration,
            total_duty: outcome.result.duty.total_payable,
        });

        Ok(outcome)
    }

    /// Compute a DDA/CGHS valuation and log one analytics event.
    pub fn calculate_dda(
        &self,
        request: &DdaValuationRequest,
        now: DateTime<Utc>,
    ) -> Result<DdaValuationOutcome, ValuationServiceError> {
        let input = DdaValuationInput {
            property_use: request.property_use,
            plinth_area_sq_yards: request.plinth_area_sq_yards,
            more_than_four_storeys: request.more_than_four_storeys,
            ownership: request.ownership,
            custom_consideration: request.custom_consideration,
        };
        let result = self.dda_engine.compute_dda_valuation(&input)?;

        let outcome = DdaValuationOutcome {
            property_use: request.property_use,
            ownership: request.ownership,
            result,
        };

        self.log_event(CalcEvent {
            actor: request.actor.clone().map(UserId),
            recorded_at: now,
            property_use: outcome.property_use,
            colony_name: None,
            category: None,
            consideration: outcome.result.government_value,
            total_duty: outcome.result.government_duty.total_payable,
        });

        Ok(outcome)
    }

    /// Recompute a request and persist the summary for the acting user.
    pub fn save(
        &self,
        user: UserId,
        request: &ValuationRequest,
        now: DateTime<Utc>,
    ) -> Result<HistoryRecord, ValuationServiceError> {
        let outcome = self.calculate(request, now)?;
        let record = self.history.insert(outcome.history_record(user, now))?;
        Ok(record)
    }

    pub fn history_for(&self, user: &UserId) -> Result<Vec<HistoryRecord>, ValuationServiceError> {
        Ok(self.history.for_user(user)?)
    }

    fn resolve_category(
        &self,
        request: &ValuationRequest,
    ) -> Result<(Option<String>, RateCategory), ValuationServiceError> {
        if let Some(colony) = &request.colony {
            let record = self
                .colonies
                .lookup(colony)
                .ok_or_else(|| ValuationServiceError::UnknownColony(colony.clone()))?;
            return Ok((Some(record.name.clone()), record.category));
        }
        match request.category {
            Some(category) => Ok((None, category)),
            None => Err(ValuationServiceError::MissingCategory),
        }
    }

    // A lost analytics event must not fail the calculation that triggered it.
    fn log_event(&self, event: CalcEvent) {
        if let Err(error) = self.events.record(event) {
            warn!(%error, "analytics event dropped");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValuationServiceError {
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("unknown colony '{0}'")]
    UnknownColony(String),
    #[error("either a colony or a manual category is required")]
    MissingCategory,
    #[error(transparent)]
    History(#[from] HistoryError),
}
