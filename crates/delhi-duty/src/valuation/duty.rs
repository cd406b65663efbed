use serde::{Deserialize, Serialize};

use crate::rates::RateSchedule;

use super::domain::{OwnershipType, PropertyUse, ValuationError};

/// Consideration above which the base stamp-duty rate gains a 1% surcharge.
/// Strictly greater-than; a consideration of exactly 25 lakh stays on the
/// base slab.
pub const SURCHARGE_THRESHOLD: f64 = 2_500_000.0;

/// Consideration above which TDS applies and the residential mutation fee
/// steps up. Strictly greater-than.
pub const HIGH_VALUE_THRESHOLD: f64 = 5_000_000.0;

const SURCHARGE_RATE: f64 = 0.01;
const E_FEE_RATE: f64 = 0.01;
const TDS_RATE: f64 = 0.01;
const MUTATION_FEE_STANDARD: f64 = 1_124.0;
const MUTATION_FEE_HIGH_VALUE_RESIDENTIAL: f64 = 1_136.0;

/// Stamp duty, mutation, e-fees and TDS for one consideration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutySummary {
    pub stamp_duty_rate: f64,
    pub stamp_duty: f64,
    pub mutation_fee: f64,
    pub e_fees: f64,
    pub tds: f64,
    pub total_payable: f64,
}

/// Computes the statutory duty chain on a settled consideration.
pub struct DutyCalculator<'a> {
    schedule: &'a RateSchedule,
}

impl<'a> DutyCalculator<'a> {
    pub fn new(schedule: &'a RateSchedule) -> Self {
        Self { schedule }
    }

    /// Effective stamp-duty rate: ownership base slab plus the high-value
    /// surcharge.
    pub fn stamp_duty_rate(&self, ownership: OwnershipType, consideration: f64) -> f64 {
        let base = self.schedule.stamp_duty_base_rate(ownership);
        if consideration > SURCHARGE_THRESHOLD {
            base + SURCHARGE_RATE
        } else {
            base
        }
    }

    pub fn compute_duty(
        &self,
        consideration: f64,
        ownership: OwnershipType,
        property_use: PropertyUse,
    ) -> Result<DutySummary, ValuationError> {
        if consideration < 0.0 || consideration.is_nan() {
            return Err(ValuationError::NegativeConsideration(consideration));
        }

        let stamp_duty_rate = self.stamp_duty_rate(ownership, consideration);
        let stamp_duty = consideration * stamp_duty_rate;
        let mutation_fee = mutation_fee(property_use, consideration);
        let e_fees = consideration * E_FEE_RATE + mutation_fee;
        let tds = if consideration > HIGH_VALUE_THRESHOLD {
            consideration * TDS_RATE
        } else {
            0.0
        };

        Ok(DutySummary {
            stamp_duty_rate,
            stamp_duty,
            mutation_fee,
            e_fees,
            tds,
            total_payable: stamp_duty + e_fees + tds,
        })
    }
}

/// Flat municipal fee for the ownership-record update. Only residential sales
/// above the high-value threshold pay the stepped-up fee; commercial stays on
/// the standard fee at any value.
fn mutation_fee(property_use: PropertyUse, consideration: f64) -> f64 {
    if property_use == PropertyUse::Residential && consideration > HIGH_VALUE_THRESHOLD {
        MUTATION_FEE_HIGH_VALUE_RESIDENTIAL
    } else {
        MUTATION_FEE_STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator_duty(
        consideration: f64,
        ownership: OwnershipType,
        property_use: PropertyUse,
    ) -> DutySummary {
        let schedule = RateSchedule::statutory();
        DutyCalculator::new(&schedule)
            .compute_duty(consideration, ownership, property_use)
            .expect("valid consideration")
    }

    #[test]
    fn base_rate_applies_at_exactly_the_surcharge_threshold() {
        let duty = calculator_duty(
            SURCHARGE_THRESHOLD,
            OwnershipType::Male,
            PropertyUse::Residential,
        );
        assert_eq!(duty.stamp_duty_rate, 0.06);
    }

    #[test]
    fn surcharge_applies_strictly_above_the_threshold() {
        let duty = calculator_duty(
            SURCHARGE_THRESHOLD + 1.0,
            OwnershipType::Female,
            PropertyUse::Residential,
        );
        assert_eq!(duty.stamp_duty_rate, 0.05);
    }

    #[test]
    fn joint_ownership_uses_the_middle_slab() {
        let duty = calculator_duty(1_000_000.0, OwnershipType::Joint, PropertyUse::Residential);
        assert_eq!(duty.stamp_duty_rate, 0.05);
        assert_eq!(duty.stamp_duty, 50_000.0);
    }

    #[test]
    fn residential_mutation_fee_steps_up_above_fifty_lakh() {
        let below = calculator_duty(
            HIGH_VALUE_THRESHOLD,
            OwnershipType::Male,
            PropertyUse::Residential,
        );
        assert_eq!(below.mutation_fee, 1_124.0);

        let above = calculator_duty(
            HIGH_VALUE_THRESHOLD + 1.0,
            OwnershipType::Male,
            PropertyUse::Residential,
        );
        assert_eq!(above.mutation_fee, 1_136.0);
    }

    #[test]
    fn commercial_mutation_fee_is_flat_at_any_value() {
        // Earlier drafts of the statutory worksheet applied the 1,136 fee to
        // commercial sales above 50 lakh as well; the current canonical rule
        // restricts it to residential. This test pins the canonical rule.
        let duty = calculator_duty(
            HIGH_VALUE_THRESHOLD * 4.0,
            OwnershipType::Male,
            PropertyUse::Commercial,
        );
        assert_eq!(duty.mutation_fee, 1_124.0);
    }

    #[test]
    fn tds_is_one_percent_strictly_above_fifty_lakh() {
        let below = calculator_duty(
            HIGH_VALUE_THRESHOLD,
            OwnershipType::Male,
            PropertyUse::Residential,
        );
        assert_eq!(below.tds, 0.0);

        let above = calculator_duty(10_000_000.0, OwnershipType::Male, PropertyUse::Residential);
        assert_eq!(above.tds, 100_000.0);
    }

    #[test]
    fn total_is_stamp_plus_efees_plus_tds() {
        let duty = calculator_duty(10_000_000.0, OwnershipType::Female, PropertyUse::Residential);
        assert_eq!(duty.stamp_duty_rate, 0.05);
        assert_eq!(duty.stamp_duty, 500_000.0);
        assert_eq!(duty.e_fees, 100_000.0 + 1_136.0);
        assert_eq!(duty.tds, 100_000.0);
        assert_eq!(
            duty.total_payable,
            duty.stamp_duty + duty.e_fees + duty.tds
        );
    }

    #[test]
    fn negative_consideration_is_rejected() {
        let schedule = RateSchedule::statutory();
        let result = DutyCalculator::new(&schedule).compute_duty(
            -1.0,
            OwnershipType::Male,
            PropertyUse::Residential,
        );
        assert_eq!(result, Err(ValuationError::NegativeConsideration(-1.0)));
    }
}
