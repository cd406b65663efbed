use std::sync::Arc;

use crate::rates::RateSchedule;

use super::depreciation::age_multiplier;
use super::domain::{ValuationError, ValuationInput, ValuationResult};
use super::duty::DutyCalculator;
use super::units;

/// Stateless valuation engine for plotted residential and commercial sales.
///
/// Holds only the immutable rate schedule; every computation is a pure
/// function of its input, so concurrent calls need no coordination.
pub struct ValuationEngine {
    schedule: Arc<RateSchedule>,
}

impl ValuationEngine {
    pub fn new(schedule: Arc<RateSchedule>) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn compute_valuation(
        &self,
        input: &ValuationInput,
    ) -> Result<ValuationResult, ValuationError> {
        validate_storeys(input.storeys_purchased, input.total_storeys)?;

        let land_area_sq_meters = units::to_square_meters(input.land_area_sq_yards)?;
        let circle_rate = self
            .schedule
            .circle_rate(input.property_use, input.category);
        let land_value_total = circle_rate * land_area_sq_meters;
        let land_value_for_share =
            land_value_total * land_share(input.storeys_purchased, input.total_storeys);

        let construction_rate = self
            .schedule
            .construction_rate(input.property_use, input.category);

        let mut construction_value = 0.0;
        let mut parking_cost = 0.0;
        if let Some(construction) = &input.construction {
            let constructed_area_sq_meters =
                units::to_square_meters(construction.constructed_area_sq_yards)?;
            construction_value = construction_rate
                * constructed_area_sq_meters
                * age_multiplier(construction.year_built)
                * construction_multiplier(input.storeys_purchased);

            // Parking is priced off the land footprint at the construction
            // rate; a sale without construction carries no parking charge.
            if input.has_parking {
                parking_cost = land_area_sq_meters
                    * construction_rate
                    * f64::from(input.storeys_purchased)
                    / f64::from(input.total_storeys);
            }
        }

        let auto_consideration = land_value_for_share + construction_value + parking_cost;
        let final_consideration =
            settle_consideration(auto_consideration, input.custom_consideration)?;

        let duty = DutyCalculator::new(&self.schedule).compute_duty(
            final_consideration,
            input.ownership,
            input.property_use,
        )?;

        Ok(ValuationResult {
            land_area_sq_meters,
            land_value_for_share,
            construction_value,
            parking_cost,
            auto_consideration,
            final_consideration,
            duty,
        })
    }
}

/// Fraction of the total land value attributed to the purchased storeys.
/// Buying every storey of the building must yield the full land value with no
/// apportionment loss.
fn land_share(storeys_purchased: u32, total_storeys: u32) -> f64 {
    f64::from(storeys_purchased) / f64::from(total_storeys)
}

/// Construction value scales by the number of storeys purchased, NOT by the
/// purchased/total share used for land. The asymmetry matches the notified
/// worksheet; it lives in one named function so a future correction lands in
/// exactly one place.
fn construction_multiplier(storeys_purchased: u32) -> f64 {
    f64::from(storeys_purchased)
}

/// A declared consideration above zero supersedes the computed one; zero or
/// absent means "use the computed value". Negative declarations are rejected,
/// never clamped.
fn settle_consideration(
    auto_consideration: f64,
    custom_consideration: Option<f64>,
) -> Result<f64, ValuationError> {
    match custom_consideration {
        Some(custom) if custom < 0.0 || custom.is_nan() => {
            Err(ValuationError::NegativeConsideration(custom))
        }
        Some(custom) if custom > 0.0 => Ok(custom),
        _ => Ok(auto_consideration),
    }
}

fn validate_storeys(storeys_purchased: u32, total_storeys: u32) -> Result<(), ValuationError> {
    if total_storeys < 1 {
        return Err(ValuationError::InvalidTotalStoreys(total_storeys));
    }
    if storeys_purchased < 1 || storeys_purchased > total_storeys {
        return Err(ValuationError::StoreysOutOfRange {
            purchased: storeys_purchased,
            total: total_storeys,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::domain::{
        ConstructionDetails, OwnershipType, PropertyUse, RateCategory,
    };

    fn engine() -> ValuationEngine {
        ValuationEngine::new(Arc::new(RateSchedule::statutory()))
    }

    fn bare_plot(land_area_sq_yards: f64) -> ValuationInput {
        ValuationInput {
            property_use: PropertyUse::Residential,
            category: RateCategory::G,
            land_area_sq_yards,
            ownership: OwnershipType::Male,
            total_storeys: 1,
            storeys_purchased: 1,
            has_parking: false,
            construction: None,
            custom_consideration: None,
        }
    }

    #[test]
    fn category_g_fifty_yard_plot_matches_the_worked_example() {
        let result = engine().compute_valuation(&bare_plot(50.0)).expect("valid");

        assert_eq!(result.land_area_sq_meters, 41.81);
        let expected_land = 46_200.0 * 41.81;
        assert!((result.land_value_for_share - expected_land).abs() < 1e-6);
        assert_eq!(result.construction_value, 0.0);
        assert_eq!(result.parking_cost, 0.0);
        assert_eq!(result.final_consideration, result.auto_consideration);

        // Below the 25 lakh surcharge threshold: base male slab.
        assert_eq!(result.duty.stamp_duty_rate, 0.06);
        assert!((result.duty.stamp_duty - expected_land * 0.06).abs() < 1e-6);
        assert_eq!(result.duty.mutation_fee, 1_124.0);
        assert!((result.duty.e_fees - (expected_land * 0.01 + 1_124.0)).abs() < 1e-6);
        assert_eq!(result.duty.tds, 0.0);
        assert!(
            (result.duty.total_payable - (result.duty.stamp_duty + result.duty.e_fees)).abs()
                < 1e-6
        );
    }

    #[test]
    fn buying_every_storey_takes_the_full_land_value() {
        let mut input = bare_plot(120.0);
        input.total_storeys = 4;
        input.storeys_purchased = 4;
        let full = engine().compute_valuation(&input).expect("valid");

        input.total_storeys = 1;
        input.storeys_purchased = 1;
        let single = engine().compute_valuation(&input).expect("valid");

        assert_eq!(full.land_value_for_share, single.land_value_for_share);
    }

    #[test]
    fn land_value_is_apportioned_by_storey_share() {
        let mut input = bare_plot(100.0);
        input.total_storeys = 4;
        input.storeys_purchased = 1;
        let quarter = engine().compute_valuation(&input).expect("valid");

        input.storeys_purchased = 4;
        let whole = engine().compute_valuation(&input).expect("valid");

        assert!((quarter.land_value_for_share * 4.0 - whole.land_value_for_share).abs() < 1e-6);
    }

    #[test]
    fn construction_scales_per_storey_purchased_not_by_share() {
        let mut input = bare_plot(100.0);
        input.total_storeys = 4;
        input.storeys_purchased = 2;
        input.construction = Some(ConstructionDetails {
            constructed_area_sq_yards: 60.0,
            year_built: 2010,
        });

        let result = engine().compute_valuation(&input).expect("valid");
        let constructed_m2 = units::to_square_meters(60.0).unwrap();
        // 2 storeys purchased multiplies the full per-storey value; the /4
        // share divisor applies to land only.
        let expected = 6_960.0 * constructed_m2 * 1.0 * 2.0;
        assert!((result.construction_value - expected).abs() < 1e-6);
    }

    #[test]
    fn depreciation_discounts_older_construction() {
        let mut input = bare_plot(100.0);
        input.construction = Some(ConstructionDetails {
            constructed_area_sq_yards: 60.0,
            year_built: 1975,
        });

        let result = engine().compute_valuation(&input).expect("valid");
        let constructed_m2 = units::to_square_meters(60.0).unwrap();
        let expected = 6_960.0 * constructed_m2 * 0.7;
        assert!((result.construction_value - expected).abs() < 1e-6);
    }

    #[test]
    fn parking_uses_the_land_footprint_at_the_construction_rate() {
        let mut input = bare_plot(50.0);
        input.total_storeys = 2;
        input.storeys_purchased = 1;
        input.has_parking = true;
        input.construction = Some(ConstructionDetails {
            constructed_area_sq_yards: 40.0,
            year_built: 2015,
        });

        let result = engine().compute_valuation(&input).expect("valid");
        let expected_parking = 41.81 * 6_960.0 * 1.0 / 2.0;
        assert!((result.parking_cost - expected_parking).abs() < 1e-6);
    }

    #[test]
    fn parking_without_construction_costs_nothing() {
        let mut input = bare_plot(50.0);
        input.has_parking = true;
        let result = engine().compute_valuation(&input).expect("valid");
        assert_eq!(result.parking_cost, 0.0);
    }

    #[test]
    fn custom_consideration_supersedes_the_computed_total() {
        let mut input = bare_plot(50.0);
        input.custom_consideration = Some(10_000_000.0);
        let result = engine().compute_valuation(&input).expect("valid");

        assert_eq!(result.final_consideration, 10_000_000.0);
        assert_ne!(result.final_consideration, result.auto_consideration);
        assert_eq!(result.duty.tds, 100_000.0);
        assert_eq!(result.duty.mutation_fee, 1_136.0);
    }

    #[test]
    fn zero_custom_consideration_means_not_declared() {
        let mut input = bare_plot(50.0);
        input.custom_consideration = Some(0.0);
        let result = engine().compute_valuation(&input).expect("valid");
        assert_eq!(result.final_consideration, result.auto_consideration);
    }

    #[test]
    fn negative_custom_consideration_is_rejected() {
        let mut input = bare_plot(50.0);
        input.custom_consideration = Some(-5.0);
        assert_eq!(
            engine().compute_valuation(&input),
            Err(ValuationError::NegativeConsideration(-5.0))
        );
    }

    #[test]
    fn buying_more_storeys_than_the_building_has_fails_without_clamping() {
        let mut input = bare_plot(50.0);
        input.total_storeys = 2;
        input.storeys_purchased = 3;
        assert_eq!(
            engine().compute_valuation(&input),
            Err(ValuationError::StoreysOutOfRange {
                purchased: 3,
                total: 2
            })
        );
    }

    #[test]
    fn zero_storey_inputs_fail() {
        let mut input = bare_plot(50.0);
        input.total_storeys = 0;
        input.storeys_purchased = 0;
        assert_eq!(
            engine().compute_valuation(&input),
            Err(ValuationError::InvalidTotalStoreys(0))
        );

        input.total_storeys = 2;
        assert_eq!(
            engine().compute_valuation(&input),
            Err(ValuationError::StoreysOutOfRange {
                purchased: 0,
                total: 2
            })
        );
    }

    #[test]
    fn non_positive_land_area_fails() {
        assert_eq!(
            engine().compute_valuation(&bare_plot(0.0)),
            Err(ValuationError::NonPositiveArea(0.0))
        );
    }

    #[test]
    fn identical_inputs_produce_bit_identical_results() {
        let input = {
            let mut input = bare_plot(73.5);
            input.total_storeys = 3;
            input.storeys_purchased = 2;
            input.construction = Some(ConstructionDetails {
                constructed_area_sq_yards: 55.25,
                year_built: 1984,
            });
            input.has_parking = true;
            input
        };

        let first = engine().compute_valuation(&input).expect("valid");
        let second = engine().compute_valuation(&input).expect("valid");
        assert_eq!(first, second);
        assert_eq!(
            first.duty.total_payable.to_bits(),
            second.duty.total_payable.to_bits()
        );
    }

    #[test]
    fn land_value_grows_strictly_with_land_area() {
        let smaller = engine().compute_valuation(&bare_plot(50.0)).expect("valid");
        let larger = engine().compute_valuation(&bare_plot(51.0)).expect("valid");
        assert!(larger.land_value_for_share > smaller.land_value_for_share);
    }
}
