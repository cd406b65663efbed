use std::sync::Arc;

use crate::rates::RateSchedule;

use super::domain::{
    DdaValuationInput, DdaValuationResult, DeclaredValueDuty, PlinthBracket, ValuationError,
};
use super::duty::DutyCalculator;
use super::units;

/// Valuation engine for DDA/CGHS built-up flats.
///
/// Parallel to [`super::ValuationEngine`] but without the land/construction
/// decomposition: the minimum government value is plinth area times a slab (or
/// uniform) rate.
pub struct DdaValuationEngine {
    schedule: Arc<RateSchedule>,
}

impl DdaValuationEngine {
    pub fn new(schedule: Arc<RateSchedule>) -> Self {
        Self { schedule }
    }

    pub fn compute_dda_valuation(
        &self,
        input: &DdaValuationInput,
    ) -> Result<DdaValuationResult, ValuationError> {
        let plinth_area_sq_meters = units::to_square_meters(input.plinth_area_sq_yards)?;

        // The uniform rate wins outright when the building exceeds four
        // storeys; the slab the area would otherwise fall in is irrelevant.
        let (bracket, rate_per_sq_meter) = if input.more_than_four_storeys {
            (None, self.schedule.dda_uniform_rate(input.property_use))
        } else {
            let bracket = PlinthBracket::for_area(plinth_area_sq_meters);
            (
                Some(bracket),
                self.schedule.dda_bracket_rate(input.property_use, bracket),
            )
        };

        let government_value = plinth_area_sq_meters * rate_per_sq_meter;

        let calculator = DutyCalculator::new(&self.schedule);
        let government_duty =
            calculator.compute_duty(government_value, input.ownership, input.property_use)?;

        // A declared value does not replace the government calculation; both
        // are returned so the registering party can compare them.
        let declared = match input.custom_consideration {
            Some(declared) if declared < 0.0 || declared.is_nan() => {
                return Err(ValuationError::NegativeConsideration(declared));
            }
            Some(declared) if declared > 0.0 => Some(DeclaredValueDuty {
                consideration: declared,
                duty: calculator.compute_duty(declared, input.ownership, input.property_use)?,
            }),
            _ => None,
        };

        Ok(DdaValuationResult {
            plinth_area_sq_meters,
            bracket,
            rate_per_sq_meter,
            government_value,
            government_duty,
            declared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::domain::{OwnershipType, PropertyUse};

    fn engine() -> DdaValuationEngine {
        DdaValuationEngine::new(Arc::new(RateSchedule::statutory()))
    }

    fn flat(plinth_area_sq_yards: f64) -> DdaValuationInput {
        DdaValuationInput {
            property_use: PropertyUse::Residential,
            plinth_area_sq_yards,
            more_than_four_storeys: false,
            ownership: OwnershipType::Male,
            custom_consideration: None,
        }
    }

    #[test]
    fn slab_rate_applies_up_to_four_storeys() {
        // 100 sq yd -> 83.61 sq m -> 50-100 slab.
        let result = engine().compute_dda_valuation(&flat(100.0)).expect("valid");
        assert_eq!(result.plinth_area_sq_meters, 83.61);
        assert_eq!(result.bracket, Some(PlinthBracket::From50To100));
        assert_eq!(result.rate_per_sq_meter, 66_240.0);
        assert!((result.government_value - 83.61 * 66_240.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_rate_wins_when_more_than_four_storeys() {
        let mut input = flat(100.0);
        input.more_than_four_storeys = true;
        let result = engine().compute_dda_valuation(&input).expect("valid");

        // The 50-100 slab rate (66,240) would otherwise apply; the flag must
        // force the uniform residential rate instead.
        assert_eq!(result.bracket, None);
        assert_eq!(result.rate_per_sq_meter, 87_840.0);
    }

    #[test]
    fn uniform_rate_wins_even_for_small_flats() {
        let mut input = flat(50.0);
        input.more_than_four_storeys = true;
        let result = engine().compute_dda_valuation(&input).expect("valid");
        assert_eq!(result.rate_per_sq_meter, 87_840.0);
    }

    #[test]
    fn commercial_flats_use_the_commercial_tables() {
        let mut input = flat(20.0);
        input.property_use = PropertyUse::Commercial;
        let result = engine().compute_dda_valuation(&input).expect("valid");
        assert_eq!(result.bracket, Some(PlinthBracket::UpTo30));
        assert_eq!(result.rate_per_sq_meter, 57_840.0);
    }

    #[test]
    fn declared_value_is_computed_alongside_not_instead() {
        let mut input = flat(100.0);
        input.custom_consideration = Some(9_000_000.0);
        let result = engine().compute_dda_valuation(&input).expect("valid");

        // Government duty still present and based on the government value.
        assert!(result.government_duty.stamp_duty > 0.0);

        let declared = result.declared.expect("declared duty returned");
        assert_eq!(declared.consideration, 9_000_000.0);
        assert_eq!(declared.duty.tds, 90_000.0);
        assert_eq!(declared.duty.mutation_fee, 1_136.0);
    }

    #[test]
    fn zero_declared_value_is_treated_as_absent() {
        let mut input = flat(100.0);
        input.custom_consideration = Some(0.0);
        let result = engine().compute_dda_valuation(&input).expect("valid");
        assert!(result.declared.is_none());
    }

    #[test]
    fn negative_declared_value_is_rejected() {
        let mut input = flat(100.0);
        input.custom_consideration = Some(-1.0);
        assert!(matches!(
            engine().compute_dda_valuation(&input),
            Err(ValuationError::NegativeConsideration(_))
        ));
    }

    #[test]
    fn non_positive_plinth_area_is_rejected() {
        assert!(matches!(
            engine().compute_dda_valuation(&flat(0.0)),
            Err(ValuationError::NonPositiveArea(_))
        ));
    }
}
