//! Statutory rate schedule: circle rates, construction rates, DDA/CGHS
//! built-up slabs and stamp-duty base slabs.
//!
//! The schedule is loaded once at process start and treated as immutable for
//! the process lifetime. Annual government revisions are data, not code: the
//! whole structure deserializes from a JSON file, and every field is required,
//! so an incomplete revision fails at load rather than defaulting a category
//! to zero.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::valuation::{OwnershipType, PlinthBracket, PropertyUse, RateCategory};

/// Commercial circle rates are notified as a fixed multiple of the
/// residential rate for the same category; they are never tabulated
/// separately.
pub const COMMERCIAL_CIRCLE_MULTIPLIER: f64 = 3.0;

/// Per-category rupee rates. One named field per category keeps the table
/// total: a revision file missing a category is a deserialization error, and
/// a lookup cannot miss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRates {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
}

impl CategoryRates {
    pub const fn rate(&self, category: RateCategory) -> f64 {
        match category {
            RateCategory::A => self.a,
            RateCategory::B => self.b,
            RateCategory::C => self.c,
            RateCategory::D => self.d,
            RateCategory::E => self.e,
            RateCategory::F => self.f,
            RateCategory::G => self.g,
            RateCategory::H => self.h,
        }
    }
}

/// DDA/CGHS built-up rates for the four plinth-area slabs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlinthSlabRates {
    pub up_to_30: f64,
    pub from_30_to_50: f64,
    pub from_50_to_100: f64,
    pub above_100: f64,
}

impl PlinthSlabRates {
    pub const fn rate(&self, bracket: PlinthBracket) -> f64 {
        match bracket {
            PlinthBracket::UpTo30 => self.up_to_30,
            PlinthBracket::From30To50 => self.from_30_to_50,
            PlinthBracket::From50To100 => self.from_50_to_100,
            PlinthBracket::Above100 => self.above_100,
        }
    }
}

/// DDA/CGHS tables per use, plus the uniform rate that replaces the slab
/// lookup for buildings with more than four storeys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DdaRates {
    pub residential: PlinthSlabRates,
    pub commercial: PlinthSlabRates,
    pub uniform_above_four_residential: f64,
    pub uniform_above_four_commercial: f64,
}

/// Base stamp-duty fractions per ownership type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampDutyBaseRates {
    pub male: f64,
    pub female: f64,
    pub joint: f64,
}

impl StampDutyBaseRates {
    pub const fn rate(&self, ownership: OwnershipType) -> f64 {
        match ownership {
            OwnershipType::Male => self.male,
            OwnershipType::Female => self.female,
            OwnershipType::Joint => self.joint,
        }
    }
}

/// The full versionable schedule consumed by the valuation engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub residential_circle: CategoryRates,
    pub residential_construction: CategoryRates,
    pub commercial_construction: CategoryRates,
    pub dda: DdaRates,
    pub stamp_duty: StampDutyBaseRates,
}

impl RateSchedule {
    /// The notified rates in force at the time of writing.
    pub fn statutory() -> Self {
        Self {
            residential_circle: CategoryRates {
                a: 774_000.0,
                b: 245_520.0,
                c: 159_840.0,
                d: 127_680.0,
                e: 70_080.0,
                f: 56_640.0,
                g: 46_200.0,
                h: 23_280.0,
            },
            residential_construction: CategoryRates {
                a: 21_960.0,
                b: 17_400.0,
                c: 13_920.0,
                d: 11_160.0,
                e: 9_360.0,
                f: 8_220.0,
                g: 6_960.0,
                h: 3_480.0,
            },
            commercial_construction: CategoryRates {
                a: 25_200.0,
                b: 19_920.0,
                c: 15_960.0,
                d: 12_840.0,
                e: 10_800.0,
                f: 9_480.0,
                g: 8_040.0,
                h: 3_960.0,
            },
            dda: DdaRates {
                residential: PlinthSlabRates {
                    up_to_30: 50_400.0,
                    from_30_to_50: 54_480.0,
                    from_50_to_100: 66_240.0,
                    above_100: 76_200.0,
                },
                commercial: PlinthSlabRates {
                    up_to_30: 57_840.0,
                    from_30_to_50: 62_520.0,
                    from_50_to_100: 75_960.0,
                    above_100: 87_360.0,
                },
                uniform_above_four_residential: 87_840.0,
                uniform_above_four_commercial: 100_800.0,
            },
            stamp_duty: StampDutyBaseRates {
                male: 0.06,
                female: 0.04,
                joint: 0.05,
            },
        }
    }

    /// Load a revised schedule from JSON. Missing fields fail loudly.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, RateScheduleError> {
        let schedule: Self = serde_json::from_reader(reader)?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Reject schedules a revision file could plausibly get wrong: negative
    /// or zero rates, or duty fractions outside (0, 1).
    pub fn validate(&self) -> Result<(), RateScheduleError> {
        for category in RateCategory::ALL {
            for (table, rates) in [
                ("residential_circle", &self.residential_circle),
                ("residential_construction", &self.residential_construction),
                ("commercial_construction", &self.commercial_construction),
            ] {
                if !(rates.rate(category) > 0.0) {
                    return Err(RateScheduleError::NonPositiveRate {
                        table,
                        key: category.label(),
                    });
                }
            }
        }

        for (key, rate) in [
            ("male", self.stamp_duty.male),
            ("female", self.stamp_duty.female),
            ("joint", self.stamp_duty.joint),
        ] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(RateScheduleError::ImplausibleDutyFraction { key, rate });
            }
        }

        Ok(())
    }

    /// Circle (land) rate per square metre.
    pub fn circle_rate(&self, property_use: PropertyUse, category: RateCategory) -> f64 {
        let residential = self.residential_circle.rate(category);
        match property_use {
            PropertyUse::Residential => residential,
            PropertyUse::Commercial => residential * COMMERCIAL_CIRCLE_MULTIPLIER,
        }
    }

    /// Construction rate per square metre.
    pub fn construction_rate(&self, property_use: PropertyUse, category: RateCategory) -> f64 {
        match property_use {
            PropertyUse::Residential => self.residential_construction.rate(category),
            PropertyUse::Commercial => self.commercial_construction.rate(category),
        }
    }

    pub fn stamp_duty_base_rate(&self, ownership: OwnershipType) -> f64 {
        self.stamp_duty.rate(ownership)
    }

    /// Built-up slab rate for flats in buildings of up to four storeys.
    pub fn dda_bracket_rate(&self, property_use: PropertyUse, bracket: PlinthBracket) -> f64 {
        match property_use {
            PropertyUse::Residential => self.dda.residential.rate(bracket),
            PropertyUse::Commercial => self.dda.commercial.rate(bracket),
        }
    }

    /// Uniform rate applied whenever the building has more than four storeys,
    /// regardless of plinth area.
    pub fn dda_uniform_rate(&self, property_use: PropertyUse) -> f64 {
        match property_use {
            PropertyUse::Residential => self.dda.uniform_above_four_residential,
            PropertyUse::Commercial => self.dda.uniform_above_four_commercial,
        }
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self::statutory()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateScheduleError {
    #[error("rate schedule file is not valid JSON or is incomplete: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{table} rate for category {key} must be positive")]
    NonPositiveRate {
        table: &'static str,
        key: &'static str,
    },
    #[error("stamp duty fraction for {key} is implausible: {rate}")]
    ImplausibleDutyFraction { key: &'static str, rate: f64 },
}
