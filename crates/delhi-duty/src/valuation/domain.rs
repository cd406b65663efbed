use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::duty::DutySummary;

/// Government rate category assigned to every Delhi colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RateCategory {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl RateCategory {
    pub const ALL: [RateCategory; 8] = [
        RateCategory::A,
        RateCategory::B,
        RateCategory::C,
        RateCategory::D,
        RateCategory::E,
        RateCategory::F,
        RateCategory::G,
        RateCategory::H,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RateCategory::A => "A",
            RateCategory::B => "B",
            RateCategory::C => "C",
            RateCategory::D => "D",
            RateCategory::E => "E",
            RateCategory::F => "F",
            RateCategory::G => "G",
            RateCategory::H => "H",
        }
    }
}

impl fmt::Display for RateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RateCategory {
    type Err = ValuationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RateCategory::A),
            "B" => Ok(RateCategory::B),
            "C" => Ok(RateCategory::C),
            "D" => Ok(RateCategory::D),
            "E" => Ok(RateCategory::E),
            "F" => Ok(RateCategory::F),
            "G" => Ok(RateCategory::G),
            "H" => Ok(RateCategory::H),
            _ => Err(ValuationError::UnknownCategory(value.trim().to_string())),
        }
    }
}

/// Whether the plot or flat is taxed on the residential or commercial schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyUse {
    Residential,
    Commercial,
}

impl PropertyUse {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyUse::Residential => "Residential",
            PropertyUse::Commercial => "Commercial",
        }
    }
}

impl FromStr for PropertyUse {
    type Err = ValuationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "residential" => Ok(PropertyUse::Residential),
            "commercial" => Ok(PropertyUse::Commercial),
            _ => Err(ValuationError::UnknownUse(value.trim().to_string())),
        }
    }
}

/// Buyer profile deciding the base stamp-duty slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipType {
    Male,
    Female,
    Joint,
}

impl OwnershipType {
    pub const fn label(self) -> &'static str {
        match self {
            OwnershipType::Male => "male",
            OwnershipType::Female => "female",
            OwnershipType::Joint => "joint",
        }
    }
}

impl FromStr for OwnershipType {
    type Err = ValuationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(OwnershipType::Male),
            "female" => Ok(OwnershipType::Female),
            "joint" => Ok(OwnershipType::Joint),
            _ => Err(ValuationError::UnknownOwnership(value.trim().to_string())),
        }
    }
}

/// Construction attributes, present only when the sale includes a built structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructionDetails {
    pub constructed_area_sq_yards: f64,
    pub year_built: i32,
}

/// Attributes of a plotted (non-DDA) sale.
///
/// `construction: Some(..)` carries the constructed area and build year, so the
/// "required iff construction is included" rule holds by construction rather
/// than by runtime checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub property_use: PropertyUse,
    pub category: RateCategory,
    pub land_area_sq_yards: f64,
    pub ownership: OwnershipType,
    pub total_storeys: u32,
    pub storeys_purchased: u32,
    pub has_parking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction: Option<ConstructionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_consideration: Option<f64>,
}

/// Computed value breakdown for a plotted sale, fresh per request and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub land_area_sq_meters: f64,
    pub land_value_for_share: f64,
    pub construction_value: f64,
    pub parking_cost: f64,
    pub auto_consideration: f64,
    pub final_consideration: f64,
    pub duty: DutySummary,
}

/// Attributes of a DDA/CGHS built-up flat sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdaValuationInput {
    pub property_use: PropertyUse,
    pub plinth_area_sq_yards: f64,
    pub more_than_four_storeys: bool,
    pub ownership: OwnershipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_consideration: Option<f64>,
}

/// Plinth-area slab of the DDA/CGHS built-up rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlinthBracket {
    UpTo30,
    From30To50,
    From50To100,
    Above100,
}

impl PlinthBracket {
    /// Slab for a plinth area in square metres. Boundaries are upper-inclusive.
    pub fn for_area(plinth_area_sq_meters: f64) -> Self {
        if plinth_area_sq_meters <= 30.0 {
            PlinthBracket::UpTo30
        } else if plinth_area_sq_meters <= 50.0 {
            PlinthBracket::From30To50
        } else if plinth_area_sq_meters <= 100.0 {
            PlinthBracket::From50To100
        } else {
            PlinthBracket::Above100
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PlinthBracket::UpTo30 => "up to 30 sq m",
            PlinthBracket::From30To50 => "above 30 and up to 50 sq m",
            PlinthBracket::From50To100 => "above 50 and up to 100 sq m",
            PlinthBracket::Above100 => "above 100 sq m",
        }
    }
}

/// Duty computed on a buyer-declared consideration, returned next to the
/// government-value duty so the two can be compared side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredValueDuty {
    pub consideration: f64,
    pub duty: DutySummary,
}

/// Minimum-government-value breakdown for a DDA/CGHS flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdaValuationResult {
    pub plinth_area_sq_meters: f64,
    /// Slab the rate came from; `None` when the more-than-four-storeys uniform
    /// rate overrode the slab lookup.
    pub bracket: Option<PlinthBracket>,
    pub rate_per_sq_meter: f64,
    pub government_value: f64,
    pub government_duty: DutySummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared: Option<DeclaredValueDuty>,
}

/// Validation failures surfaced synchronously to the caller. Nothing is ever
/// clamped or defaulted: a bad category or storey count must fail loudly.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("area must be greater than zero, got {0}")]
    NonPositiveArea(f64),
    #[error("total storeys must be at least 1, got {0}")]
    InvalidTotalStoreys(u32),
    #[error("storeys purchased must be between 1 and the building total ({total}), got {purchased}")]
    StoreysOutOfRange { purchased: u32, total: u32 },
    #[error("consideration must not be negative, got {0}")]
    NegativeConsideration(f64),
    #[error("unknown rate category '{0}', expected A through H")]
    UnknownCategory(String),
    #[error("unknown property use '{0}', expected residential or commercial")]
    UnknownUse(String),
    #[error("unknown ownership type '{0}', expected male, female or joint")]
    UnknownOwnership(String),
}
