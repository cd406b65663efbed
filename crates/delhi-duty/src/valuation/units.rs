use super::domain::ValuationError;

/// One square yard in square metres, per the rate notification.
pub const SQ_YARDS_TO_SQ_METERS: f64 = 0.8361;

/// Convert a user-facing area in square yards to the calculation unit.
///
/// Committed rounding policy: round half-up to two decimal places. The same
/// policy applies to every conversion (land, constructed and plinth area) so
/// the downstream currency math never mixes rounding modes.
pub fn to_square_meters(area_sq_yards: f64) -> Result<f64, ValuationError> {
    if !(area_sq_yards > 0.0) {
        return Err(ValuationError::NonPositiveArea(area_sq_yards));
    }
    Ok(round_two_decimals(area_sq_yards * SQ_YARDS_TO_SQ_METERS))
}

fn round_two_decimals(value: f64) -> f64 {
    // f64::round is half-away-from-zero, which is half-up for the positive
    // areas accepted here.
    (value * 100.0).round() / 100.0
}
