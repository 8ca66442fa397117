//! Distance/confidence calibration shared by the router and the summarizer.

use crate::errors::ProviderError;

/// Upper bound of the provider distance range; 0 means identical meaning.
pub const MAX_DISTANCE: f64 = 2.0;

/// Below this confidence the best-matching intent is reported as Unknown.
pub const CONFIDENCE_THRESHOLD: f64 = 0.35;

/// Rejects NaN and anything outside `[0, MAX_DISTANCE]` instead of clamping.
pub fn checked_distance(distance: f64) -> Result<f64, ProviderError> {
    if distance.is_nan() || !(0.0..=MAX_DISTANCE).contains(&distance) {
        return Err(ProviderError::OutOfRange(distance));
    }
    Ok(distance)
}

/// Linear map of distance onto `[0, 1]`: 0 -> 1.0, 2 -> 0.0.
pub fn distance_to_confidence(distance: f64) -> f64 {
    1.0 - (distance / MAX_DISTANCE)
}

pub fn meets_threshold(confidence: f64) -> bool {
    confidence >= CONFIDENCE_THRESHOLD
}
