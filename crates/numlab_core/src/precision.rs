//! Display precision derived from a tolerance.

const FALLBACK_PLACES: usize = 6;
const MAX_PLACES: usize = 15;

/// Number of decimals worth showing for a result computed to `epsilon`.
///
/// `ceil(-log10(epsilon))` clamped to `1..=15`; 6 when `epsilon` is not a
/// positive finite number.
pub fn decimal_places(epsilon: f64) -> usize {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return FALLBACK_PLACES;
    }
    let places = (-epsilon.log10()).ceil();
    places.clamp(1.0, MAX_PLACES as f64) as usize
}

/// Renders `value` with [`decimal_places`]`(epsilon)` decimals.
pub fn format_value(value: f64, epsilon: f64) -> String {
    format!("{value:.*}", decimal_places(epsilon))
}
