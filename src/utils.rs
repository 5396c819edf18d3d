pub mod date_parser;

/// Rounds `value` to `precision` decimal places.
pub fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

/// Clamps `value` into `[min, max]`. A NaN value maps to `min`.
pub fn fit_to_range(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}
