//! Precision policies.
//!
//! Small helpers that keep float comparisons deterministic:
//! - A deterministic float ordering (`stable_total_cmp_f64`) for sorting.
//! - Clamps that keep degenerate values out of orderings (`finite_or_zero`).

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Replace NaN and infinities with `0.0`.
pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Finite and `>= 0`, otherwise `0.0`.
pub fn non_negative_finite(v: f64) -> f64 {
    finite_or_zero(v).max(0.0)
}
