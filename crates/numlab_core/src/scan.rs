//! Cheap checks run before a solver commits to an interval.

use crate::expression::is_defined;
use crate::traits::Function1D;

const SAMPLE_INTERVALS: usize = 10;
const MIN_DEFINED_SAMPLES: usize = 7;
pub(crate) const ZERO_THRESHOLD: f64 = 1e-15;

/// Whether `f` is defined on most of `[a, b]`: at least 7 of 11 evenly
/// spaced samples.
pub fn defined_on_interval<F: Function1D + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let step = (b - a) / SAMPLE_INTERVALS as f64;
    let defined = (0..=SAMPLE_INTERVALS)
        .filter(|&i| is_defined(f.value(a + i as f64 * step)))
        .count();
    defined >= MIN_DEFINED_SAMPLES
}

/// Whether `f(a)` and `f(b)` share a sign, with neither close to zero.
///
/// When this holds there is no bracketed root to look for.
pub fn same_sign_at_ends<F: Function1D + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let fa = f.value(a);
    let fb = f.value(b);
    fa * fb > 0.0 && fa.abs() > ZERO_THRESHOLD && fb.abs() > ZERO_THRESHOLD
}

/// Whether `f` takes the same value at five points spread over `[a, b]`.
pub fn is_constant<F: Function1D + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let width = b - a;
    let points = [a, a + width / 4.0, a + width / 2.0, a + 3.0 * width / 4.0, b];
    let first = f.value(points[0]);
    points[1..]
        .iter()
        .all(|&x| (f.value(x) - first).abs() < ZERO_THRESHOLD)
}

/// Best defined sample of a uniform scan with `points` subintervals.
///
/// Returns `None` when every sample is undefined.
pub fn scan_minimum<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    points: usize,
) -> Option<(f64, f64)> {
    let points = points.max(1);
    let step = (b - a) / points as f64;
    (0..=points)
        .map(|i| {
            let x = if i == points { b } else { a + i as f64 * step };
            (x, f.value(x))
        })
        .filter(|&(_, fx)| is_defined(fx))
        .min_by(|l, r| l.1.total_cmp(&r.1))
}
