//! Golden-section narrowing for 1-D extrema and roots.

use log::{debug, trace, warn};

use crate::control::Stopwatch;
use crate::error::{ConfigError, SolverError};
use crate::result::{Direction, Goal, IterationRecord, SolverResult, Status};
use crate::scan::{defined_on_interval, is_constant, same_sign_at_ends, ZERO_THRESHOLD};
use crate::traits::{Function1D, Metered1D};

/// The golden ratio: φ = (1 + √5) / 2
const PHI: f64 = 1.618_033_988_749_895;

/// The inverse golden ratio: 1/φ = φ - 1
const INV_PHI: f64 = PHI - 1.0;

/// Bounds both loops when epsilon is below floating resolution.
const MAX_STEPS: usize = 10_000;

/// Outer interval `[left, right]` with two interior points placed at the
/// golden ratio.
#[derive(Debug, Clone, Copy)]
struct GoldenBracket {
    left: f64,
    right: f64,
    /// At `left + (1 - φ⁻¹) * width`.
    inner_left: f64,
    /// At `left + φ⁻¹ * width`.
    inner_right: f64,
}

impl GoldenBracket {
    fn new(left: f64, right: f64) -> Self {
        let width = right - left;
        Self {
            left,
            right,
            inner_left: left + (1.0 - INV_PHI) * width,
            inner_right: left + INV_PHI * width,
        }
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn midpoint(&self) -> f64 {
        self.left + self.width() / 2.0
    }

    /// Keeps `[left, inner_right]`; the old `inner_left` becomes `inner_right`.
    fn shrink_right(&mut self) {
        self.right = self.inner_right;
        self.inner_right = self.inner_left;
        self.inner_left = self.left + (1.0 - INV_PHI) * self.width();
    }

    /// Keeps `[inner_left, right]`; the old `inner_right` becomes `inner_left`.
    fn shrink_left(&mut self) {
        self.left = self.inner_left;
        self.inner_left = self.inner_right;
        self.inner_right = self.left + INV_PHI * self.width();
    }
}

fn validate<F: Function1D + ?Sized>(
    meter: &Metered1D<'_, F>,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<(), SolverError> {
    ConfigError::check_interval(a, b)?;
    ConfigError::check_epsilon(epsilon)?;
    if !defined_on_interval(&|x: f64| meter.at(x), a, b) {
        return Err(SolverError::UndefinedOnInterval { a, b });
    }
    Ok(())
}

fn push_record(history: &mut Vec<IterationRecord>, record: IterationRecord) {
    let record = match history.last() {
        Some(previous) => record.relative_to(previous),
        None => record,
    };
    history.push(record);
}

/// Searches `[a, b]` for the minimum or maximum of `f`.
///
/// Narrows until the bracket is shorter than `epsilon` and reports its
/// midpoint. Assumes `f` is unimodal on the interval; otherwise the result
/// is one of the local extrema.
pub fn find_extremum<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
    goal: Goal,
) -> Result<SolverResult, SolverError> {
    let meter = Metered1D::new(f);
    validate(&meter, a, b, epsilon)?;

    let clock = Stopwatch::start();
    debug!("golden section {} search on [{a}, {b}], epsilon {epsilon}", goal.label());
    if is_constant(&|x: f64| meter.at(x), a, b) {
        warn!("f looks constant on [{a}, {b}]; any point is a {}", goal.label());
    }

    let mut bracket = GoldenBracket::new(a, b);
    let mut f_left = meter.at(bracket.inner_left);
    let mut f_right = meter.at(bracket.inner_right);
    let mut history = Vec::new();
    let mut value_history = Vec::new();
    let mut steps = 0;

    while bracket.width() >= epsilon && steps < MAX_STEPS {
        steps += 1;
        let record = if goal.improves(f_left, f_right) {
            bracket.shrink_right();
            f_right = f_left;
            f_left = meter.at(bracket.inner_left);
            IterationRecord::new(steps, vec![bracket.inner_right], f_right, Direction::KeepLeft)
        } else {
            bracket.shrink_left();
            f_left = f_right;
            f_right = meter.at(bracket.inner_right);
            IterationRecord::new(steps, vec![bracket.inner_left], f_left, Direction::KeepRight)
        };
        trace!(
            "golden #{steps}: [{}, {}], best meter {} -> {}",
            bracket.left,
            bracket.right,
            record.point[0],
            record.value
        );
        value_history.push(record.value);
        push_record(&mut history, record);
    }

    let converged = bracket.width() < epsilon;
    if !converged {
        warn!("golden section stopped after {MAX_STEPS} steps, width {}", bracket.width());
    }

    let x = bracket.midpoint();
    let status = if converged { Status::Converged } else { Status::IterationLimit };
    let mut result = SolverResult::new(vec![x], meter.at(x), epsilon, status);
    result.iterations = steps;
    result.boundary_warning = x - a < epsilon || b - x < epsilon;
    result.final_interval = Some([bracket.left, bracket.right]);
    result.history = history;
    result.value_history = value_history;
    result.evaluations = meter.evaluations();
    result.elapsed_secs = clock.elapsed_secs();
    if result.boundary_warning {
        warn!("golden section {} at x = {x} lies on the interval boundary", goal.label());
    }
    debug!("golden section finished: x = {x}, f = {} after {steps} steps", result.value);
    Ok(result)
}

/// Finds a root of `f` on `[a, b]` by golden-ratio splits.
///
/// Each step evaluates the point `a + φ⁻¹ (b - a)` and keeps the part that
/// still holds the sign change. Requires `f(a)` and `f(b)` of opposite sign,
/// unless one of them is already zero, in which case that end is returned.
pub fn find_root<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<SolverResult, SolverError> {
    let meter = Metered1D::new(f);
    validate(&meter, a, b, epsilon)?;
    if same_sign_at_ends(&|x: f64| meter.at(x), a, b) {
        return Err(SolverError::NoSignChange { a, b });
    }

    let clock = Stopwatch::start();
    debug!("golden section root search on [{a}, {b}], epsilon {epsilon}");

    // A near-zero end passes the sign check but has no usable sign.
    let is_root = |fx: f64| fx.abs() < epsilon || fx.abs() <= ZERO_THRESHOLD;
    let fa = meter.at(a);
    let fb = meter.at(b);
    for (x, fx) in [(a, fa), (b, fb)] {
        if is_root(fx) {
            debug!("golden section root at the interval end x = {x}");
            let mut result = SolverResult::at_endpoint(x, fx, epsilon);
            result.final_interval = Some([a, b]);
            result.evaluations = meter.evaluations();
            result.elapsed_secs = clock.elapsed_secs();
            return Ok(result);
        }
    }

    let (mut lo, mut hi) = (a, b);
    let mut f_lo = fa;
    let mut history = Vec::new();
    let mut value_history = Vec::new();
    let mut steps = 0;

    while hi - lo >= epsilon && steps < MAX_STEPS {
        steps += 1;
        let x = lo + INV_PHI * (hi - lo);
        let fx = meter.at(x);
        let direction = if fx == 0.0 {
            lo = x;
            hi = x;
            Direction::KeepLeft
        } else if f_lo.signum() * fx.signum() < 0.0 {
            hi = x;
            Direction::KeepLeft
        } else {
            lo = x;
            f_lo = fx;
            Direction::KeepRight
        };
        trace!("golden root #{steps}: x = {x}, f = {fx}, bracket [{lo}, {hi}]");
        value_history.push(fx);
        push_record(&mut history, IterationRecord::new(steps, vec![x], fx, direction));
    }

    let converged = hi - lo < epsilon;
    if !converged {
        warn!("golden section root search stopped after {MAX_STEPS} steps");
    }

    let x = lo + (hi - lo) / 2.0;
    let status = if converged { Status::Converged } else { Status::IterationLimit };
    let mut result = SolverResult::new(vec![x], meter.at(x), epsilon, status);
    result.iterations = steps;
    result.final_interval = Some([lo, hi]);
    result.history = history;
    result.value_history = value_history;
    result.evaluations = meter.evaluations();
    result.elapsed_secs = clock.elapsed_secs();
    debug!("golden section root: x = {x}, f = {} after {steps} steps", result.value);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn bracket_initialized_with_golden_ratio_points() {
        let bracket = GoldenBracket::new(0.0, 1.0);
        assert_relative_eq!(bracket.inner_left, 1.0 - INV_PHI);
        assert_relative_eq!(bracket.inner_right, INV_PHI);
        assert_relative_eq!(bracket.inner_left / (1.0 - bracket.inner_left), INV_PHI);
    }

    #[test]
    fn shrinking_reuses_an_interior_point() {
        let mut bracket = GoldenBracket::new(0.0, 1.0);
        let old_inner_right = bracket.inner_right;
        bracket.shrink_left();
        assert_relative_eq!(bracket.left, 1.0 - INV_PHI);
        assert_relative_eq!(bracket.inner_left, old_inner_right);
        assert_relative_eq!(bracket.inner_right, bracket.left + INV_PHI * bracket.width());

        let old_inner_left = bracket.inner_left;
        bracket.shrink_right();
        assert_relative_eq!(bracket.inner_right, old_inner_left);
    }

    #[test]
    fn finds_minimum_and_maximum() {
        let parabola = |x: f64| (x - 1.0).powi(2) + 3.0;
        let min = find_extremum(&parabola, -2.0, 4.0, 1e-6, Goal::Minimize).expect("should run");
        assert!(min.converged);
        assert_abs_diff_eq!(min.x(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(min.value, 3.0, epsilon = 1e-9);
        let [lo, hi] = min.final_interval.expect("interval is reported");
        assert!(hi - lo < 1e-6);
        assert!(!min.boundary_warning);

        let sin = Expression::parse_1d("sin(x)").expect("should compile");
        let max = find_extremum(&sin, 0.0, 3.0, 1e-6, Goal::Maximize).expect("should run");
        assert_abs_diff_eq!(max.x(), std::f64::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn monotone_function_flags_boundary() {
        let line = |x: f64| 2.0 * x;
        let result = find_extremum(&line, 0.0, 1.0, 1e-4, Goal::Minimize).expect("should run");
        assert!(result.boundary_warning);
        assert!(result.x() < 1e-4);
    }

    #[test]
    fn constant_function_still_converges() {
        let flat = |_: f64| 7.0;
        let result = find_extremum(&flat, 0.0, 1.0, 1e-3, Goal::Maximize).expect("should run");
        assert!(result.converged);
        assert_eq!(result.value, 7.0);
    }

    #[test]
    fn undefined_points_never_win() {
        // sqrt(x) is undefined left of zero; the maximum search must move right.
        let f = Expression::parse_1d("sqrt(x) * exp(-x)").expect("should compile");
        let result = find_extremum(&f, -0.5, 4.0, 1e-6, Goal::Maximize).expect("should run");
        assert_abs_diff_eq!(result.x(), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn root_variant_keeps_sign_change() {
        let f = |x: f64| x * x * x - x - 2.0;
        let result = find_root(&f, 1.0, 2.0, 1e-8).expect("should converge");
        assert_abs_diff_eq!(result.x(), 1.521_379_706_8, epsilon = 1e-7);
        assert!(result.converged);

        let positive = |x: f64| x * x + 1.0;
        assert_eq!(
            find_root(&positive, -1.0, 1.0, 1e-6),
            Err(SolverError::NoSignChange { a: -1.0, b: 1.0 })
        );
    }

    #[test]
    fn root_on_an_interval_end_is_returned() {
        let line = |x: f64| x;
        let left = find_root(&line, 0.0, 1.0, 1e-6).expect("should converge");
        assert!(left.converged);
        assert_eq!(left.x(), 0.0);
        assert!(line(left.x()).abs() < 1e-6);
        assert_eq!(left.iterations, 0);

        let right = find_root(&|x: f64| x - 1.0, -2.0, 1.0, 1e-6).expect("should converge");
        assert_eq!(right.x(), 1.0);
        assert_eq!(right.value, 0.0);

        // Below epsilon but not zero, and on the same side as f(b).
        let nudged = |x: f64| x + 1e-16;
        let tiny = find_root(&nudged, 0.0, 1.0, 1e-20).expect("should converge");
        assert_eq!(tiny.x(), 0.0);
    }
}
