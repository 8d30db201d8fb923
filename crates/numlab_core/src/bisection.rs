//! Root finding by interval halving.

use log::{debug, trace, warn};

use crate::control::Stopwatch;
use crate::error::{ConfigError, SolverError};
use crate::result::{Direction, IterationRecord, SolverResult, Status};
use crate::scan::{defined_on_interval, same_sign_at_ends};
use crate::traits::{Function1D, Metered1D};

const MAX_ITERATIONS: usize = 1000;

/// Finds a root of `f` bracketed by `[a, b]`.
///
/// Halving continues until `|f(mid)| < epsilon`. Once the bracket is narrower
/// than `epsilon` it keeps halving down to machine resolution relative to the
/// bracket's magnitude, so for continuous `f` the residual test is what stops
/// the run. The result's point is the last midpoint.
pub fn find_root<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<SolverResult, SolverError> {
    ConfigError::check_interval(a, b)?;
    ConfigError::check_epsilon(epsilon)?;

    let clock = Stopwatch::start();
    let meter = Metered1D::new(f);
    let eval = |x: f64| meter.at(x);

    if !defined_on_interval(&eval, a, b) {
        return Err(SolverError::UndefinedOnInterval { a, b });
    }
    if same_sign_at_ends(&eval, a, b) {
        return Err(SolverError::NoSignChange { a, b });
    }

    let fa = meter.at(a);
    let fb = meter.at(b);
    debug!("bisection on [{a}, {b}], epsilon {epsilon}");

    let finish = |mut result: SolverResult| {
        result.evaluations = meter.evaluations();
        result.elapsed_secs = clock.elapsed_secs();
        result
    };

    if fa.abs() < epsilon {
        return Ok(finish(SolverResult::at_endpoint(a, fa, epsilon)));
    }
    if fb.abs() < epsilon {
        return Ok(finish(SolverResult::at_endpoint(b, fb, epsilon)));
    }

    let (mut lo, mut hi) = (a, b);
    let mut f_lo = fa;
    let mut history = Vec::new();
    let mut value_history = Vec::new();
    let mut status = Status::IterationLimit;
    let mut mid = lo + (hi - lo) / 2.0;
    let mut f_mid = meter.at(mid);

    for iteration in 1..=MAX_ITERATIONS {
        let direction = if f_lo.signum() * f_mid.signum() < 0.0 {
            hi = mid;
            Direction::KeepLeft
        } else {
            lo = mid;
            f_lo = f_mid;
            Direction::KeepRight
        };
        let record = IterationRecord::new(iteration, vec![mid], f_mid, direction);
        let record = match history.last() {
            Some(previous) => record.relative_to(previous),
            None => record,
        };
        trace!("bisection #{iteration}: x = {mid}, f = {f_mid}, kept {direction:?}");
        history.push(record);
        value_history.push(f_mid);

        if f_mid.abs() < epsilon {
            status = Status::Converged;
            break;
        }

        if hi - lo <= resolution(lo, hi) {
            status = Status::Converged;
            break;
        }
        mid = lo + (hi - lo) / 2.0;
        f_mid = meter.at(mid);
    }

    if status == Status::IterationLimit {
        warn!("bisection stopped after {MAX_ITERATIONS} iterations, |f| = {}", f_mid.abs());
    }

    let mut result = SolverResult::new(vec![mid], f_mid, epsilon, status);
    result.iterations = history.len();
    result.final_interval = Some([lo, hi]);
    result.history = history;
    result.value_history = value_history;
    let result = finish(result);
    debug!(
        "bisection finished: root {} after {} iterations ({})",
        result.x(),
        result.iterations,
        result.status
    );
    Ok(result)
}

/// Narrowest bracket worth halving further.
fn resolution(lo: f64, hi: f64) -> f64 {
    f64::EPSILON * lo.abs().max(hi.abs()).max(1.0)
}
