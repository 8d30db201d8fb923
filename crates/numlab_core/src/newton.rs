//! 1-D minimization with finite-difference Newton steps.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::control::Stopwatch;
use crate::error::{ConfigError, SolverError};
use crate::expression::is_defined;
use crate::result::{Derivatives, Direction, IterationRecord, Side, SolverResult, Status, Tangent};
use crate::scan::scan_minimum;
use crate::traits::{Function1D, Metered1D};

const FIRST_STEP: f64 = 1e-6;
const SECOND_STEP: f64 = 1e-4;
const GRADIENT_RATE: f64 = 0.1;
const RESCUE_SUBINTERVALS: usize = 50;

/// Settings for [`find_minimum`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    /// Initial guess, clamped into `[a, b]`.
    pub x0: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
    pub a: f64,
    pub b: f64,
    /// Record every step with its tangent line.
    pub track_steps: bool,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            x0: 0.0,
            epsilon: 1e-4,
            max_iterations: 100,
            a: -10.0,
            b: 10.0,
            track_steps: false,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_interval(self.a, self.b)?;
        ConfigError::check_epsilon(self.epsilon)?;
        ConfigError::check_max_iterations(self.max_iterations)?;
        if !self.x0.is_finite() {
            return Err(ConfigError::StartPoint);
        }
        Ok(())
    }
}

/// Central difference `f'(x)` with step `1e-6`; `1.0` when it cannot be
/// computed.
pub fn first_derivative<F: Function1D + ?Sized>(f: &F, x: f64) -> f64 {
    let plus = f.value(x + FIRST_STEP);
    let minus = f.value(x - FIRST_STEP);
    if !is_defined(plus) || !is_defined(minus) {
        return 1.0;
    }
    finite_or_one((plus - minus) / (2.0 * FIRST_STEP))
}

/// Central difference `f''(x)` with step `1e-4`; `1.0` when it cannot be
/// computed.
pub fn second_derivative<F: Function1D + ?Sized>(f: &F, x: f64) -> f64 {
    let here = f.value(x);
    let plus = f.value(x + SECOND_STEP);
    let minus = f.value(x - SECOND_STEP);
    if !is_defined(here) || !is_defined(plus) || !is_defined(minus) {
        return 1.0;
    }
    finite_or_one((plus - 2.0 * here + minus) / (SECOND_STEP * SECOND_STEP))
}

fn finite_or_one(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        1.0
    }
}

/// How a point looks under the minimum tests.
fn classify(x: f64, d: Derivatives, settings: &NewtonSettings) -> Option<Status> {
    let eps = settings.epsilon;
    if (x - settings.a).abs() < eps && d.first > 0.0 {
        Some(Status::BoundaryMinimum(Side::Left))
    } else if (x - settings.b).abs() < eps && d.first < 0.0 {
        Some(Status::BoundaryMinimum(Side::Right))
    } else if d.first.abs() < eps && d.second > 0.0 {
        Some(Status::LocalMinimum)
    } else {
        None
    }
}

/// Minimizes `f` on `[a, b]` starting from `x0`.
///
/// When the iteration cap runs out before a minimum is recognised, the best
/// of the two ends and a 50-interval scan is reported instead, with
/// `converged == false`.
pub fn find_minimum<F: Function1D + ?Sized>(
    f: &F,
    settings: &NewtonSettings,
) -> Result<SolverResult, SolverError> {
    settings.validate()?;

    let clock = Stopwatch::start();
    let meter = Metered1D::new(f);
    let eval = |x: f64| meter.at(x);
    let derivatives = |x: f64| Derivatives {
        first: first_derivative(&eval, x),
        second: second_derivative(&eval, x),
    };
    let NewtonSettings { a, b, epsilon, .. } = *settings;
    let max_step = (b - a) / 10.0;

    let mut x = settings.x0.clamp(a, b);
    let mut history = Vec::new();
    let mut value_history = Vec::new();
    let mut outcome = None;
    let mut iterations = 0;
    debug!("newton minimization on [{a}, {b}] from x0 = {x}, epsilon {epsilon}");

    for i in 0..settings.max_iterations {
        iterations = i + 1;
        let fx = meter.at(x);
        let d = derivatives(x);
        value_history.push(fx);

        if let Some(status) = classify(x, d, settings) {
            if settings.track_steps {
                history.push(step_record(i, x, fx, d, Direction::Stay));
            }
            outcome = Some(status);
            break;
        }

        let (step, direction) = if d.second.abs() > epsilon {
            let newton = -d.first / d.second;
            (newton.clamp(-max_step, max_step), Direction::Newton)
        } else {
            (-GRADIENT_RATE * d.first, Direction::Gradient)
        };
        let next = (x + step).clamp(a, b);
        trace!(
            "newton #{iterations}: x = {x}, f = {fx}, f' = {}, f'' = {}, next {next}",
            d.first,
            d.second
        );
        if settings.track_steps {
            history.push(step_record(i, x, fx, d, direction));
        }

        if (next - x).abs() < epsilon {
            x = next;
            outcome = Some(classify(x, derivatives(x), settings).unwrap_or(Status::NotAMinimum));
            break;
        }
        x = next;
    }

    let (status, converged) = match outcome {
        Some(status) => (status, true),
        None => {
            let (rescued, is_minimum) = rescue(&eval, settings);
            warn!(
                "newton did not settle in {} iterations; scan picked x = {rescued}",
                settings.max_iterations
            );
            x = rescued;
            (Status::Rescued { is_minimum }, false)
        }
    };
    let is_minimum = match status {
        Status::LocalMinimum | Status::BoundaryMinimum(_) => true,
        Status::Rescued { is_minimum } => is_minimum,
        _ => false,
    };

    let final_derivatives = derivatives(x);
    let mut result = SolverResult::new(vec![x], meter.at(x), epsilon, status);
    result.iterations = iterations;
    result.converged = converged;
    result.boundary_warning = (x - a).abs() < epsilon || (x - b).abs() < epsilon;
    result.is_minimum = Some(is_minimum);
    result.derivatives = Some(final_derivatives);
    result.history = history;
    result.value_history = value_history;
    result.evaluations = meter.evaluations();
    result.elapsed_secs = clock.elapsed_secs();
    debug!("newton finished: x = {x}, f = {} ({})", result.value, result.status);
    Ok(result)
}

fn step_record(index: usize, x: f64, fx: f64, d: Derivatives, direction: Direction) -> IterationRecord {
    let mut record = IterationRecord::new(index, vec![x], fx, direction);
    record.derivatives = Some(d);
    if is_defined(fx) {
        record.tangent = Some(Tangent {
            slope: d.first,
            intercept: fx - d.first * x,
        });
    }
    record
}

/// Best of `a`, `b` and a uniform scan, and whether it passes the minimum
/// test.
fn rescue<F: Function1D + ?Sized>(f: &F, settings: &NewtonSettings) -> (f64, bool) {
    let NewtonSettings { a, b, epsilon, .. } = *settings;
    let fa = f.value(a);
    let fb = f.value(b);
    let (scan_x, scan_value) = scan_minimum(f, a, b, RESCUE_SUBINTERVALS).unwrap_or((a, fa));

    let x = if fa < scan_value && fa < fb {
        a
    } else if fb < scan_value && fb < fa {
        b
    } else {
        scan_x
    };
    let is_minimum = first_derivative(f, x).abs() < epsilon && second_derivative(f, x) > 0.0;
    (x, is_minimum)
}
