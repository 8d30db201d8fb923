//! Two-variable extremum search by alternating axis-aligned line searches.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::control::{CancelToken, Stopwatch};
use crate::error::{ConfigError, SolverError};
use crate::expression::is_defined;
use crate::result::{Direction, Goal, IterationRecord, SolverResult, Status};
use crate::traits::{Function2D, Metered2D};

/// Settings for [`find_extremum`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescentSettings {
    /// Search box along x, `[min, max]`.
    pub x_range: [f64; 2],
    /// Search box along y, `[min, max]`.
    pub y_range: [f64; 2],
    pub epsilon: f64,
    pub goal: Goal,
    /// Starting point; the box center when absent. Clamped into the box.
    pub start: Option<[f64; 2]>,
    pub max_iterations: usize,
    /// Longest move a single line search may make.
    pub lambda: f64,
}

impl Default for DescentSettings {
    fn default() -> Self {
        Self {
            x_range: [-5.0, 5.0],
            y_range: [-5.0, 5.0],
            epsilon: 1e-3,
            goal: Goal::Minimize,
            start: None,
            max_iterations: 1000,
            lambda: 1.0,
        }
    }
}

impl DescentSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_interval(self.x_range[0], self.x_range[1])?;
        ConfigError::check_interval(self.y_range[0], self.y_range[1])?;
        ConfigError::check_epsilon(self.epsilon)?;
        if !self.lambda.is_finite() || self.lambda <= 0.0 {
            return Err(ConfigError::Lambda(self.lambda));
        }
        ConfigError::check_max_iterations(self.max_iterations)?;
        if let Some([x, y]) = self.start {
            if !x.is_finite() || !y.is_finite() {
                return Err(ConfigError::StartPoint);
            }
        }
        Ok(())
    }

    fn start_point(&self) -> [f64; 2] {
        let [x0, x1] = self.x_range;
        let [y0, y1] = self.y_range;
        let [x, y] = self.start.unwrap_or([(x0 + x1) / 2.0, (y0 + y1) / 2.0]);
        [x.clamp(x0, x1), y.clamp(y0, y1)]
    }

    fn near_boundary(&self, [x, y]: [f64; 2]) -> bool {
        let eps = self.epsilon;
        let near = |v: f64, [lo, hi]: [f64; 2]| (v - lo).abs() < eps || (v - hi).abs() < eps;
        near(x, self.x_range) || near(y, self.y_range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    X,
    Y,
}

/// Searches the box for an extremum of `f`.
pub fn find_extremum<F: Function2D + ?Sized>(
    f: &F,
    settings: &DescentSettings,
) -> Result<SolverResult, SolverError> {
    find_extremum_cancellable(f, settings, &CancelToken::never())
}

/// Same as [`find_extremum`], checking `cancel` once per iteration.
pub fn find_extremum_cancellable<F: Function2D + ?Sized>(
    f: &F,
    settings: &DescentSettings,
    cancel: &CancelToken,
) -> Result<SolverResult, SolverError> {
    settings.validate()?;

    let clock = Stopwatch::start();
    let meter = Metered2D::new(f);
    let goal = settings.goal;
    let eps = settings.epsilon;

    let mut current = settings.start_point();
    let mut value = meter.at(current[0], current[1]);
    let mut best = (current, value);
    debug!(
        "coordinate descent ({}) from ({}, {}), epsilon {eps}, lambda {}",
        goal.label(),
        current[0],
        current[1],
        settings.lambda
    );

    let mut history = vec![IterationRecord::new(0, current.to_vec(), value, Direction::Start)];
    let mut value_history = vec![value];
    let mut status = Status::IterationLimit;
    let mut previous_distance = f64::INFINITY;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        if cancel.is_cancelled() {
            warn!("coordinate descent cancelled after {iterations} iterations");
            return Err(SolverError::Cancelled);
        }
        iterations += 1;
        let axis = if iterations % 2 == 1 { Axis::X } else { Axis::Y };
        let before = current;

        if let Some((coordinate, candidate)) = axis_step(&meter, settings, axis, current, value) {
            match axis {
                Axis::X => current[0] = coordinate,
                Axis::Y => current[1] = coordinate,
            }
            value = candidate;
        }
        if goal.improves(value, best.1) {
            best = (current, value);
        }

        let distance = (current[0] - before[0]).hypot(current[1] - before[1]);
        let direction = match (axis, distance > 0.0) {
            (_, false) => Direction::Stay,
            (Axis::X, true) => Direction::AxisX,
            (Axis::Y, true) => Direction::AxisY,
        };
        let record = IterationRecord::new(iterations, current.to_vec(), value, direction);
        let record = match history.last() {
            Some(previous) => record.relative_to(previous),
            None => record,
        };
        trace!(
            "descent #{iterations}: ({}, {}) -> {value}, moved {distance}",
            current[0],
            current[1]
        );
        history.push(record);
        value_history.push(value);

        if !is_defined(value) {
            warn!("coordinate descent hit an undefined value; keeping the best point");
            status = Status::Interrupted;
            break;
        }
        // Both axes had their turn without moving further than 2 epsilon.
        if distance < 2.0 * eps && previous_distance < 2.0 * eps {
            status = Status::Converged;
            break;
        }
        previous_distance = distance;
    }

    if status == Status::IterationLimit {
        warn!("coordinate descent reached {} iterations", settings.max_iterations);
    }
    let (point, best_value) = best;
    let mut result = SolverResult::new(point.to_vec(), best_value, eps, status);
    result.iterations = iterations;
    result.boundary_warning = settings.near_boundary(point);
    result.history = history;
    result.value_history = value_history;
    result.evaluations = meter.evaluations();
    result.elapsed_secs = clock.elapsed_secs();
    if result.boundary_warning {
        warn!(
            "coordinate descent {} at ({}, {}) is on the search box boundary",
            goal.label(),
            point[0],
            point[1]
        );
    }
    debug!(
        "coordinate descent finished: ({}, {}) -> {best_value} after {iterations} iterations ({})",
        point[0],
        point[1],
        result.status
    );
    Ok(result)
}

/// One line search along `axis`. Returns the new coordinate and its value
/// when it strictly improves on `value`.
fn axis_step<F: Function2D + ?Sized>(
    meter: &Metered2D<'_, F>,
    settings: &DescentSettings,
    axis: Axis,
    current: [f64; 2],
    value: f64,
) -> Option<(f64, f64)> {
    let goal = settings.goal;
    let eps = settings.epsilon;
    let (position, [lower, upper]) = match axis {
        Axis::X => (current[0], settings.x_range),
        Axis::Y => (current[1], settings.y_range),
    };
    let along = |t: f64| match axis {
        Axis::X => meter.at(t, current[1]),
        Axis::Y => meter.at(current[0], t),
    };

    let f_back = along((position - eps).max(lower));
    let f_forward = along((position + eps).min(upper));
    let (start, end) = if goal.improves(f_forward, f_back) {
        (position, (position + settings.lambda).min(upper))
    } else {
        ((position - settings.lambda).max(lower), position)
    };
    if end - start <= eps {
        return None;
    }

    let coordinate = refine(&along, start, end, eps, goal);
    let candidate = along(coordinate);
    goal.improves(candidate, value).then_some((coordinate, candidate))
}

/// Narrows `[start, end]` to width `epsilon` by testing the local slope at
/// the midpoint.
fn refine(along: &impl Fn(f64) -> f64, start: f64, end: f64, epsilon: f64, goal: Goal) -> f64 {
    let (mut left, mut right) = (start, end);
    while right - left > epsilon {
        let mid = (left + right) / 2.0;
        if goal.improves(along(mid + epsilon / 10.0), along(mid)) {
            left = mid;
        } else {
            right = mid;
        }
    }
    (left + right) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Expression, UNDEFINED};
    use approx::assert_abs_diff_eq;

    fn unit_box(epsilon: f64) -> DescentSettings {
        DescentSettings {
            x_range: [-2.0, 2.0],
            y_range: [-2.0, 2.0],
            epsilon,
            ..DescentSettings::default()
        }
    }

    #[test]
    fn minimizes_paraboloid() {
        let f = Expression::parse_2d("x^2 + y^2").expect("should compile");
        let settings = DescentSettings {
            start: Some([1.5, 1.5]),
            ..unit_box(1e-3)
        };
        let result = find_extremum(&f, &settings).expect("should run");
        assert!(result.converged);
        assert_abs_diff_eq!(result.x(), 0.0, epsilon = 1e-2);
        assert_abs_diff_eq!(result.y().expect("2-D point"), 0.0, epsilon = 1e-2);
        assert!(result.value < 1e-4);
        assert!(!result.boundary_warning);
        assert_eq!(result.history[0].direction, Direction::Start);
        assert_eq!(result.history.len(), result.iterations + 1);
        assert_eq!(result.value_history.len(), result.history.len());
        assert!(result.evaluations > result.iterations);
    }

    #[test]
    fn does_not_stop_before_second_axis_moves() {
        // x is already optimal at the start; y is not.
        let f = |x: f64, y: f64| x * x + (y - 1.0).powi(2);
        let settings = DescentSettings {
            start: Some([0.0, -1.5]),
            ..unit_box(1e-3)
        };
        let result = find_extremum(&f, &settings).expect("should run");
        assert_abs_diff_eq!(result.y().expect("2-D point"), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn maximizes_and_flags_boundary() {
        let f = |x: f64, y: f64| x + y;
        let settings = DescentSettings {
            goal: Goal::Maximize,
            ..unit_box(1e-3)
        };
        let result = find_extremum(&f, &settings).expect("should run");
        assert_abs_diff_eq!(result.x(), 2.0, epsilon = 1e-2);
        assert_abs_diff_eq!(result.y().expect("2-D point"), 2.0, epsilon = 1e-2);
        assert!(result.boundary_warning);
    }

    #[test]
    fn start_is_clamped_into_box() {
        let f = |x: f64, y: f64| (x - 1.0).powi(2) + (y - 1.0).powi(2);
        let settings = DescentSettings {
            start: Some([10.0, -10.0]),
            max_iterations: 1,
            ..unit_box(1e-3)
        };
        let result = find_extremum(&f, &settings).expect("should run");
        assert_eq!(result.history[0].point, vec![2.0, -2.0]);
        assert!(!result.converged);
        assert_eq!(result.status, Status::IterationLimit);
    }

    #[test]
    fn undefined_start_interrupts() {
        let f = |_: f64, _: f64| UNDEFINED;
        let result = find_extremum(&f, &unit_box(1e-3)).expect("should run");
        assert_eq!(result.status, Status::Interrupted);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn rejects_invalid_settings() {
        let f = |x: f64, y: f64| x + y;
        let bad_lambda = DescentSettings {
            lambda: 0.0,
            ..DescentSettings::default()
        };
        assert_eq!(
            find_extremum(&f, &bad_lambda),
            Err(SolverError::Config(ConfigError::Lambda(0.0)))
        );
        let bad_cap = DescentSettings {
            max_iterations: 20_000,
            ..DescentSettings::default()
        };
        assert_eq!(
            find_extremum(&f, &bad_cap),
            Err(SolverError::Config(ConfigError::MaxIterations(20_000)))
        );
    }

    #[test]
    fn honours_cancellation() {
        let f = |x: f64, y: f64| x * x + y * y;
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            find_extremum_cancellable(&f, &DescentSettings::default(), &token),
            Err(SolverError::Cancelled)
        );
    }
}
