//! Result records shared by the iterative solvers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::is_defined;

/// Whether a search looks for the smallest or the largest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Goal {
    #[default]
    Minimize,
    Maximize,
}

impl Goal {
    /// Whether `candidate` is strictly better than `reference`.
    ///
    /// An undefined candidate never improves; any defined candidate improves
    /// on an undefined reference.
    pub fn improves(self, candidate: f64, reference: f64) -> bool {
        if !is_defined(candidate) {
            return false;
        }
        if !is_defined(reference) {
            return true;
        }
        match self {
            Goal::Minimize => candidate < reference,
            Goal::Maximize => candidate > reference,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Goal::Minimize => "minimum",
            Goal::Maximize => "maximum",
        }
    }
}

/// What a single recorded iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// The starting point, before any step.
    Start,
    /// Bracketing methods: the left part of the interval was kept.
    KeepLeft,
    /// Bracketing methods: the right part of the interval was kept.
    KeepRight,
    /// Coordinate descent moved along x.
    AxisX,
    /// Coordinate descent moved along y.
    AxisY,
    /// No move: nothing improved, or the point was accepted as final.
    Stay,
    /// Newton step `-f'/f''`.
    Newton,
    /// Gradient fallback `-0.1 f'` when the curvature is too small.
    Gradient,
}

/// Tangent `y = slope * x + intercept` at a Newton iterate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tangent {
    pub slope: f64,
    pub intercept: f64,
}

impl Tangent {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Finite-difference derivatives at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Derivatives {
    pub first: f64,
    pub second: f64,
}

/// One step of a solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub index: usize,
    /// One coordinate for 1-D solvers, two for coordinate descent.
    pub point: Vec<f64>,
    pub value: f64,
    /// Per-axis change from the previous record.
    pub deltas: Vec<f64>,
    pub delta_value: f64,
    pub direction: Direction,
    pub derivatives: Option<Derivatives>,
    pub tangent: Option<Tangent>,
}

impl IterationRecord {
    pub fn new(index: usize, point: Vec<f64>, value: f64, direction: Direction) -> Self {
        let deltas = vec![0.0; point.len()];
        Self {
            index,
            point,
            value,
            deltas,
            delta_value: 0.0,
            direction,
            derivatives: None,
            tangent: None,
        }
    }

    /// Fills `deltas` and `delta_value` relative to `previous`.
    pub fn relative_to(mut self, previous: &IterationRecord) -> Self {
        self.deltas = self
            .point
            .iter()
            .zip(&previous.point)
            .map(|(now, before)| now - before)
            .collect();
        self.delta_value = if is_defined(self.value) && is_defined(previous.value) {
            self.value - previous.value
        } else {
            0.0
        };
        self
    }
}

/// Which end of an interval a boundary minimum sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// How a solver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Status {
    /// The stopping criterion was met.
    Converged,
    /// The iteration cap was reached first.
    IterationLimit,
    /// A step produced an undefined value; the best point so far is kept.
    Interrupted,
    /// Newton: `|f'| < epsilon` and `f'' > 0`.
    LocalMinimum,
    /// Newton: pinned against an interval end with the slope pointing out.
    BoundaryMinimum(Side),
    /// Newton: converged to a point that fails the minimum tests.
    NotAMinimum,
    /// Newton: the iteration cap was hit and a uniform scan picked the point.
    Rescued { is_minimum: bool },
}

impl Status {
    pub fn describe(&self) -> &'static str {
        match self {
            Status::Converged => "converged",
            Status::IterationLimit => "iteration limit reached",
            Status::Interrupted => "stopped at an undefined value",
            Status::LocalMinimum => "local minimum",
            Status::BoundaryMinimum(Side::Left) => "minimum on the left boundary",
            Status::BoundaryMinimum(Side::Right) => "minimum on the right boundary",
            Status::NotAMinimum => "stationary point is not a minimum",
            Status::Rescued { is_minimum: true } => "recovered by scan: minimum",
            Status::Rescued { is_minimum: false } => "recovered by scan: not a minimum",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Outcome of a root, extremum or minimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
    pub boundary_warning: bool,
    pub status: Status,
    pub history: Vec<IterationRecord>,
    /// Objective value after each iteration.
    pub value_history: Vec<f64>,
    pub evaluations: usize,
    pub elapsed_secs: f64,
    pub epsilon: f64,
    /// Golden section: the bracket left when narrowing stopped.
    pub final_interval: Option<[f64; 2]>,
    /// Newton: whether the final point passed the minimum tests.
    pub is_minimum: Option<bool>,
    /// Newton: derivatives at the final point.
    pub derivatives: Option<Derivatives>,
}

impl SolverResult {
    pub(crate) fn new(point: Vec<f64>, value: f64, epsilon: f64, status: Status) -> Self {
        Self {
            point,
            value,
            iterations: 0,
            converged: matches!(status, Status::Converged | Status::LocalMinimum),
            boundary_warning: false,
            status,
            history: Vec::new(),
            value_history: Vec::new(),
            evaluations: 0,
            elapsed_secs: 0.0,
            epsilon,
            final_interval: None,
            is_minimum: None,
            derivatives: None,
        }
    }

    /// A root found on an end of the interval before any narrowing.
    pub(crate) fn at_endpoint(x: f64, fx: f64, epsilon: f64) -> Self {
        let mut result = Self::new(vec![x], fx, epsilon, Status::Converged);
        result.history.push(IterationRecord::new(0, vec![x], fx, Direction::Start));
        result.value_history.push(fx);
        result
    }

    pub fn x(&self) -> f64 {
        self.point.first().copied().unwrap_or(0.0)
    }

    pub fn y(&self) -> Option<f64> {
        self.point.get(1).copied()
    }

    /// One-line summary for display, e.g. `converged (near boundary)`.
    pub fn summary(&self) -> String {
        if self.boundary_warning {
            format!("{} (near boundary)", self.status)
        } else {
            self.status.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::UNDEFINED;

    #[test]
    fn goal_comparisons_skip_undefined_values() {
        assert!(Goal::Minimize.improves(1.0, 2.0));
        assert!(!Goal::Minimize.improves(2.0, 2.0));
        assert!(Goal::Maximize.improves(3.0, 2.0));
        assert!(!Goal::Minimize.improves(UNDEFINED, 2.0));
        assert!(Goal::Maximize.improves(-5.0, UNDEFINED));
    }

    #[test]
    fn record_deltas_follow_previous_point() {
        let start = IterationRecord::new(0, vec![1.0, 2.0], 5.0, Direction::Start);
        let next = IterationRecord::new(1, vec![0.5, 2.0], 4.25, Direction::AxisX).relative_to(&start);
        assert_eq!(next.deltas, vec![-0.5, 0.0]);
        assert_eq!(next.delta_value, -0.75);
    }

    #[test]
    fn summary_mentions_boundary() {
        let mut result = SolverResult::new(vec![2.0], 4.0, 1e-3, Status::Converged);
        assert_eq!(result.summary(), "converged");
        result.boundary_warning = true;
        assert_eq!(result.summary(), "converged (near boundary)");
        assert_eq!(result.x(), 2.0);
        assert_eq!(result.y(), None);
    }
}
