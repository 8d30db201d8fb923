//! Closed-form least-squares fits of a line and a parabola.

use log::debug;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::control::Stopwatch;
use crate::error::SolverError;

const SINGULAR_THRESHOLD: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitKind {
    Linear,
    Quadratic,
}

impl FitKind {
    fn unknowns(self) -> usize {
        match self {
            FitKind::Linear => 2,
            FitKind::Quadratic => 3,
        }
    }
}

/// A fitted polynomial with its coefficient of determination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub kind: FitKind,
    /// Ascending powers: `[b, a]` for `a·x + b`, `[c0, c1, c2]` for
    /// `c0 + c1·x + c2·x²`.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub elapsed_secs: f64,
}

impl RegressionResult {
    /// Evaluates the fitted polynomial at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

fn check_points(points: &[(f64, f64)], kind: FitKind) -> Result<(), SolverError> {
    let needed = kind.unknowns();
    if points.len() < needed {
        return Err(SolverError::InsufficientPoints {
            needed,
            got: points.len(),
        });
    }
    if let Some(index) = points
        .iter()
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(SolverError::InvalidPoint { index });
    }
    Ok(())
}

/// `1 - SS_res / SS_tot`; a flat sample scores 1 when fitted exactly and 0
/// otherwise.
fn r_squared(points: &[(f64, f64)], predict: impl Fn(f64) -> f64) -> f64 {
    let mean = points.iter().map(|p| p.1).sum::<f64>() / points.len() as f64;
    let (ss_total, ss_residual) = points.iter().fold((0.0, 0.0), |(tot, res), &(x, y)| {
        (tot + (y - mean).powi(2), res + (y - predict(x)).powi(2))
    });
    if ss_total == 0.0 {
        return if ss_residual == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_residual / ss_total
}

/// Fits `y = a·x + b` through the normal equations.
pub fn linear(points: &[(f64, f64)]) -> Result<RegressionResult, SolverError> {
    check_points(points, FitKind::Linear)?;
    let clock = Stopwatch::start();

    let n = points.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) =
        points.iter().fold((0.0, 0.0, 0.0, 0.0), |(sx, sy, sxy, sx2), &(x, y)| {
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        });

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < SINGULAR_THRESHOLD {
        return Err(SolverError::SingularSystem { det: denominator });
    }
    let a = (n * sum_xy - sum_x * sum_y) / denominator;
    let b = (sum_y * sum_x2 - sum_x * sum_xy) / denominator;

    let r_squared = r_squared(points, |x| a * x + b);
    debug!("linear fit over {} points: y = {a}·x + {b}, R² = {r_squared}", points.len());
    Ok(RegressionResult {
        kind: FitKind::Linear,
        coefficients: vec![b, a],
        r_squared,
        elapsed_secs: clock.elapsed_secs(),
    })
}

/// Cofactor expansion along the first row.
fn determinant(m: &Matrix3<f64>) -> f64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Fits `y = c0 + c1·x + c2·x²`, solving the 3×3 normal equations by
/// Cramer's rule.
pub fn quadratic(points: &[(f64, f64)]) -> Result<RegressionResult, SolverError> {
    check_points(points, FitKind::Quadratic)?;
    let clock = Stopwatch::start();

    // Power sums of x up to x⁴, and of x^k·y up to k = 2.
    let mut sx = [0.0; 5];
    let mut sxy = [0.0; 3];
    for &(x, y) in points {
        let mut power = 1.0;
        for k in 0..5 {
            sx[k] += power;
            if k < 3 {
                sxy[k] += power * y;
            }
            power *= x;
        }
    }

    let normal = Matrix3::new(
        sx[0], sx[1], sx[2], //
        sx[1], sx[2], sx[3], //
        sx[2], sx[3], sx[4],
    );
    let rhs = Vector3::new(sxy[0], sxy[1], sxy[2]);

    let det = determinant(&normal);
    if det.abs() < SINGULAR_THRESHOLD {
        return Err(SolverError::SingularSystem { det });
    }

    let coefficients: Vec<f64> = (0..3)
        .map(|column| {
            let mut replaced = normal;
            replaced.set_column(column, &rhs);
            determinant(&replaced) / det
        })
        .collect();

    let fitted = RegressionResult {
        kind: FitKind::Quadratic,
        coefficients,
        r_squared: 0.0,
        elapsed_secs: 0.0,
    };
    let r_squared = r_squared(points, |x| fitted.predict(x));
    debug!(
        "quadratic fit over {} points: {:?}, R² = {r_squared}",
        points.len(),
        fitted.coefficients
    );
    Ok(RegressionResult {
        r_squared,
        elapsed_secs: clock.elapsed_secs(),
        ..fitted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_fit_recovers_line() {
        let points: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 3.0 * i as f64 - 2.0)).collect();
        let fit = linear(&points).expect("well-posed");
        assert_abs_diff_eq!(fit.coefficients[0], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.coefficients[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.predict(10.0), 28.0, epsilon = 1e-10);
    }

    #[test]
    fn quadratic_fit_recovers_parabola() {
        let points: Vec<(f64, f64)> = (-3..=3).map(|i| (i as f64, (i * i) as f64)).collect();
        let fit = quadratic(&points).expect("well-posed");
        assert_abs_diff_eq!(fit.coefficients[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[2], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn noisy_data_scores_below_one() {
        let points = [(0.0, 0.1), (1.0, 0.9), (2.0, 2.2), (3.0, 2.8), (4.0, 4.1)];
        let fit = linear(&points).expect("well-posed");
        assert!(fit.r_squared < 1.0 && fit.r_squared > 0.95);
    }

    #[test]
    fn flat_data_has_defined_r_squared() {
        let points = [(0.0, 2.0), (1.0, 2.0), (2.0, 2.0)];
        let fit = linear(&points).expect("well-posed");
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(
            quadratic(&[(0.0, 0.0), (1.0, 1.0)]),
            Err(SolverError::InsufficientPoints { needed: 3, got: 2 })
        );
        assert_eq!(
            linear(&[(0.0, 0.0), (f64::NAN, 1.0)]),
            Err(SolverError::InvalidPoint { index: 1 })
        );
        assert!(matches!(
            linear(&[(1.0, 0.0), (1.0, 5.0), (1.0, 2.0)]),
            Err(SolverError::SingularSystem { .. })
        ));
        assert!(matches!(
            quadratic(&[(1.0, 0.0), (2.0, 1.0), (1.0, 2.0), (2.0, 0.0)]),
            Err(SolverError::SingularSystem { .. })
        ));
    }
}
