//! Plot-ready samples of 1-D and 2-D functions.
//!
//! Everything here is for display: undefined values are reported as gaps
//! (curves), flattened to zero (surfaces) or skipped (contours) instead of
//! failing the whole request.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::expression::is_defined;
use crate::newton::first_derivative;
use crate::result::Tangent;
use crate::traits::{Function1D, Function2D, Metered1D, Metered2D};

/// Heights at or beyond this magnitude are flattened in surface grids.
const HEIGHT_LIMIT: f64 = 1e50;
const FLAT_RANGE: f64 = 1e-10;

fn check_count(count: usize) -> Result<(), ConfigError> {
    if count == 0 {
        return Err(ConfigError::Subintervals);
    }
    Ok(())
}

fn node(lo: f64, hi: f64, i: usize, n: usize) -> f64 {
    if i == n {
        hi
    } else {
        lo + (hi - lo) * i as f64 / n as f64
    }
}

/// `samples + 1` evenly spaced points of `f` on `[a, b]`; undefined values
/// come back as `None`.
pub fn sample_line<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    samples: usize,
) -> Result<Vec<(f64, Option<f64>)>, ConfigError> {
    ConfigError::check_interval(a, b)?;
    check_count(samples)?;
    let meter = Metered1D::new(f);
    Ok((0..=samples)
        .map(|i| {
            let x = node(a, b, i, samples);
            let y = meter.at(x);
            (x, is_defined(y).then_some(y))
        })
        .collect())
}

/// A `(resolution + 1)²` height field, row by row along x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGrid {
    pub resolution: usize,
    /// `[x, y, z]` triples; index `iy * (resolution + 1) + ix`.
    pub points: Vec<[f64; 3]>,
}

impl SurfaceGrid {
    pub fn side(&self) -> usize {
        self.resolution + 1
    }

    pub fn height(&self, ix: usize, iy: usize) -> Option<f64> {
        self.points.get(iy * self.side() + ix).map(|p| p[2])
    }
}

/// Samples `f` over the box. Undefined heights and heights of magnitude
/// `1e50` or more are drawn as 0.
pub fn sample_surface<F: Function2D + ?Sized>(
    f: &F,
    x_range: [f64; 2],
    y_range: [f64; 2],
    resolution: usize,
) -> Result<SurfaceGrid, ConfigError> {
    ConfigError::check_interval(x_range[0], x_range[1])?;
    ConfigError::check_interval(y_range[0], y_range[1])?;
    check_count(resolution)?;

    let meter = Metered2D::new(f);
    let mut points = Vec::with_capacity((resolution + 1) * (resolution + 1));
    for iy in 0..=resolution {
        let y = node(y_range[0], y_range[1], iy, resolution);
        for ix in 0..=resolution {
            let x = node(x_range[0], x_range[1], ix, resolution);
            let z = meter.at(x, y);
            let z = if is_defined(z) && z.abs() < HEIGHT_LIMIT { z } else { 0.0 };
            points.push([x, y, z]);
        }
    }
    Ok(SurfaceGrid { resolution, points })
}

/// Segments of one level set, each as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLine {
    pub level: f64,
    pub segments: Vec<[f64; 4]>,
}

/// Marching-squares level sets of `f` for `levels` heights spread evenly
/// strictly between the sampled minimum and maximum.
///
/// Cells with an undefined corner are skipped. Returns no lines when fewer
/// than two samples are defined or the sampled surface is flat.
pub fn contour_lines<F: Function2D + ?Sized>(
    f: &F,
    x_range: [f64; 2],
    y_range: [f64; 2],
    levels: usize,
    resolution: usize,
) -> Result<Vec<ContourLine>, ConfigError> {
    ConfigError::check_interval(x_range[0], x_range[1])?;
    ConfigError::check_interval(y_range[0], y_range[1])?;
    check_count(resolution)?;

    let side = resolution + 1;
    let meter = Metered2D::new(f);
    let xs: Vec<f64> = (0..side).map(|i| node(x_range[0], x_range[1], i, resolution)).collect();
    let ys: Vec<f64> = (0..side).map(|i| node(y_range[0], y_range[1], i, resolution)).collect();
    let heights: Vec<Option<f64>> = ys
        .iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .map(|(x, y)| Some(meter.at(x, y)).filter(|z| is_defined(*z)))
        .collect();

    let defined: Vec<f64> = heights.iter().flatten().copied().collect();
    if defined.len() < 2 {
        return Ok(Vec::new());
    }
    let min = defined.iter().copied().fold(f64::INFINITY, f64::min);
    let max = defined.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < FLAT_RANGE {
        return Ok(Vec::new());
    }

    let at = |ix: usize, iy: usize| heights[iy * side + ix];
    let lines: Vec<ContourLine> = (0..levels)
        .map(|k| {
            let level = min + (k + 1) as f64 * (max - min) / (levels + 1) as f64;
            let mut segments = Vec::new();
            for iy in 0..resolution {
                for ix in 0..resolution {
                    let corners = [at(ix, iy), at(ix + 1, iy), at(ix + 1, iy + 1), at(ix, iy + 1)];
                    let [Some(v0), Some(v1), Some(v2), Some(v3)] = corners else {
                        continue;
                    };
                    let cell = GridCell {
                        x0: xs[ix],
                        x1: xs[ix + 1],
                        y0: ys[iy],
                        y1: ys[iy + 1],
                        v: [v0 - level, v1 - level, v2 - level, v3 - level],
                    };
                    segments.extend(cell.segments());
                }
            }
            ContourLine { level, segments }
        })
        .collect();
    debug!(
        "contours: {} level(s) over [{min}, {max}], {} segment(s)",
        lines.len(),
        lines.iter().map(|l| l.segments.len()).sum::<usize>()
    );
    Ok(lines)
}

/// One grid cell with corner values shifted by the level, counter-clockwise
/// from `(x0, y0)`.
struct GridCell {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    v: [f64; 4],
}

impl GridCell {
    fn segments(&self) -> impl Iterator<Item = [f64; 4]> + '_ {
        let case = self
            .v
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, v)| if *v >= 0.0 { acc | (1 << i) } else { acc });
        edge_pairs(case).iter().map(move |&(a, b)| {
            let (ax, ay) = self.crossing(a);
            let (bx, by) = self.crossing(b);
            [ax, ay, bx, by]
        })
    }

    /// Where the zero crossing sits on `edge` (0 bottom, 1 right, 2 top,
    /// 3 left).
    fn crossing(&self, edge: u8) -> (f64, f64) {
        let [v0, v1, v2, v3] = self.v;
        let GridCell { x0, x1, y0, y1, .. } = *self;
        match edge {
            0 => (x0 + (x1 - x0) * crossing_factor(v0, v1), y0),
            1 => (x1, y0 + (y1 - y0) * crossing_factor(v1, v2)),
            2 => (x1 + (x0 - x1) * crossing_factor(v2, v3), y1),
            _ => (x0, y1 + (y0 - y1) * crossing_factor(v3, v0)),
        }
    }
}

fn edge_pairs(case: u8) -> &'static [(u8, u8)] {
    match case {
        1 | 14 => &[(3, 0)],
        2 | 13 => &[(0, 1)],
        3 | 12 => &[(3, 1)],
        4 | 11 => &[(1, 2)],
        5 => &[(3, 2), (0, 1)],
        6 | 9 => &[(0, 2)],
        7 | 8 => &[(3, 2)],
        10 => &[(0, 3), (1, 2)],
        _ => &[],
    }
}

fn crossing_factor(from: f64, to: f64) -> f64 {
    let denominator = from - to;
    if denominator.abs() <= 1e-12 {
        0.5
    } else {
        (from / denominator).clamp(0.0, 1.0)
    }
}

/// Central-difference gradient `[∂f/∂x, ∂f/∂y]`; `None` when a sample is
/// undefined.
pub fn gradient<F: Function2D + ?Sized>(f: &F, x: f64, y: f64, step: f64) -> Option<[f64; 2]> {
    let meter = Metered2D::new(f);
    let samples = [
        meter.at(x + step, y),
        meter.at(x - step, y),
        meter.at(x, y + step),
        meter.at(x, y - step),
    ];
    if !step.is_finite() || step <= 0.0 || !samples.iter().all(|v| is_defined(*v)) {
        return None;
    }
    let [xp, xm, yp, ym] = samples;
    let g = [(xp - xm) / (2.0 * step), (yp - ym) / (2.0 * step)];
    g.iter().all(|c| c.is_finite()).then_some(g)
}

/// Tangent to `f` at `x`; `None` where `f(x)` is undefined.
pub fn tangent_line<F: Function1D + ?Sized>(f: &F, x: f64) -> Option<Tangent> {
    let meter = Metered1D::new(f);
    let eval = |t: f64| meter.at(t);
    let fx = eval(x);
    if !is_defined(fx) {
        return None;
    }
    let slope = first_derivative(&eval, x);
    Some(Tangent {
        slope,
        intercept: fx - slope * x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use approx::assert_abs_diff_eq;

    #[test]
    fn line_samples_mark_gaps() {
        let f = Expression::parse_1d("1/x").expect("should compile");
        let points = sample_line(&f, -1.0, 1.0, 4).expect("valid interval");
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (-1.0, Some(-1.0)));
        assert_eq!(points[2], (0.0, None));
        assert_eq!(points[4], (1.0, Some(1.0)));
        assert_eq!(sample_line(&f, 1.0, 0.0, 4), Err(ConfigError::Interval { a: 1.0, b: 0.0 }));
        assert_eq!(sample_line(&f, 0.0, 1.0, 0), Err(ConfigError::Subintervals));
    }

    #[test]
    fn surface_flattens_undefined_heights() {
        let f = |x: f64, y: f64| if x == 0.0 && y == 0.0 { f64::NAN } else { x + y };
        let grid = sample_surface(&f, [-1.0, 1.0], [-1.0, 1.0], 2).expect("valid box");
        assert_eq!(grid.points.len(), 9);
        assert_eq!(grid.height(1, 1), Some(0.0));
        assert_eq!(grid.height(2, 2), Some(2.0));
        assert_eq!(grid.points[3], [-1.0, 0.0, -1.0]);

        let huge = |_: f64, _: f64| 1e60;
        let grid = sample_surface(&huge, [0.0, 1.0], [0.0, 1.0], 1).expect("valid box");
        assert!(grid.points.iter().all(|p| p[2] == 0.0));
    }

    #[test]
    fn circle_contours_stay_on_their_level() {
        let f = Expression::parse_2d("x^2 + y^2").expect("should compile");
        let lines = contour_lines(&f, [-2.0, 2.0], [-2.0, 2.0], 3, 40).expect("valid box");
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(line.level > 0.0 && line.level < 8.0);
            assert!(!line.segments.is_empty());
            for s in &line.segments {
                let r = s[0].hypot(s[1]);
                assert_abs_diff_eq!(r * r, line.level, epsilon = 0.1);
            }
        }
        assert_abs_diff_eq!(lines[0].level, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_or_undefined_surface_has_no_contours() {
        let flat = |_: f64, _: f64| 3.0;
        assert!(contour_lines(&flat, [0.0, 1.0], [0.0, 1.0], 5, 10)
            .expect("valid box")
            .is_empty());
        let nowhere = |_: f64, _: f64| f64::NAN;
        assert!(contour_lines(&nowhere, [0.0, 1.0], [0.0, 1.0], 5, 10)
            .expect("valid box")
            .is_empty());
    }

    #[test]
    fn gradient_and_tangent() {
        let f = |x: f64, y: f64| x * x + 3.0 * y;
        let g = gradient(&f, 1.0, 2.0, 1e-6).expect("defined");
        assert_abs_diff_eq!(g[0], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(g[1], 3.0, epsilon = 1e-5);
        assert_eq!(gradient(&f, 1.0, 2.0, 0.0), None);

        let square = Expression::parse_1d("x^2").expect("should compile");
        let t = tangent_line(&square, 3.0).expect("defined");
        assert_abs_diff_eq!(t.slope, 6.0, epsilon = 1e-5);
        assert_abs_diff_eq!(t.intercept, -9.0, epsilon = 1e-4);
        let log = Expression::parse_1d("ln(x)").expect("should compile");
        assert_eq!(tangent_line(&log, -1.0), None);
    }
}
