//! Numerical integration over five composite rules, at a fixed number of
//! subintervals or with the count grown until successive values agree.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::control::{CancelToken, Stopwatch};
use crate::error::{ConfigError, SolverError};
use crate::expression::{is_defined, UNDEFINED};
use crate::traits::{Function1D, Metered1D};

const SIMPLE_CAP: usize = 1_000_000;
const SIMPSON_CAP: usize = 50_000;
const SIMPLE_ROUNDS: usize = 50;
const SIMPSON_ROUNDS: usize = 30;
/// Simpson's follow-up check at `n + 2` must move the value by less than
/// this fraction of epsilon.
const SIMPSON_CONFIRMATION: f64 = 0.01;

/// Composite quadrature rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    RectangleLeft,
    RectangleRight,
    RectangleMidpoint,
    Trapezoid,
    Simpson,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::RectangleLeft,
        Rule::RectangleRight,
        Rule::RectangleMidpoint,
        Rule::Trapezoid,
        Rule::Simpson,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Rule::RectangleLeft => "left rectangles",
            Rule::RectangleRight => "right rectangles",
            Rule::RectangleMidpoint => "midpoint rectangles",
            Rule::Trapezoid => "trapezoids",
            Rule::Simpson => "Simpson",
        }
    }

    /// Subinterval count used for an explicit `n`; only Simpson changes it.
    fn fixed_n(self, n: usize) -> usize {
        match self {
            Rule::Simpson => round_up_even(n.max(2)),
            _ => n,
        }
    }

    /// First subinterval count of an auto-N run.
    fn starting_n(self, n: usize) -> usize {
        match self {
            Rule::Simpson => round_up_even(n.max(2)),
            Rule::Trapezoid => n.max(2),
            _ => n.max(1),
        }
    }

    /// Next subinterval count of an auto-N run; always larger than `n`.
    fn grow(self, n: usize) -> usize {
        let factor = match self {
            Rule::RectangleLeft | Rule::RectangleRight => 1.5,
            Rule::RectangleMidpoint | Rule::Trapezoid => 1.2,
            Rule::Simpson => {
                if n < 10 {
                    return n + 2;
                } else if n < 100 {
                    1.5
                } else if n < 1000 {
                    1.3
                } else {
                    1.2
                }
            }
        };
        let next = ((n as f64 * factor).ceil() as usize).max(n + 1);
        match self {
            Rule::Simpson => round_up_even(next),
            _ => next,
        }
    }

    fn cap(self) -> usize {
        match self {
            Rule::Simpson => SIMPSON_CAP,
            _ => SIMPLE_CAP,
        }
    }

    /// Most values an auto-N run computes before giving up.
    fn max_rounds(self) -> usize {
        match self {
            Rule::Simpson => SIMPSON_ROUNDS,
            _ => SIMPLE_ROUNDS,
        }
    }
}

fn round_up_even(n: usize) -> usize {
    n + n % 2
}

/// Outcome of integrating with one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationResult {
    pub rule: Rule,
    pub value: f64,
    /// Subintervals behind `value`.
    pub n: usize,
    /// Last change between successive values; absent in fixed-N mode.
    pub error_estimate: Option<f64>,
    pub converged: bool,
    /// `(n, value)` for every round, in order.
    pub history: Vec<(usize, f64)>,
    pub evaluations: usize,
    pub elapsed_secs: f64,
}

/// Settings for [`integrate_auto`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSettings {
    pub epsilon: f64,
    /// Starting subinterval count; raised to each rule's minimum.
    pub initial_n: usize,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            initial_n: 1,
        }
    }
}

impl AutoSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_epsilon(self.epsilon)?;
        if self.initial_n == 0 {
            return Err(ConfigError::Subintervals);
        }
        Ok(())
    }
}

fn composite_sum<F: Function1D + ?Sized>(
    meter: &Metered1D<'_, F>,
    a: f64,
    b: f64,
    n: usize,
    rule: Rule,
) -> f64 {
    let h = (b - a) / n as f64;
    let node = |i: usize| a + i as f64 * h;
    let total = match rule {
        Rule::RectangleLeft => h * (0..n).map(|i| meter.at(node(i))).sum::<f64>(),
        Rule::RectangleRight => h * (1..=n).map(|i| meter.at(node(i))).sum::<f64>(),
        Rule::RectangleMidpoint => {
            h * (0..n).map(|i| meter.at(a + (i as f64 + 0.5) * h)).sum::<f64>()
        }
        Rule::Trapezoid => {
            let ends = 0.5 * (meter.at(a) + meter.at(b));
            h * (ends + (1..n).map(|i| meter.at(node(i))).sum::<f64>())
        }
        Rule::Simpson => {
            let odd: f64 = (1..n).step_by(2).map(|i| meter.at(node(i))).sum();
            let even: f64 = (2..n).step_by(2).map(|i| meter.at(node(i))).sum();
            h / 3.0 * (meter.at(a) + 4.0 * odd + 2.0 * even + meter.at(b))
        }
    };
    if is_defined(total) {
        total
    } else {
        UNDEFINED
    }
}

fn check_bounds(a: f64, b: f64) -> Result<(), ConfigError> {
    ConfigError::check_interval(a, b)
}

/// Integrates `f` over `[a, b]` with exactly `n` subintervals (`n` is
/// bumped to the next even number for Simpson).
pub fn integrate<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    n: usize,
    rule: Rule,
) -> Result<f64, SolverError> {
    check_bounds(a, b)?;
    if n == 0 {
        return Err(ConfigError::Subintervals.into());
    }
    let meter = Metered1D::new(f);
    Ok(composite_sum(&meter, a, b, rule.fixed_n(n), rule))
}

/// One evaluation per rule at the given `n`.
pub fn integrate_fixed<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    n: usize,
    rules: &[Rule],
) -> Result<Vec<IntegrationResult>, SolverError> {
    check_bounds(a, b)?;
    if n == 0 {
        return Err(ConfigError::Subintervals.into());
    }

    let results = rules
        .iter()
        .map(|&rule| {
            let clock = Stopwatch::start();
            let meter = Metered1D::new(f);
            let used = rule.fixed_n(n);
            let value = composite_sum(&meter, a, b, used, rule);
            debug!("{} with n = {used}: {value}", rule.label());
            IntegrationResult {
                rule,
                value,
                n: used,
                error_estimate: None,
                converged: true,
                history: vec![(used, value)],
                evaluations: meter.evaluations(),
                elapsed_secs: clock.elapsed_secs(),
            }
        })
        .collect();
    Ok(results)
}

/// Grows the subinterval count per rule until successive values differ by at
/// most `epsilon`.
///
/// Simpson additionally requires the value at `n + 2` to agree within
/// `epsilon / 100` before it stops. A rule that reaches its size cap or its
/// round limit returns its last value with `converged == false`.
pub fn integrate_auto<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    settings: &AutoSettings,
    rules: &[Rule],
    cancel: &CancelToken,
) -> Result<Vec<IntegrationResult>, SolverError> {
    check_bounds(a, b)?;
    settings.validate()?;
    rules
        .iter()
        .map(|&rule| refine_rule(f, a, b, settings, rule, cancel))
        .collect()
}

fn refine_rule<F: Function1D + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    settings: &AutoSettings,
    rule: Rule,
    cancel: &CancelToken,
) -> Result<IntegrationResult, SolverError> {
    let clock = Stopwatch::start();
    let meter = Metered1D::new(f);
    let eps = settings.epsilon;

    let mut n = rule.starting_n(settings.initial_n);
    let mut history: Vec<(usize, f64)> = Vec::new();
    let mut converged = false;
    debug!("auto-N {} on [{a}, {b}], epsilon {eps}, starting at n = {n}", rule.label());

    loop {
        if cancel.is_cancelled() {
            warn!("auto-N {} cancelled at n = {n}", rule.label());
            return Err(SolverError::Cancelled);
        }
        let value = composite_sum(&meter, a, b, n, rule);
        let change = history.last().map(|&(_, previous)| (value - previous).abs());
        history.push((n, value));
        trace!("{} n = {n}: {value} (change {change:?})", rule.label());

        if change.is_some_and(|c| c <= eps) {
            if rule != Rule::Simpson {
                converged = true;
                break;
            }
            let confirmation = composite_sum(&meter, a, b, n + 2, rule);
            if (confirmation - value).abs() <= eps * SIMPSON_CONFIRMATION {
                converged = true;
                break;
            }
        }

        if history.len() >= rule.max_rounds() {
            warn!(
                "auto-N {} gave up after {} rounds at n = {n} without reaching epsilon {eps}",
                rule.label(),
                rule.max_rounds()
            );
            break;
        }
        let next = rule.grow(n);
        if next > rule.cap() {
            warn!(
                "auto-N {} stopped at the n = {} cap without reaching epsilon {eps}",
                rule.label(),
                rule.cap()
            );
            break;
        }
        n = next;
    }

    let (n, value) = history.last().copied().unwrap_or((n, UNDEFINED));
    let error_estimate = match history.as_slice() {
        [.., (_, before), (_, last)] => Some((last - before).abs()),
        _ => None,
    };
    debug!("auto-N {} finished: {value} with n = {n}", rule.label());
    Ok(IntegrationResult {
        rule,
        value,
        n,
        error_estimate,
        converged,
        history,
        evaluations: meter.evaluations(),
        elapsed_secs: clock.elapsed_secs(),
    })
}
