//! Error taxonomy shared by the expression engine and the solvers.

use thiserror::Error;

/// Raised once, when a formula is turned into an [`Expression`](crate::expression::Expression).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("formula is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token {found} (expected {expected})")]
    UnexpectedToken { found: String, expected: &'static str },

    #[error("unexpected end of formula (expected {0})")]
    UnexpectedEnd(&'static str),

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("power operator '^' is missing its {0} operand")]
    MissingPowerOperand(&'static str),

    #[error("power rewrite did not terminate after {0} passes")]
    RewriteLimit(usize),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unknown variable or constant: {0}")]
    UnknownSymbol(String),

    #[error("function {name} takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("'{0}' is a function and must be called with parentheses")]
    BareFunction(String),
}

/// Raised by a single evaluation. Solvers never let this escape; they
/// replace it with [`UNDEFINED`](crate::expression::UNDEFINED).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{func} is undefined for {arg}")]
    Domain { func: &'static str, arg: f64 },

    #[error("expected {expected} variable value(s), got {got}")]
    Bindings { expected: usize, got: usize },

    #[error("result is not a finite number")]
    NonFinite,

    #[error("malformed bytecode")]
    Malformed,
}

/// Invalid solver input, reported before any loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("interval bounds must be finite with a < b (got [{a}, {b}])")]
    Interval { a: f64, b: f64 },

    #[error("epsilon must be finite and positive (got {0})")]
    Epsilon(f64),

    #[error("lambda must be finite and positive (got {0})")]
    Lambda(f64),

    #[error("max_iterations must be within [1, 10000] (got {0})")]
    MaxIterations(usize),

    #[error("number of subintervals must be at least 1")]
    Subintervals,

    #[error("starting point must be finite")]
    StartPoint,
}

impl ConfigError {
    pub(crate) fn check_interval(a: f64, b: f64) -> Result<(), ConfigError> {
        if !a.is_finite() || !b.is_finite() || a >= b {
            return Err(ConfigError::Interval { a, b });
        }
        Ok(())
    }

    pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), ConfigError> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(ConfigError::Epsilon(epsilon));
        }
        Ok(())
    }

    pub(crate) fn check_max_iterations(max_iterations: usize) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&max_iterations) {
            return Err(ConfigError::MaxIterations(max_iterations));
        }
        Ok(())
    }
}

/// Failure of a solver invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("f(a) and f(b) have the same sign on [{a}, {b}]; no bracketed root")]
    NoSignChange { a: f64, b: f64 },

    #[error("function is undefined on most of [{a}, {b}]")]
    UndefinedOnInterval { a: f64, b: f64 },

    #[error("normal equations are singular (|det| = {det:e})")]
    SingularSystem { det: f64 },

    #[error("at least {needed} points are required, got {got}")]
    InsufficientPoints { needed: usize, got: usize },

    #[error("point {index} has a non-finite coordinate")]
    InvalidPoint { index: usize },

    #[error("run was cancelled")]
    Cancelled,
}
