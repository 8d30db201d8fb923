//! The `numlab_core` crate is the numerical engine behind numlab.
//! It compiles user formulas once and runs classic numerical methods on them.
//!
//! Key components:
//! - **Expression**: formula normalization, parsing, and a small bytecode VM.
//!   Evaluation never panics; domain errors become [`expression::UNDEFINED`].
//! - **Root finding**: bisection and golden-section bracketing.
//! - **Optimization**: golden-section extremum search, coordinate descent in
//!   two variables, and a Newton minimizer with boundary detection.
//! - **Quadrature**: five composite rules with automatic refinement.
//! - **Regression**: linear and quadratic least squares.
//! - **Sampling**: curves, surfaces, contours, gradients, and tangents for plotting.
pub mod bisection;
pub mod control;
pub mod coordinate_descent;
pub mod error;
pub mod expression;
pub mod golden_section;
pub mod newton;
pub mod precision;
pub mod quadrature;
pub mod regression;
pub mod result;
pub mod sampling;
pub mod scan;
pub mod traits;

pub use control::CancelToken;
pub use error::{ConfigError, EvalError, ParseError, SolverError};
pub use expression::Expression;
pub use result::{Goal, SolverResult, Status};
pub use traits::{Function1D, Function2D};
