//! Registered function table for the expression engine.
//!
//! Every entry maps a name (plus aliases) to a unary and/or binary
//! implementation. The compiler resolves names and checks arity once, so the
//! VM only ever calls a function pointer.

use crate::error::EvalError;

pub type UnaryFn = fn(f64) -> Result<f64, EvalError>;
pub type BinaryFn = fn(f64, f64) -> Result<f64, EvalError>;

/// One entry of the function table.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub unary: Option<UnaryFn>,
    pub binary: Option<BinaryFn>,
}

impl FunctionDef {
    /// Human-readable arity used in error messages.
    pub fn arity(&self) -> &'static str {
        match (self.unary.is_some(), self.binary.is_some()) {
            (true, true) => "1 or 2",
            (true, false) => "1",
            (false, true) => "2",
            (false, false) => "0",
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

const fn unary(f: UnaryFn) -> Option<UnaryFn> {
    Some(f)
}

const fn binary(f: BinaryFn) -> Option<BinaryFn> {
    Some(f)
}

const fn def(
    name: &'static str,
    aliases: &'static [&'static str],
    unary: Option<UnaryFn>,
    binary: Option<BinaryFn>,
) -> FunctionDef {
    FunctionDef {
        name,
        aliases,
        unary,
        binary,
    }
}

pub static FUNCTIONS: &[FunctionDef] = &[
    def("sin", &[], unary(sin), None),
    def("cos", &[], unary(cos), None),
    def("tan", &[], unary(tan), None),
    def("asin", &["arcsin"], unary(asin), None),
    def("acos", &["arccos"], unary(acos), None),
    def("atan", &["arctan"], unary(atan), None),
    def("sinh", &[], unary(sinh), None),
    def("cosh", &[], unary(cosh), None),
    def("tanh", &[], unary(tanh), None),
    def("exp", &[], unary(exp), None),
    def("sqrt", &[], unary(sqrt), None),
    def("abs", &[], unary(abs), None),
    def("log", &["ln"], unary(ln), binary(log_base)),
    def("log10", &[], unary(log10), None),
    def("pow", &[], None, binary(pow)),
    def("floor", &[], unary(floor), None),
    def("ceil", &[], unary(ceil), None),
    def("round", &[], unary(round), binary(round_digits)),
    def("min", &[], None, binary(min)),
    def("max", &[], None, binary(max)),
];

/// Finds a function by name or alias.
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    FUNCTIONS.iter().find(|def| def.matches(name))
}

/// Whether `name` is a function that accepts a second argument.
///
/// Used by the preprocessor to tell an argument separator from a decimal
/// comma.
pub fn accepts_two_args(name: &str) -> bool {
    lookup(name).is_some_and(|def| def.binary.is_some())
}

fn sin(x: f64) -> Result<f64, EvalError> {
    Ok(x.sin())
}

fn cos(x: f64) -> Result<f64, EvalError> {
    Ok(x.cos())
}

fn tan(x: f64) -> Result<f64, EvalError> {
    Ok(x.tan())
}

fn asin(x: f64) -> Result<f64, EvalError> {
    if !(-1.0..=1.0).contains(&x) {
        return Err(EvalError::Domain { func: "asin", arg: x });
    }
    Ok(x.asin())
}

fn acos(x: f64) -> Result<f64, EvalError> {
    if !(-1.0..=1.0).contains(&x) {
        return Err(EvalError::Domain { func: "acos", arg: x });
    }
    Ok(x.acos())
}

fn atan(x: f64) -> Result<f64, EvalError> {
    Ok(x.atan())
}

fn sinh(x: f64) -> Result<f64, EvalError> {
    Ok(x.sinh())
}

fn cosh(x: f64) -> Result<f64, EvalError> {
    Ok(x.cosh())
}

fn tanh(x: f64) -> Result<f64, EvalError> {
    Ok(x.tanh())
}

fn exp(x: f64) -> Result<f64, EvalError> {
    Ok(x.exp())
}

fn sqrt(x: f64) -> Result<f64, EvalError> {
    if x < 0.0 {
        return Err(EvalError::Domain { func: "sqrt", arg: x });
    }
    Ok(x.sqrt())
}

fn abs(x: f64) -> Result<f64, EvalError> {
    Ok(x.abs())
}

fn ln(x: f64) -> Result<f64, EvalError> {
    if x <= 0.0 {
        return Err(EvalError::Domain { func: "log", arg: x });
    }
    Ok(x.ln())
}

fn log_base(x: f64, base: f64) -> Result<f64, EvalError> {
    if x <= 0.0 {
        return Err(EvalError::Domain { func: "log", arg: x });
    }
    if base <= 0.0 || base == 1.0 {
        return Err(EvalError::Domain {
            func: "log base",
            arg: base,
        });
    }
    Ok(x.ln() / base.ln())
}

fn log10(x: f64) -> Result<f64, EvalError> {
    if x <= 0.0 {
        return Err(EvalError::Domain { func: "log10", arg: x });
    }
    Ok(x.log10())
}

fn pow(base: f64, exponent: f64) -> Result<f64, EvalError> {
    Ok(base.powf(exponent))
}

fn floor(x: f64) -> Result<f64, EvalError> {
    Ok(x.floor())
}

fn ceil(x: f64) -> Result<f64, EvalError> {
    Ok(x.ceil())
}

// Midpoints round to even, matching the usual "banker's rounding" of
// spreadsheet-style calculators.
fn round(x: f64) -> Result<f64, EvalError> {
    Ok(x.round_ties_even())
}

fn round_digits(x: f64, digits: f64) -> Result<f64, EvalError> {
    if digits.fract() != 0.0 || !(0.0..=15.0).contains(&digits) {
        return Err(EvalError::Domain {
            func: "round digits",
            arg: digits,
        });
    }
    let scale = 10f64.powi(digits as i32);
    Ok((x * scale).round_ties_even() / scale)
}

fn min(a: f64, b: f64) -> Result<f64, EvalError> {
    Ok(a.min(b))
}

fn max(a: f64, b: f64) -> Result<f64, EvalError> {
    Ok(a.max(b))
}
