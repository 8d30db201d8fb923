//! Formula compilation and evaluation.
//!
//! A formula goes through three stages:
//!
//! 1. [`preprocess::normalize`] rewrites the raw text (case, decimal commas,
//!    `^` into `pow(..)` calls),
//! 2. [`parser::parse`] builds an [`Expr`](parser::Expr) tree,
//! 3. the [`Compiler`] lowers the tree into [`Bytecode`] for the stack [`VM`].
//!
//! Names are resolved once, at compile time. The resulting [`Expression`] is
//! immutable and evaluation allocates its own stack, so one instance can be
//! shared freely between solver runs.

pub mod functions;
pub mod parser;
pub mod preprocess;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EvalError, ParseError};
use functions::{BinaryFn, UnaryFn};
use parser::Expr;

/// Sentinel reported to solvers in place of any undefined evaluation.
///
/// Large and finite so comparisons and arithmetic on it stay well-behaved.
pub const UNDEFINED: f64 = f64::MAX / 1000.0;

/// Inputs with a larger magnitude are not evaluated at all.
pub const INPUT_LIMIT: f64 = 1e10;

/// Whether `value` is a usable evaluation result.
pub fn is_defined(value: f64) -> bool {
    value.is_finite() && value.abs() < UNDEFINED
}

/// Collapses an evaluation outcome to a finite double, mapping every failure
/// to [`UNDEFINED`].
pub fn guard(outcome: Result<f64, EvalError>) -> f64 {
    match outcome {
        Ok(value) if is_defined(value) => value,
        _ => UNDEFINED,
    }
}

/// OpCodes for the stack-based virtual machine.
#[derive(Debug, Clone, Copy)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by declaration index).
    LoadVar(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops one argument and applies a registered function.
    Call1(UnaryFn),
    /// Pops two arguments (b, a) and applies a registered function to (a, b).
    Call2(BinaryFn),
}

/// A compiled sequence of operations.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    /// Deepest stack the ops reach; used to size the evaluation stack.
    pub max_depth: usize,
}

/// Stack-based virtual machine.
///
/// The VM is stateless; `execute` takes everything it needs:
/// - `bytecode`: instructions to run,
/// - `vars`: variable values in declaration order,
/// - `stack`: scratch buffer for intermediate values.
pub struct VM;

impl VM {
    pub fn execute(
        bytecode: &Bytecode,
        vars: &[f64],
        stack: &mut Vec<f64>,
    ) -> Result<f64, EvalError> {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(val),
                OpCode::LoadVar(idx) => {
                    let value = vars.get(idx).ok_or(EvalError::Malformed)?;
                    stack.push(*value);
                }
                OpCode::Add => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a / b);
                }
                OpCode::Neg => {
                    let a = stack.pop().ok_or(EvalError::Malformed)?;
                    stack.push(-a);
                }
                OpCode::Call1(func) => {
                    let a = stack.pop().ok_or(EvalError::Malformed)?;
                    stack.push(func(a)?);
                }
                OpCode::Call2(func) => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(func(a, b)?);
                }
            }
        }

        let result = stack.pop().ok_or(EvalError::Malformed)?;
        if !stack.is_empty() {
            return Err(EvalError::Malformed);
        }
        if !result.is_finite() {
            return Err(EvalError::NonFinite);
        }
        Ok(result)
    }
}

fn pop_pair(stack: &mut Vec<f64>) -> Result<(f64, f64), EvalError> {
    let b = stack.pop().ok_or(EvalError::Malformed)?;
    let a = stack.pop().ok_or(EvalError::Malformed)?;
    Ok((a, b))
}

const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// Compiles an AST into [`Bytecode`], resolving every name.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { var_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, ParseError> {
        let mut bytecode = Bytecode::default();
        let mut depth = 0;
        self.compile_recursive(expr, &mut bytecode, &mut depth)?;
        Ok(bytecode)
    }

    fn compile_recursive(
        &self,
        expr: &Expr,
        out: &mut Bytecode,
        depth: &mut usize,
    ) -> Result<(), ParseError> {
        match expr {
            Expr::Number(n) => push(out, depth, OpCode::LoadConst(*n)),
            Expr::Symbol(name) => {
                let op = self.resolve_symbol(name)?;
                push(out, depth, op);
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, out, depth)?;
                self.compile_recursive(right, out, depth)?;
                let code = match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    other => {
                        return Err(ParseError::UnexpectedToken {
                            found: format!("'{other}'"),
                            expected: "binary operator",
                        })
                    }
                };
                out.ops.push(code);
                *depth -= 1;
            }
            Expr::Unary(_, operand) => {
                self.compile_recursive(operand, out, depth)?;
                out.ops.push(OpCode::Neg);
            }
            Expr::Call(name, args) => {
                let def = functions::lookup(name)
                    .ok_or_else(|| ParseError::UnknownFunction(name.clone()))?;
                let arity_error = || ParseError::Arity {
                    name: name.clone(),
                    expected: def.arity(),
                    got: args.len(),
                };
                for arg in args {
                    self.compile_recursive(arg, out, depth)?;
                }
                match args.len() {
                    1 => out.ops.push(OpCode::Call1(def.unary.ok_or_else(arity_error)?)),
                    2 => {
                        out.ops.push(OpCode::Call2(def.binary.ok_or_else(arity_error)?));
                        *depth -= 1;
                    }
                    _ => return Err(arity_error()),
                }
            }
        }
        Ok(())
    }

    fn resolve_symbol(&self, name: &str) -> Result<OpCode, ParseError> {
        if let Some(&idx) = self.var_map.get(name) {
            return Ok(OpCode::LoadVar(idx));
        }
        if let Some(&(_, value)) = CONSTANTS.iter().find(|(c, _)| *c == name) {
            return Ok(OpCode::LoadConst(value));
        }
        if functions::lookup(name).is_some() {
            return Err(ParseError::BareFunction(name.to_string()));
        }
        Err(ParseError::UnknownSymbol(name.to_string()))
    }
}

fn push(out: &mut Bytecode, depth: &mut usize, op: OpCode) {
    out.ops.push(op);
    *depth += 1;
    out.max_depth = out.max_depth.max(*depth);
}

/// A compiled formula of one or more named variables.
#[derive(Debug, Clone, Serialize)]
pub struct Expression {
    source: String,
    normalized: String,
    var_names: Vec<String>,
    #[serde(skip)]
    bytecode: Bytecode,
}

impl Expression {
    /// Compiles `text` with the given variable names, in evaluation order.
    ///
    /// Variable names are matched case-insensitively, like the rest of the
    /// formula.
    pub fn new(text: &str, var_names: &[&str]) -> Result<Self, ParseError> {
        let normalized = preprocess::normalize(text)?;
        let ast = parser::parse(&normalized)?;
        let var_names: Vec<String> = var_names.iter().map(|v| v.to_lowercase()).collect();
        let bytecode = Compiler::new(&var_names).compile(&ast)?;
        log::debug!("compiled '{}' as '{}' ({} ops)", text, normalized, bytecode.ops.len());
        Ok(Self {
            source: text.to_string(),
            normalized,
            var_names,
            bytecode,
        })
    }

    /// A formula of `x`.
    pub fn parse_1d(text: &str) -> Result<Self, ParseError> {
        Self::new(text, &["x"])
    }

    /// A formula of `x` and `y`.
    pub fn parse_2d(text: &str) -> Result<Self, ParseError> {
        Self::new(text, &["x", "y"])
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text after normalization, with powers in `pow(a,b)` form.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn dimension(&self) -> usize {
        self.var_names.len()
    }

    /// Evaluates with `values` bound to the variables in declaration order.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, EvalError> {
        if values.len() != self.var_names.len() {
            return Err(EvalError::Bindings {
                expected: self.var_names.len(),
                got: values.len(),
            });
        }
        let mut stack = Vec::with_capacity(self.bytecode.max_depth);
        VM::execute(&self.bytecode, values, &mut stack)
    }

    /// Guarded single-variable evaluation: never NaN or infinite.
    pub fn value_at(&self, x: f64) -> f64 {
        if !within_input_limit(x) {
            return UNDEFINED;
        }
        guard(self.evaluate(&[x]))
    }

    /// Guarded two-variable evaluation: never NaN or infinite.
    pub fn value_at_xy(&self, x: f64, y: f64) -> f64 {
        if !within_input_limit(x) || !within_input_limit(y) {
            return UNDEFINED;
        }
        guard(self.evaluate(&[x, y]))
    }
}

pub(crate) fn within_input_limit(v: f64) -> bool {
    v.is_finite() && v.abs() <= INPUT_LIMIT
}
