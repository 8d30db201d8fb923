use std::cell::Cell;

use crate::expression::{is_defined, within_input_limit, Expression, UNDEFINED};

/// A real function of one variable, as seen by the solvers.
///
/// Implementations should return [`UNDEFINED`] rather than NaN or infinity;
/// solvers sanitize anything else on their side anyway.
pub trait Function1D {
    fn value(&self, x: f64) -> f64;
}

/// A real function of two variables.
pub trait Function2D {
    fn value(&self, x: f64, y: f64) -> f64;
}

impl<F: Fn(f64) -> f64> Function1D for F {
    fn value(&self, x: f64) -> f64 {
        self(x)
    }
}

impl<F: Fn(f64, f64) -> f64> Function2D for F {
    fn value(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

impl Function1D for Expression {
    fn value(&self, x: f64) -> f64 {
        self.value_at(x)
    }
}

impl Function2D for Expression {
    fn value(&self, x: f64, y: f64) -> f64 {
        self.value_at_xy(x, y)
    }
}

fn sanitize(value: f64) -> f64 {
    if is_defined(value) {
        value
    } else {
        UNDEFINED
    }
}

/// Counting, sanitizing view of a [`Function1D`] used inside solver loops.
pub(crate) struct Metered1D<'a, F: Function1D + ?Sized> {
    f: &'a F,
    evaluations: Cell<usize>,
}

impl<'a, F: Function1D + ?Sized> Metered1D<'a, F> {
    pub(crate) fn new(f: &'a F) -> Self {
        Self {
            f,
            evaluations: Cell::new(0),
        }
    }

    pub(crate) fn at(&self, x: f64) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);
        if !within_input_limit(x) {
            return UNDEFINED;
        }
        sanitize(self.f.value(x))
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

/// Counting, sanitizing view of a [`Function2D`].
pub(crate) struct Metered2D<'a, F: Function2D + ?Sized> {
    f: &'a F,
    evaluations: Cell<usize>,
}

impl<'a, F: Function2D + ?Sized> Metered2D<'a, F> {
    pub(crate) fn new(f: &'a F) -> Self {
        Self {
            f,
            evaluations: Cell::new(0),
        }
    }

    pub(crate) fn at(&self, x: f64, y: f64) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);
        if !within_input_limit(x) || !within_input_limit(y) {
            return UNDEFINED;
        }
        sanitize(self.f.value(x, y))
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_and_expressions_are_objectives() {
        let square = |x: f64| x * x;
        assert_eq!(Function1D::value(&square, 3.0), 9.0);

        let expr = Expression::parse_2d("x*y").expect("should compile");
        assert_eq!(Function2D::value(&expr, 2.0, 5.0), 10.0);
    }

    #[test]
    fn metered_views_count_and_sanitize() {
        let recip = |x: f64| 1.0 / x;
        let meter = Metered1D::new(&recip);
        assert_eq!(meter.at(0.0), UNDEFINED);
        assert_eq!(meter.at(2.0), 0.5);
        assert_eq!(meter.at(1e12), UNDEFINED);
        assert_eq!(meter.evaluations(), 3);

        let nan = |_: f64, _: f64| f64::NAN;
        let meter = Metered2D::new(&nan);
        assert_eq!(meter.at(0.0, 0.0), UNDEFINED);
        assert_eq!(meter.evaluations(), 1);
    }
}
