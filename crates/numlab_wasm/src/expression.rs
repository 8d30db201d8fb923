//! Compiled formula handle for the front end.

use anyhow::{bail, ensure, Context};
use numlab_core::sampling::{contour_lines, sample_line, sample_surface};
use numlab_core::Expression;
use wasm_bindgen::prelude::*;

use crate::{js_error, to_js};

pub(crate) fn compile(formula: &str, dimension: usize) -> anyhow::Result<Expression> {
    let expression = match dimension {
        1 => Expression::parse_1d(formula),
        2 => Expression::parse_2d(formula),
        other => bail!("Unsupported dimension {}; expected 1 or 2", other),
    };
    expression.with_context(|| format!("Cannot compile '{}'", formula))
}

#[wasm_bindgen]
pub struct WasmExpression {
    inner: Expression,
}

#[wasm_bindgen]
impl WasmExpression {
    /// Compiles `formula` in `x` (dimension 1) or `x, y` (dimension 2).
    #[wasm_bindgen(constructor)]
    pub fn new(formula: &str, dimension: u32) -> Result<WasmExpression, JsValue> {
        console_error_panic_hook::set_once();
        let inner = compile(formula, dimension as usize).map_err(js_error)?;
        Ok(WasmExpression { inner })
    }

    pub fn evaluate(&self, values: &[f64]) -> Result<f64, JsValue> {
        self.inner
            .evaluate(values)
            .with_context(|| format!("Cannot evaluate '{}'", self.inner.source()))
            .map_err(js_error)
    }

    pub fn normalized(&self) -> String {
        self.inner.normalized().to_string()
    }

    pub fn dimension(&self) -> u32 {
        self.inner.dimension() as u32
    }

    /// `[x, y | null]` pairs over `[a, b]`.
    pub fn sample_line(&self, a: f64, b: f64, samples: u32) -> Result<JsValue, JsValue> {
        self.require_dimension(1).map_err(js_error)?;
        let points = sample_line(&self.inner, a, b, samples as usize)
            .context("Cannot sample curve")
            .map_err(js_error)?;
        to_js(&points)
    }

    pub fn sample_surface(
        &self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        resolution: u32,
    ) -> Result<JsValue, JsValue> {
        self.require_dimension(2).map_err(js_error)?;
        let grid = sample_surface(&self.inner, [x_min, x_max], [y_min, y_max], resolution as usize)
            .context("Cannot sample surface")
            .map_err(js_error)?;
        to_js(&grid)
    }

    pub fn contour_lines(
        &self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        levels: u32,
        resolution: u32,
    ) -> Result<JsValue, JsValue> {
        self.require_dimension(2).map_err(js_error)?;
        let lines = contour_lines(
            &self.inner,
            [x_min, x_max],
            [y_min, y_max],
            levels as usize,
            resolution as usize,
        )
        .context("Cannot trace contours")
        .map_err(js_error)?;
        to_js(&lines)
    }
}

impl WasmExpression {
    fn require_dimension(&self, dimension: usize) -> anyhow::Result<()> {
        ensure!(
            self.inner.dimension() == dimension,
            "'{}' has {} variable(s); this view needs {}",
            self.inner.source(),
            self.inner.dimension(),
            dimension
        );
        Ok(())
    }
}
