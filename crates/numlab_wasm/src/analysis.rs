//! Quadrature, regression and display precision.

use anyhow::{ensure, Context};
use numlab_core::quadrature::{self, AutoSettings, Rule};
use numlab_core::{precision, regression, CancelToken};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

use crate::expression::compile;
use crate::{js_error, settings_from_js, to_js};

/// `rules` is an array of rule names such as `"Simpson"`; `undefined` means
/// all five.
fn rules_from_js(rules: JsValue) -> anyhow::Result<Vec<Rule>> {
    if rules.is_undefined() || rules.is_null() {
        return Ok(Rule::ALL.to_vec());
    }
    let rules: Vec<Rule> = from_value(rules).map_err(|e| anyhow::anyhow!("Invalid rule list: {}", e))?;
    ensure!(!rules.is_empty(), "At least one quadrature rule is required");
    Ok(rules)
}

fn zip_points(xs: &[f64], ys: &[f64]) -> anyhow::Result<Vec<(f64, f64)>> {
    ensure!(
        xs.len() == ys.len(),
        "x and y have different lengths ({} vs {})",
        xs.len(),
        ys.len()
    );
    Ok(xs.iter().copied().zip(ys.iter().copied()).collect())
}

#[wasm_bindgen]
pub fn integrate_fixed(formula: &str, a: f64, b: f64, n: u32, rules: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let rules = rules_from_js(rules)?;
        let f = compile(formula, 1)?;
        quadrature::integrate_fixed(&f, a, b, n as usize, &rules).context("Integration failed")
    };
    to_js(&run().map_err(js_error)?)
}

/// `settings` is a partial `AutoSettings` object.
#[wasm_bindgen]
pub fn integrate_auto(
    formula: &str,
    a: f64,
    b: f64,
    settings: JsValue,
    rules: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let settings: AutoSettings = settings_from_js(settings)?;
        let rules = rules_from_js(rules)?;
        let f = compile(formula, 1)?;
        quadrature::integrate_auto(&f, a, b, &settings, &rules, &CancelToken::never())
            .context("Adaptive integration failed")
    };
    to_js(&run().map_err(js_error)?)
}

#[wasm_bindgen]
pub fn fit_linear(xs: &[f64], ys: &[f64]) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let points = zip_points(xs, ys)?;
        regression::linear(&points).context("Linear fit failed")
    };
    to_js(&run().map_err(js_error)?)
}

#[wasm_bindgen]
pub fn fit_quadratic(xs: &[f64], ys: &[f64]) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let points = zip_points(xs, ys)?;
        regression::quadratic(&points).context("Quadratic fit failed")
    };
    to_js(&run().map_err(js_error)?)
}

#[wasm_bindgen]
pub fn decimal_places(epsilon: f64) -> u32 {
    precision::decimal_places(epsilon) as u32
}
