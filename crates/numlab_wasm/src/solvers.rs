//! Root finding and optimization entry points.

use anyhow::Context;
use numlab_core::coordinate_descent::{self, DescentSettings};
use numlab_core::newton::{self, NewtonSettings};
use numlab_core::{bisection, golden_section, Goal};
use wasm_bindgen::prelude::*;

use crate::expression::compile;
use crate::{js_error, settings_from_js, to_js};

fn goal_from_str(goal: &str) -> anyhow::Result<Goal> {
    match goal {
        "min" | "minimum" | "minimize" => Ok(Goal::Minimize),
        "max" | "maximum" | "maximize" => Ok(Goal::Maximize),
        other => anyhow::bail!("Unknown goal '{}'; expected \"min\" or \"max\"", other),
    }
}

#[wasm_bindgen]
pub fn find_root_bisection(formula: &str, a: f64, b: f64, epsilon: f64) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let f = compile(formula, 1)?;
        bisection::find_root(&f, a, b, epsilon).context("Bisection failed")
    };
    to_js(&run().map_err(js_error)?)
}

#[wasm_bindgen]
pub fn find_root_golden(formula: &str, a: f64, b: f64, epsilon: f64) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let f = compile(formula, 1)?;
        golden_section::find_root(&f, a, b, epsilon).context("Golden section root search failed")
    };
    to_js(&run().map_err(js_error)?)
}

/// `goal` is `"min"` or `"max"`.
#[wasm_bindgen]
pub fn find_extremum_golden(
    formula: &str,
    a: f64,
    b: f64,
    epsilon: f64,
    goal: &str,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let goal = goal_from_str(goal)?;
        let f = compile(formula, 1)?;
        golden_section::find_extremum(&f, a, b, epsilon, goal)
            .context("Golden section search failed")
    };
    to_js(&run().map_err(js_error)?)
}

/// `settings` is a partial `DescentSettings` object; missing fields take
/// their defaults.
#[wasm_bindgen]
pub fn find_extremum_2d(formula: &str, settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let settings: DescentSettings = settings_from_js(settings)?;
        let f = compile(formula, 2)?;
        coordinate_descent::find_extremum(&f, &settings).context("Coordinate descent failed")
    };
    to_js(&run().map_err(js_error)?)
}

/// `settings` is a partial `NewtonSettings` object.
#[wasm_bindgen]
pub fn find_minimum_newton(formula: &str, settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let run = || -> anyhow::Result<_> {
        let settings: NewtonSettings = settings_from_js(settings)?;
        let f = compile(formula, 1)?;
        newton::find_minimum(&f, &settings).context("Newton minimization failed")
    };
    to_js(&run().map_err(js_error)?)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use numlab_core::SolverResult;
    use serde_wasm_bindgen::{from_value, to_value};
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn bisection_round_trips_through_js() {
        let value = find_root_bisection("x^2 - 2", 0.0, 2.0, 1e-6).expect("root");
        let result: SolverResult = from_value(value).expect("decode");
        assert!((result.x() - 2f64.sqrt()).abs() < 1e-5);
    }

    #[wasm_bindgen_test]
    fn errors_carry_context() {
        let message = find_root_bisection("x^2 + 1", -1.0, 1.0, 1e-3)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.starts_with("Bisection failed"));
        assert!(find_extremum_golden("x", 0.0, 1.0, 1e-3, "sideways").is_err());
    }

    #[wasm_bindgen_test]
    fn partial_settings_use_defaults() {
        let settings = NewtonSettings {
            x0: 1.0,
            a: -2.0,
            b: 2.0,
            ..NewtonSettings::default()
        };
        let value = find_minimum_newton("x^2", to_value(&settings).expect("settings")).expect("run");
        let result: SolverResult = from_value(value).expect("decode");
        assert_eq!(result.is_minimum, Some(true));

        let value = find_extremum_2d("(x-1)^2 + (y+1)^2", JsValue::UNDEFINED).expect("run");
        let result: SolverResult = from_value(value).expect("decode");
        assert!((result.x() - 1.0).abs() < 1e-2);
    }
}
