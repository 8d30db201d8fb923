//! WebAssembly bindings for `numlab_core`.
//!
//! Formulas cross the boundary as text and results come back as plain JS
//! objects through `serde-wasm-bindgen`. Every error is flattened into a
//! string carrying its full context chain.

mod analysis;
mod expression;
mod solvers;

pub use analysis::{decimal_places, fit_linear, fit_quadratic, integrate_auto, integrate_fixed};
pub use expression::WasmExpression;
pub use solvers::{
    find_extremum_2d, find_extremum_golden, find_minimum_newton, find_root_bisection,
    find_root_golden,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::JsValue;

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Reads an optional settings object; `undefined` and `null` give the
/// defaults.
pub(crate) fn settings_from_js<T: DeserializeOwned + Default>(value: JsValue) -> anyhow::Result<T> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    from_value(value).map_err(|e| anyhow::anyhow!("Invalid settings: {}", e))
}

pub(crate) fn js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}
