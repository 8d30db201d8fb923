use approx::assert_abs_diff_eq;
use numlab_core::coordinate_descent::{self, DescentSettings};
use numlab_core::expression::preprocess::normalize;
use numlab_core::expression::{is_defined, UNDEFINED};
use numlab_core::newton::{self, NewtonSettings};
use numlab_core::precision::{decimal_places, format_value};
use numlab_core::quadrature::{self, AutoSettings, Rule};
use numlab_core::{bisection, golden_section, regression, sampling};
use numlab_core::{CancelToken, Expression, Function1D, Goal, SolverResult};

fn assert_finite_fields(result: &SolverResult) {
    assert!(result.point.iter().all(|v| v.is_finite()));
    assert!(result.value.is_finite());
    assert!(result.elapsed_secs.is_finite());
    for record in &result.history {
        assert!(record.point.iter().all(|v| v.is_finite()));
        assert!(record.value.is_finite());
        assert!(record.delta_value.is_finite());
    }
    assert!(result.value_history.iter().all(|v| v.is_finite()));
}

#[test]
fn bisection_finds_cubic_root() {
    let f = Expression::parse_1d("x^3 - 2*x^2 + x - 5").expect("valid formula");
    let result = bisection::find_root(&f, 1.0, 3.0, 0.001).expect("bracketed root");
    assert!(result.converged);
    assert_abs_diff_eq!(result.x(), 2.4329, epsilon = 1e-3);
    assert!(f.value(result.x()).abs() < 0.001);
    assert!((1.0..=3.0).contains(&result.x()));
    assert_finite_fields(&result);
}

#[test]
fn bisection_residual_holds_for_continuous_functions() {
    let cases = [("cos(x) - x", 0.0, 1.0), ("exp(x) - 3", 0.0, 2.0), ("x^2 - 2", 0.0, 5.0)];
    for (formula, a, b) in cases {
        let f = Expression::parse_1d(formula).expect("valid formula");
        let result = bisection::find_root(&f, a, b, 1e-6).expect("bracketed root");
        assert!(result.x() >= a && result.x() <= b, "{formula}");
        assert!(f.value(result.x()).abs() < 1e-6, "{formula}");
    }
}

#[test]
fn golden_section_locates_extrema() {
    let f = Expression::parse_1d("(x - 1)^2 + 3").expect("valid formula");
    let min = golden_section::find_extremum(&f, -2.0, 4.0, 1e-5, Goal::Minimize).expect("runs");
    assert_abs_diff_eq!(min.x(), 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(min.value, 3.0, epsilon = 1e-8);
    assert!(!min.boundary_warning);

    let g = Expression::parse_1d("sin(x)").expect("valid formula");
    let max = golden_section::find_extremum(&g, 0.0, 3.0, 1e-5, Goal::Maximize).expect("runs");
    assert_abs_diff_eq!(max.x(), std::f64::consts::FRAC_PI_2, epsilon = 1e-4);

    let root = golden_section::find_root(&g, 2.0, 4.0, 1e-6).expect("bracketed root");
    assert_abs_diff_eq!(root.x(), std::f64::consts::PI, epsilon = 1e-5);
}

#[test]
fn coordinate_descent_minimizes_paraboloid() {
    let f = Expression::parse_2d("x^2 + y^2").expect("valid formula");
    let settings = DescentSettings {
        x_range: [-2.0, 2.0],
        y_range: [-2.0, 2.0],
        start: Some([1.5, 1.5]),
        ..DescentSettings::default()
    };
    let result = coordinate_descent::find_extremum(&f, &settings).expect("runs");
    assert_abs_diff_eq!(result.x(), 0.0, epsilon = 1e-2);
    assert_abs_diff_eq!(result.y().expect("2-D point"), 0.0, epsilon = 1e-2);
    assert_abs_diff_eq!(result.value, 0.0, epsilon = 1e-3);
    assert!(!result.boundary_warning);
    assert_finite_fields(&result);
}

#[test]
fn simpson_auto_integrates_sine() {
    let f = Expression::parse_1d("sin(x)").expect("valid formula");
    let settings = AutoSettings {
        epsilon: 1e-4,
        ..AutoSettings::default()
    };
    let results = quadrature::integrate_auto(&f, 0.0, 3.14159, &settings, &[Rule::Simpson], &CancelToken::never())
        .expect("valid interval");
    assert_eq!(results.len(), 1);
    let simpson = &results[0];
    assert!(simpson.converged);
    assert_abs_diff_eq!(simpson.value, 2.0, epsilon = 1e-3);
    assert_eq!(simpson.history.last().map(|h| h.0), Some(simpson.n));
}

#[test]
fn every_rule_approaches_the_exact_integral() {
    let f = Expression::parse_1d("exp(x)").expect("valid formula");
    let exact = std::f64::consts::E - 1.0;
    let results = quadrature::integrate_fixed(&f, 0.0, 1.0, 1000, &Rule::ALL).expect("valid interval");
    assert_eq!(results.len(), Rule::ALL.len());
    for r in results {
        assert_abs_diff_eq!(r.value, exact, epsilon = 2e-3);
    }
}

#[test]
fn quadratic_regression_recovers_parabola() {
    let points: Vec<(f64, f64)> = (0..10).map(|i| {
        let x = i as f64 * 0.5 - 2.0;
        (x, x * x)
    })
    .collect();
    let fit = regression::quadratic(&points).expect("well-posed");
    assert_abs_diff_eq!(fit.coefficients[0], 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.coefficients[1], 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.coefficients[2], 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
}

#[test]
fn newton_minimizes_parabola() {
    let f = Expression::parse_1d("x^2").expect("valid formula");
    let settings = NewtonSettings {
        x0: 1.0,
        a: -2.0,
        b: 2.0,
        ..NewtonSettings::default()
    };
    let result = newton::find_minimum(&f, &settings).expect("runs");
    assert_abs_diff_eq!(result.x(), 0.0, epsilon = 1e-3);
    assert_eq!(result.is_minimum, Some(true));
    assert_finite_fields(&result);
}

#[test]
fn precision_follows_epsilon() {
    assert_eq!(decimal_places(0.001), 3);
    assert_eq!(decimal_places(0.001), decimal_places(0.001));
    assert_eq!(format_value(std::f64::consts::PI, 1e-4), "3.1416");
}

#[test]
fn power_rewrite_is_idempotent() {
    for formula in ["x^2", "2^x^2", "sin(x)^2 + (x+1)^-1", "x ** 3", "pow(2,3) + 2,5^x"] {
        let once = normalize(formula).expect("valid formula");
        let twice = normalize(&once).expect("normalized text is valid");
        assert_eq!(once, twice, "{formula}");
        assert!(!once.contains('^'));
    }
}

#[test]
fn singular_inputs_never_leak_non_finite_values() {
    let pole = Expression::parse_1d("1/x").expect("valid formula");
    let log = Expression::parse_1d("ln(x)").expect("valid formula");

    for x in [0.0, -1.0, 1e300, f64::NAN, f64::INFINITY] {
        assert!(pole.value_at(x).is_finite());
        assert!(log.value_at(x).is_finite());
    }
    assert_eq!(log.value_at(-1.0), UNDEFINED);

    let root = bisection::find_root(&pole, -1.0, 2.0, 1e-3).expect("sign change across pole");
    assert_finite_fields(&root);

    let settings = NewtonSettings {
        x0: 0.5,
        a: -1.0,
        b: 1.0,
        ..NewtonSettings::default()
    };
    let result = newton::find_minimum(&pole, &settings).expect("runs");
    assert_finite_fields(&result);

    let integral = quadrature::integrate(&pole, -1.0, 1.0, 10, Rule::Trapezoid).expect("valid interval");
    assert!(integral.is_finite());

    let grid = sampling::sample_surface(
        &Expression::parse_2d("1/(x*y)").expect("valid formula"),
        [-1.0, 1.0],
        [-1.0, 1.0],
        4,
    )
    .expect("valid box");
    assert!(grid.points.iter().all(|p| p[2].is_finite()));
    assert!(!is_defined(UNDEFINED));
}
