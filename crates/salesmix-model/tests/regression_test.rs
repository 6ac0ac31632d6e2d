//! Integration tests for the regression models on synthetic data with known coefficients.

use approx::assert_abs_diff_eq;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use salesmix_data::columns::{
    BRAND_FACTOR, FINAL_PRICE, MARKETING_EXPENSE, PREDICTED_FINAL_PRICE, SALES,
};
use salesmix_model::{
    FormulaSpec, INTERCEPT, ModelError, OlsEstimator, TwoStageLeastSquares, base_model,
    brand_equity_model, brand_equity_ranking, instrumented_model,
};

const BRANDS: [(&str, f64); 4] = [("Acme", 0.0), ("Orbit", -5.0), ("Zenith", -10.0), ("Nova", -20.0)];

fn brand_panel(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut brand = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);
    let mut marketing = Vec::with_capacity(n);
    let mut sales = Vec::with_capacity(n);

    for i in 0..n {
        let (name, effect) = BRANDS[i % BRANDS.len()];
        let p: f64 = rng.gen_range(50.0..150.0);
        let m: f64 = rng.gen_range(0.0..1000.0);
        let noise: f64 = rng.gen_range(-2.0..2.0);

        brand.push(name);
        price.push(p);
        marketing.push(m);
        sales.push(200.0 - 0.8 * p + 0.05 * m + effect + noise);
    }

    DataFrame::new(vec![
        Column::new(BRAND_FACTOR.into(), brand),
        Column::new(FINAL_PRICE.into(), price),
        Column::new(MARKETING_EXPENSE.into(), marketing),
        Column::new(SALES.into(), sales),
    ])
    .unwrap()
}

/// Price responds to an unobserved demand shock that also moves sales.
fn endogenous_panel(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut z1 = Vec::with_capacity(n);
    let mut z2 = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);
    let mut marketing = Vec::with_capacity(n);
    let mut sales = Vec::with_capacity(n);

    for _ in 0..n {
        let a: f64 = rng.gen_range(0.0..10.0);
        let b: f64 = rng.gen_range(0.0..10.0);
        let m: f64 = rng.gen_range(0.0..500.0);
        let shock: f64 = rng.gen_range(-1.0..1.0);
        let p = 50.0 + 3.0 * a + 2.0 * b + 5.0 * shock + rng.gen_range(-1.0..1.0);

        z1.push(a);
        z2.push(b);
        price.push(p);
        marketing.push(m);
        sales.push(300.0 - 1.5 * p + 0.02 * m + 10.0 * shock + rng.gen_range(-1.0..1.0));
    }

    DataFrame::new(vec![
        Column::new("z1".into(), z1),
        Column::new("z2".into(), z2),
        Column::new(FINAL_PRICE.into(), price),
        Column::new(MARKETING_EXPENSE.into(), marketing),
        Column::new(SALES.into(), sales),
    ])
    .unwrap()
}

fn instruments() -> Vec<String> {
    vec!["z1".to_string(), "z2".to_string()]
}

#[test]
fn test_base_model_recovers_slopes() {
    let df = brand_panel(400, 7);
    let model = OlsEstimator::default().fit(&base_model(), &df).unwrap();
    let summary = model.summary();

    assert_eq!(summary.nobs, 400);
    assert_eq!(summary.df_residual, 397);
    // Brand effects are left in the error term, uncorrelated with the regressors
    assert_abs_diff_eq!(summary.coefficient(FINAL_PRICE).unwrap().estimate, -0.8, epsilon = 0.1);
    assert_abs_diff_eq!(
        summary.coefficient(MARKETING_EXPENSE).unwrap().estimate,
        0.05,
        epsilon = 0.01
    );
    assert!(summary.f_p_value.unwrap() < 1e-6);
}

#[test]
fn test_brand_equity_model_recovers_differentials() {
    let df = brand_panel(400, 11);
    let model = OlsEstimator::default()
        .fit(&brand_equity_model("Acme"), &df)
        .unwrap();
    let summary = model.summary();

    assert_abs_diff_eq!(summary.coefficient(FINAL_PRICE).unwrap().estimate, -0.8, epsilon = 0.02);
    for (brand, effect) in &BRANDS[1..] {
        let term = format!("{BRAND_FACTOR}[{brand}]");
        let coefficient = summary.coefficient(&term).unwrap();
        assert_abs_diff_eq!(coefficient.estimate, *effect, epsilon = 1.0);
        assert!(coefficient.p_value < 0.001);
    }
    assert!(summary.r_squared > 0.95);
}

#[test]
fn test_four_levels_give_three_brand_coefficients() {
    let df = brand_panel(80, 3);
    let model = OlsEstimator::default()
        .fit(&brand_equity_model("Zenith"), &df)
        .unwrap();

    let brands: Vec<&str> = model
        .summary()
        .factor_coefficients(BRAND_FACTOR)
        .filter_map(|c| c.level.as_deref())
        .collect();
    assert_eq!(brands.len(), 3);
    assert!(!brands.contains(&"Zenith"));
    assert_eq!(model.summary().coefficients.len(), 6);
}

#[test]
fn test_brand_equity_ranking_orders_by_coefficient() {
    let df = brand_panel(400, 5);
    let model = OlsEstimator::default()
        .fit(&brand_equity_model("Acme"), &df)
        .unwrap();
    let ranking = brand_equity_ranking(&model, BRAND_FACTOR).unwrap();

    let order: Vec<&str> = ranking.entries.iter().map(|e| e.brand.as_str()).collect();
    assert_eq!(order, vec!["Acme", "Orbit", "Zenith", "Nova"]);
}

#[test]
fn test_rows_with_nulls_are_dropped() {
    let df = DataFrame::new(vec![
        Column::new(
            FINAL_PRICE.into(),
            vec![Some(10.0), Some(12.0), None, Some(15.0), Some(9.0), Some(11.0)],
        ),
        Column::new(
            MARKETING_EXPENSE.into(),
            vec![Some(1.0), Some(3.0), Some(2.0), None, Some(5.0), Some(4.0)],
        ),
        Column::new(
            SALES.into(),
            vec![Some(50.0), Some(44.0), Some(40.0), Some(38.0), Some(58.0), Some(47.0)],
        ),
    ])
    .unwrap();

    let summary = OlsEstimator::default()
        .fit(&base_model(), &df)
        .unwrap()
        .into_summary();
    assert_eq!(summary.nobs, 4);
    assert_eq!(summary.dropped_rows, 2);
    assert_eq!(summary.df_residual, 1);
}

#[test]
fn test_duplicated_brand_encoding_is_singular() {
    let df = brand_panel(60, 9);
    let orbit_dummy: Vec<f64> = df
        .column(BRAND_FACTOR)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|b| if b == Some("Orbit") { 1.0 } else { 0.0 })
        .collect();
    let mut df = df;
    df.with_column(Column::new("is_orbit".into(), orbit_dummy))
        .unwrap();

    let formula = base_model()
        .numeric("is_orbit")
        .categorical(BRAND_FACTOR, "Acme");
    match OlsEstimator::default().fit(&formula, &df) {
        Err(ModelError::Singular { formula, term }) => {
            assert!(formula.starts_with("sales ~ final_price"));
            assert_eq!(term, format!("{BRAND_FACTOR}[Orbit]"));
        }
        other => panic!("expected singular design, got {other:?}"),
    }
}

#[test]
fn test_intercept_only_has_no_f_statistic() {
    let df = brand_panel(20, 1);
    let summary = OlsEstimator::default()
        .fit(&FormulaSpec::new(SALES), &df)
        .unwrap()
        .into_summary();

    assert_eq!(summary.coefficients.len(), 1);
    assert_eq!(summary.coefficients[0].term, INTERCEPT);
    assert_eq!(summary.f_statistic, None);
    assert_abs_diff_eq!(summary.r_squared, 0.0, epsilon = 1e-12);
}

#[test]
fn test_second_stage_equals_ols_on_predictions() {
    let df = endogenous_panel(500, 21);
    let tsls = TwoStageLeastSquares::new(instrumented_model(&instruments()), OlsEstimator::default());

    let first = tsls.fit_first_stage(&df).unwrap();
    let second = tsls.fit_second_stage(&df, &first).unwrap();

    let augmented = first.augment(&df).unwrap();
    let plain = OlsEstimator::default()
        .fit(
            &FormulaSpec::new(SALES)
                .numeric(PREDICTED_FINAL_PRICE)
                .numeric(MARKETING_EXPENSE),
            &augmented,
        )
        .unwrap();

    for (a, b) in second.coefficients().iter().zip(plain.coefficients().iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_two_stage_removes_price_bias() {
    let df = endogenous_panel(2000, 42);

    let naive = OlsEstimator::default().fit(&base_model(), &df).unwrap();
    let naive_price = naive.coefficient(FINAL_PRICE).unwrap().estimate;

    let fit = TwoStageLeastSquares::new(instrumented_model(&instruments()), OlsEstimator::default())
        .fit(&df)
        .unwrap();
    let iv_price = fit
        .second_stage
        .coefficient(PREDICTED_FINAL_PRICE)
        .unwrap()
        .estimate;

    assert_abs_diff_eq!(iv_price, -1.5, epsilon = 0.1);
    assert!((iv_price + 1.5).abs() < (naive_price + 1.5).abs());

    // Structural table: same estimates, endogenous regressor under its own name
    let structural = fit.structural_coefficient(FINAL_PRICE).unwrap();
    assert_abs_diff_eq!(structural.estimate, iv_price, epsilon = 1e-12);
    assert!(structural.std_error.is_finite() && structural.std_error > 0.0);
    assert!(fit.structural_coefficient(PREDICTED_FINAL_PRICE).is_none());
    assert_eq!(fit.predicted.len(), 2000);
    assert!(fit.predicted.iter().all(Option::is_some));
}

#[test]
fn test_stale_prediction_column_is_overwritten() {
    let df = endogenous_panel(300, 8);
    let tsls = TwoStageLeastSquares::new(instrumented_model(&instruments()), OlsEstimator::default());
    let clean = tsls.fit(&df).unwrap();

    let mut stale = df.clone();
    stale
        .with_column(Column::new(PREDICTED_FINAL_PRICE.into(), vec![0.0; 300]))
        .unwrap();
    let refit = tsls.fit(&stale).unwrap();

    assert_eq!(clean.second_stage, refit.second_stage);
}

#[test]
fn test_stage_two_rejects_foreign_first_stage() {
    let df = endogenous_panel(200, 2);
    let tsls = TwoStageLeastSquares::new(instrumented_model(&instruments()), OlsEstimator::default());
    let first = tsls.fit_first_stage(&df.head(Some(150))).unwrap();

    assert!(matches!(
        tsls.fit_second_stage(&df, &first),
        Err(ModelError::Sequencing(_))
    ));
}

#[test]
fn test_no_instruments_is_a_specification_error() {
    let df = endogenous_panel(50, 4);
    let tsls = TwoStageLeastSquares::new(instrumented_model(&[]), OlsEstimator::default());

    assert!(matches!(tsls.fit(&df), Err(ModelError::Specification(_))));
}
