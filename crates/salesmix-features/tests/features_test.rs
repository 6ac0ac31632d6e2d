//! Integration tests for deriving prices and ranking brands on merged tables.

use approx::assert_abs_diff_eq;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use salesmix_data::columns::{BRAND_FACTOR, FINAL_PRICE, RRP, WEEKLY_DOLLAR_SALES};
use salesmix_data::{Datasets, MarketingRecord, ProductRecord, SalesRecord, merge};
use salesmix_features::{
    FeatureError, InvalidPricePolicy, brand_levels, derive_final_price, rank_brands,
    resolve_reference_brand, with_brand_factor, with_weekly_dollar_sales,
};

fn analysis_table(sales: &[SalesRecord], policy: InvalidPricePolicy) -> DataFrame {
    let products = ProductRecord::to_frame(&[
        ProductRecord::new("p1", "Acme"),
        ProductRecord::new("p2", "Orbit"),
        ProductRecord::new("p3", "Zenith"),
    ])
    .unwrap();
    let marketing = MarketingRecord::to_frame(&[
        MarketingRecord::new("Acme", "w1", 100.0),
        MarketingRecord::new("Orbit", "w1", 80.0),
        MarketingRecord::new("Zenith", "w1", 60.0),
    ])
    .unwrap();
    let data = Datasets::from_frames(products, SalesRecord::to_frame(sales).unwrap(), marketing)
        .unwrap();

    let merged = merge(&data.sales, &data.products, &data.marketing).unwrap();
    let priced = derive_final_price(&merged, policy).unwrap();
    with_brand_factor(&with_weekly_dollar_sales(&priced).unwrap()).unwrap()
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn test_worked_example() {
    let table = analysis_table(
        &[SalesRecord::new("p1", "w1", 50.0, 100.0, 0.2)],
        InvalidPricePolicy::Reject,
    );

    assert_abs_diff_eq!(f64_column(&table, FINAL_PRICE)[0].unwrap(), 80.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
        f64_column(&table, WEEKLY_DOLLAR_SALES)[0].unwrap(),
        4000.0,
        epsilon = 1e-9
    );
    assert!(table.column(BRAND_FACTOR).is_ok());
}

#[test]
fn test_final_price_within_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    let sales: Vec<SalesRecord> = (0..200)
        .map(|i| {
            SalesRecord::new(
                "p1",
                format!("w{i}"),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..1000.0),
                rng.gen_range(0.0..=1.0),
            )
        })
        .collect();
    let table = analysis_table(&sales, InvalidPricePolicy::Reject);

    for (price, rrp) in f64_column(&table, FINAL_PRICE)
        .into_iter()
        .zip(f64_column(&table, RRP))
    {
        let (price, rrp) = (price.unwrap(), rrp.unwrap());
        assert!(price >= 0.0);
        assert!(price <= rrp);
    }
}

#[test]
fn test_steady_brand_outranks_rising_brand() {
    let sales = [
        SalesRecord::new("p2", "w1", 1.0, 100.0, 0.0),
        SalesRecord::new("p2", "w2", 1.0, 200.0, 0.0),
        SalesRecord::new("p2", "w3", 1.0, 300.0, 0.0),
        SalesRecord::new("p3", "w1", 1.0, 400.0, 0.0),
        SalesRecord::new("p3", "w2", 1.0, 400.0, 0.0),
        SalesRecord::new("p3", "w3", 1.0, 400.0, 0.0),
    ];
    let ranking = rank_brands(&analysis_table(&sales, InvalidPricePolicy::Reject)).unwrap();

    let brands: Vec<&str> = ranking.iter().map(|e| e.brand.as_str()).collect();
    assert_eq!(brands, vec!["Zenith", "Orbit"]);
    assert_abs_diff_eq!(ranking.entries[0].avg_weekly_dollar_sales, 400.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ranking.entries[1].avg_weekly_dollar_sales, 200.0, epsilon = 1e-9);
}

#[test]
fn test_flagged_rows_stay_out_of_ranking() {
    let sales = [
        SalesRecord::new("p1", "w1", 10.0, 100.0, 0.1),
        SalesRecord::new("p2", "w1", 10.0, 100.0, 1.2),
    ];
    let table = analysis_table(&sales, InvalidPricePolicy::Flag);
    let ranking = rank_brands(&table).unwrap();

    assert_eq!(table.height(), 2);
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking.excluded_rows, 1);
    assert_eq!(ranking.top().unwrap().brand, "Acme");
}

#[test]
fn test_nan_list_price_is_not_ranked() {
    let sales = [
        SalesRecord::new("p1", "w1", 10.0, 100.0, 0.1),
        SalesRecord::new("p3", "w1", 5.0, f64::NAN, 0.1),
        SalesRecord::new("p3", "w2", 5.0, 100.0, 0.1),
    ];
    let products = ProductRecord::to_frame(&[
        ProductRecord::new("p1", "Acme"),
        ProductRecord::new("p3", "Zenith"),
    ])
    .unwrap();
    let marketing = MarketingRecord::to_frame(&[MarketingRecord::new("Acme", "w1", 1.0)]).unwrap();
    let data = Datasets::from_frames(products, SalesRecord::to_frame(&sales).unwrap(), marketing)
        .unwrap();
    let merged = merge(&data.sales, &data.products, &data.marketing).unwrap();

    assert!(matches!(
        derive_final_price(&merged, InvalidPricePolicy::Reject),
        Err(FeatureError::InvalidPrice { count: 1, .. })
    ));

    let flagged = derive_final_price(&merged, InvalidPricePolicy::Flag).unwrap();
    let ranking = rank_brands(&flagged).unwrap();
    assert_eq!(ranking.excluded_rows, 1);
    assert!(ranking.iter().all(|e| e.avg_weekly_dollar_sales.is_finite()));
    let brands: Vec<&str> = ranking.iter().map(|e| e.brand.as_str()).collect();
    assert_eq!(brands, vec!["Acme", "Zenith"]);
}

#[rstest]
#[case::requested(Some("Orbit"), "Orbit")]
#[case::top_revenue(None, "Acme")]
fn test_reference_brand(#[case] requested: Option<&str>, #[case] expected: &str) {
    let sales = [
        SalesRecord::new("p1", "w1", 20.0, 100.0, 0.0),
        SalesRecord::new("p2", "w1", 10.0, 100.0, 0.0),
        SalesRecord::new("p3", "w1", 5.0, 100.0, 0.0),
    ];
    let table = analysis_table(&sales, InvalidPricePolicy::Reject);
    let ranking = rank_brands(&table).unwrap();
    let levels = brand_levels(&table).unwrap();

    assert_eq!(
        resolve_reference_brand(requested, &levels, &ranking).unwrap(),
        expected
    );
}

#[test]
fn test_reference_brand_must_exist() {
    let table = analysis_table(
        &[SalesRecord::new("p1", "w1", 20.0, 100.0, 0.0)],
        InvalidPricePolicy::Reject,
    );
    let ranking = rank_brands(&table).unwrap();
    let levels = brand_levels(&table).unwrap();

    assert!(matches!(
        resolve_reference_brand(Some("Orbit"), &levels, &ranking),
        Err(FeatureError::UnknownBrand(_))
    ));
}
