//! Merging sales, products, and marketing spend into one analysis table.
//!
//! Every join names its mode and its anchor explicitly. The anchor is the
//! first table handed to [`join`]; with [`JoinMode::Left`] every anchor row
//! survives whether or not the lookup table has a match.
//!
//! The analysis table is built in two steps:
//!
//! 1. `sales LEFT JOIN products ON product_id`
//! 2. `step 1 LEFT JOIN marketing ON (brand, week_id)`
//!
//! Marketing spend is recorded per brand and week, so it fans out to every
//! product row of that brand in that week.

use crate::error::{DataError, Result};
use crate::schema::{TableKind, columns};
use polars::prelude::*;

/// Number of repeated keys quoted in a [`DataError::DuplicateKeys`].
const MAX_KEY_EXAMPLES: usize = 5;

/// Join mode, relative to the anchor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Keep every anchor row.
    Left,

    /// Keep every lookup row.
    Right,

    /// Keep rows matched on both sides.
    Inner,

    /// Keep every row of both tables.
    Outer,
}

impl JoinMode {
    const fn join_type(self) -> JoinType {
        match self {
            Self::Left | Self::Right => JoinType::Left,
            Self::Inner => JoinType::Inner,
            Self::Outer => JoinType::Full,
        }
    }
}

/// A join between an anchor table and a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// Name of the anchor table, used in errors and logs.
    pub anchor: String,
    /// Join mode.
    pub mode: JoinMode,
    /// Key columns, present under the same name on both sides.
    pub keys: Vec<String>,
}

impl JoinSpec {
    /// A left join preserving every row of `anchor`.
    pub fn left(anchor: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            anchor: anchor.into(),
            mode: JoinMode::Left,
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    fn key_exprs(&self) -> Vec<Expr> {
        self.keys.iter().map(|k| col(k.as_str())).collect()
    }
}

/// Join `lookup` onto `anchor`.
pub fn join(anchor: &DataFrame, lookup: &DataFrame, spec: &JoinSpec) -> Result<DataFrame> {
    let keys = spec.key_exprs();
    let (left, right) = match spec.mode {
        JoinMode::Right => (lookup, anchor),
        _ => (anchor, lookup),
    };

    let joined = left
        .clone()
        .lazy()
        .join(
            right.clone().lazy(),
            keys.clone(),
            keys,
            JoinArgs::new(spec.mode.join_type()),
        )
        .collect()?;

    match spec.mode {
        JoinMode::Outer => coalesce_keys(joined, &spec.keys),
        _ => Ok(joined),
    }
}

/// Fold the `<key>_right` columns of a full join back into `<key>`.
fn coalesce_keys(joined: DataFrame, keys: &[String]) -> Result<DataFrame> {
    let right_keys: Vec<String> = keys.iter().map(|k| format!("{k}_right")).collect();
    let filled: Vec<Expr> = keys
        .iter()
        .zip(&right_keys)
        .filter(|(_, right)| joined.get_column_index(right).is_some())
        .map(|(key, right)| {
            when(col(key.as_str()).is_null())
                .then(col(right.as_str()))
                .otherwise(col(key.as_str()))
                .alias(key.as_str())
        })
        .collect();

    let filled = joined.lazy().with_columns(filled).collect()?;
    let kept: Vec<String> = filled
        .get_column_names()
        .into_iter()
        .filter(|name| !right_keys.iter().any(|r| r.as_str() == name.as_str()))
        .map(|name| name.to_string())
        .collect();

    Ok(filled.select(kept)?)
}

/// Fail if `df` holds more than one row for any value of `keys`.
pub fn ensure_unique_keys(df: &DataFrame, table: &str, keys: &[&str]) -> Result<()> {
    let duplicates = repeated_keys(df, keys)?;
    if duplicates.height() == 0 {
        return Ok(());
    }

    let mut parts: Vec<Vec<String>> = vec![Vec::new(); duplicates.height().min(MAX_KEY_EXAMPLES)];
    for key in keys {
        let values = duplicates.column(key)?.cast(&DataType::String)?;
        let values = values.as_materialized_series().str()?.clone();
        for (i, part) in parts.iter_mut().enumerate() {
            part.push(values.get(i).unwrap_or("null").to_string());
        }
    }

    Err(DataError::DuplicateKeys {
        table: table.to_string(),
        keys: keys.join(", "),
        count: duplicates.height(),
        examples: parts.into_iter().map(|p| p.join("/")).collect(),
    })
}

fn repeated_keys(df: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let duplicates = df
        .clone()
        .lazy()
        .group_by_stable(keys.iter().map(|k| col(*k)).collect::<Vec<_>>())
        .agg([len().alias("__rows")])
        .filter(col("__rows").gt(lit(1)))
        .collect()?;
    Ok(duplicates)
}

/// Build the analysis table, one row per sales row.
///
/// Products and marketing spend must be unique on their keys; repeated keys
/// would multiply sales rows and are reported as [`DataError::DuplicateKeys`].
pub fn merge(sales: &DataFrame, products: &DataFrame, marketing: &DataFrame) -> Result<DataFrame> {
    ensure_unique_keys(
        products,
        TableKind::Products.name(),
        TableKind::Products.key_columns(),
    )?;
    ensure_unique_keys(
        marketing,
        TableKind::Marketing.name(),
        TableKind::Marketing.key_columns(),
    )?;

    let repeated_sales = repeated_keys(sales, TableKind::Sales.key_columns())?.height();
    if repeated_sales > 0 {
        tracing::warn!(
            keys = repeated_sales,
            "sales table holds repeated (product_id, week_id) keys"
        );
    }

    let with_products = join(
        sales,
        products,
        &JoinSpec::left(TableKind::Sales.name(), &[columns::PRODUCT_ID]),
    )?;
    let merged = join(
        &with_products,
        marketing,
        &JoinSpec::left("sales+products", &[columns::BRAND, columns::WEEK_ID]),
    )?;

    if merged.height() != sales.height() {
        return Err(DataError::CardinalityChanged {
            anchor: TableKind::Sales.name().to_string(),
            expected: sales.height(),
            actual: merged.height(),
        });
    }

    let without_brand = merged.column(columns::BRAND)?.null_count();
    let without_spend = merged.column(columns::MARKETING_EXPENSE)?.null_count();
    if without_brand > 0 {
        tracing::warn!(rows = without_brand, "sales rows without a catalog brand");
    }
    if without_spend > 0 {
        tracing::warn!(rows = without_spend, "sales rows without marketing spend");
    }
    tracing::debug!(
        rows = merged.height(),
        columns = merged.width(),
        "merged analysis table"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{MarketingRecord, ProductRecord, SalesRecord};

    fn products() -> DataFrame {
        ProductRecord::to_frame(&[
            ProductRecord::new("p1", "Acme"),
            ProductRecord::new("p2", "Acme"),
            ProductRecord::new("p3", "Zenith"),
        ])
        .unwrap()
    }

    fn marketing() -> DataFrame {
        MarketingRecord::to_frame(&[
            MarketingRecord::new("Acme", "1", 500.0),
            MarketingRecord::new("Zenith", "1", 200.0),
            MarketingRecord::new("Acme", "2", 300.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let sales = SalesRecord::to_frame(&[
            SalesRecord::new("p1", "1", 1.0, 10.0, 0.0),
            SalesRecord::new("p9", "1", 1.0, 10.0, 0.0),
        ])
        .unwrap();
        let spec = JoinSpec {
            anchor: "sales".to_string(),
            mode: JoinMode::Inner,
            keys: vec![columns::PRODUCT_ID.to_string()],
        };

        let joined = join(&sales, &products(), &spec).unwrap();
        assert_eq!(joined.height(), 1);
    }

    #[test]
    fn test_right_join_keeps_lookup_rows() {
        let sales = SalesRecord::to_frame(&[SalesRecord::new("p1", "1", 1.0, 10.0, 0.0)]).unwrap();
        let spec = JoinSpec {
            anchor: "sales".to_string(),
            mode: JoinMode::Right,
            keys: vec![columns::PRODUCT_ID.to_string()],
        };

        let joined = join(&sales, &products(), &spec).unwrap();
        assert_eq!(joined.height(), 3);
    }

    #[test]
    fn test_outer_join_keeps_one_key_column() {
        let sales = SalesRecord::to_frame(&[
            SalesRecord::new("p1", "1", 1.0, 10.0, 0.0),
            SalesRecord::new("p9", "1", 1.0, 10.0, 0.0),
        ])
        .unwrap();
        let spec = JoinSpec {
            anchor: "sales".to_string(),
            mode: JoinMode::Outer,
            keys: vec![columns::PRODUCT_ID.to_string()],
        };

        let joined = join(&sales, &products(), &spec).unwrap();
        assert_eq!(joined.height(), 4);
        assert!(joined.column("product_id_right").is_err());

        let ids = joined.column(columns::PRODUCT_ID).unwrap();
        assert_eq!(ids.null_count(), 0);
        let mut ids: Vec<String> = ids
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p9"]);
    }

    #[test]
    fn test_marketing_fans_out_across_products() {
        let sales = SalesRecord::to_frame(&[
            SalesRecord::new("p1", "1", 1.0, 10.0, 0.0),
            SalesRecord::new("p2", "1", 2.0, 20.0, 0.0),
        ])
        .unwrap();

        let merged = merge(&sales, &products(), &marketing()).unwrap();
        let spend = merged.column(columns::MARKETING_EXPENSE).unwrap();
        let spend = spend.as_materialized_series().f64().unwrap();

        assert_eq!(spend.get(0), Some(500.0));
        assert_eq!(spend.get(1), Some(500.0));
    }

    #[test]
    fn test_duplicate_marketing_keys() {
        let marketing = MarketingRecord::to_frame(&[
            MarketingRecord::new("Acme", "1", 500.0),
            MarketingRecord::new("Acme", "1", 600.0),
        ])
        .unwrap();

        let err = ensure_unique_keys(&marketing, "marketing", &[columns::BRAND, columns::WEEK_ID])
            .unwrap_err();
        match err {
            DataError::DuplicateKeys {
                count, examples, ..
            } => {
                assert_eq!(count, 1);
                assert_eq!(examples, vec!["Acme/1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
