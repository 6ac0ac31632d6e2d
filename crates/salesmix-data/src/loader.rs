//! Delimited-file loading for the three input tables.

use crate::error::{DataError, Result};
use crate::schema::TableKind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for reading delimited files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field separator (default: `,`)
    pub separator: u8,
    /// Rows used for schema inference, `None` scans the whole file (default: 1000)
    pub infer_schema_length: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            separator: b',',
            infer_schema_length: Some(1000),
        }
    }
}

impl LoaderConfig {
    fn read_options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(CsvParseOptions::default().with_separator(self.separator))
    }
}

/// Locations of the three input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPaths {
    /// Product catalog.
    pub products: PathBuf,
    /// Weekly sales.
    pub sales: PathBuf,
    /// Weekly marketing spend.
    pub marketing: PathBuf,
}

impl DatasetPaths {
    /// Create a new set of paths.
    pub fn new(
        products: impl Into<PathBuf>,
        sales: impl Into<PathBuf>,
        marketing: impl Into<PathBuf>,
    ) -> Self {
        Self {
            products: products.into(),
            sales: sales.into(),
            marketing: marketing.into(),
        }
    }

    /// Path of a given table.
    pub fn path(&self, kind: TableKind) -> &Path {
        match kind {
            TableKind::Products => &self.products,
            TableKind::Sales => &self.sales,
            TableKind::Marketing => &self.marketing,
        }
    }
}

/// The three input tables, normalized.
#[derive(Debug, Clone)]
pub struct Datasets {
    /// Product catalog.
    pub products: DataFrame,
    /// Weekly sales.
    pub sales: DataFrame,
    /// Weekly marketing spend.
    pub marketing: DataFrame,
}

impl Datasets {
    /// Load all three tables from disk.
    pub fn load(paths: &DatasetPaths, config: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            products: read_table(paths.path(TableKind::Products), TableKind::Products, config)?,
            sales: read_table(paths.path(TableKind::Sales), TableKind::Sales, config)?,
            marketing: read_table(
                paths.path(TableKind::Marketing),
                TableKind::Marketing,
                config,
            )?,
        })
    }

    /// Wrap tables that are already in memory, normalizing them the same way.
    pub fn from_frames(
        products: DataFrame,
        sales: DataFrame,
        marketing: DataFrame,
    ) -> Result<Self> {
        Ok(Self {
            products: normalize(products, TableKind::Products)?,
            sales: normalize(sales, TableKind::Sales)?,
            marketing: normalize(marketing, TableKind::Marketing)?,
        })
    }
}

/// Read one table from a delimited file.
pub fn read_table(path: &Path, kind: TableKind, config: &LoaderConfig) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} table not found at {}", kind, path.display()),
        )));
    }

    let df = config
        .read_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    tracing::info!(
        table = kind.name(),
        path = %path.display(),
        rows = df.height(),
        "loaded table"
    );

    normalize(df, kind)
}

/// Read one table from delimited text held in memory.
pub fn read_table_from_str(text: &str, kind: TableKind, config: &LoaderConfig) -> Result<DataFrame> {
    let df = config
        .read_options()
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()?;

    normalize(df, kind)
}

/// Check required columns and cast keys to strings and measures to `f64`.
fn normalize(df: DataFrame, kind: TableKind) -> Result<DataFrame> {
    for column in kind.required_columns() {
        if df.get_column_index(column).is_none() {
            return Err(DataError::MissingColumn {
                table: kind.name().to_string(),
                column: (*column).to_string(),
            });
        }
    }

    if df.height() == 0 {
        return Err(DataError::EmptyTable(kind.name().to_string()));
    }

    let casts: Vec<Expr> = kind
        .id_columns()
        .iter()
        .map(|c| col(*c).cast(DataType::String))
        .chain(
            kind.numeric_columns()
                .iter()
                .map(|c| col(*c).cast(DataType::Float64)),
        )
        .collect();

    let normalized = df.lazy().with_columns(casts).collect()?;

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::columns;

    const SALES_CSV: &str = "product_id,week_id,sales,RRP,discount\n\
                             1,1,10,100,0.1\n\
                             2,1,4,250.5,0\n";

    #[test]
    fn test_read_sales_from_str() {
        let df = read_table_from_str(SALES_CSV, TableKind::Sales, &LoaderConfig::default())
            .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column(columns::PRODUCT_ID).unwrap().dtype(),
            &DataType::String
        );
        assert_eq!(df.column(columns::SALES).unwrap().dtype(), &DataType::Float64);
        assert_eq!(
            df.column(columns::DISCOUNT).unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_missing_column() {
        let csv = "product_id,week_id,sales\n1,1,10\n";
        let result = read_table_from_str(csv, TableKind::Sales, &LoaderConfig::default());

        assert!(matches!(
            result,
            Err(DataError::MissingColumn { ref column, .. }) if column == "RRP"
        ));
    }

    #[test]
    fn test_empty_table() {
        let csv = "brand,week_id,marketing_expense\n";
        let result = read_table_from_str(csv, TableKind::Marketing, &LoaderConfig::default());

        assert!(matches!(result, Err(DataError::EmptyTable(_))));
    }

    #[test]
    fn test_custom_separator() {
        let csv = "product_id;brand\nA1;Acme\n";
        let config = LoaderConfig {
            separator: b';',
            ..Default::default()
        };
        let df = read_table_from_str(csv, TableKind::Products, &config).unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_missing_file() {
        let result = read_table(
            Path::new("/definitely/not/here.csv"),
            TableKind::Products,
            &LoaderConfig::default(),
        );

        assert!(matches!(result, Err(DataError::Io(_))));
    }
}
