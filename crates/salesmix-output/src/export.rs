//! Export functionality for SalesMix results.
//!
//! CSV and JSON export of regression summaries and brand rankings, and CSV
//! export of the merged analysis table.

use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use salesmix_features::BrandRanking;
use salesmix_model::{BrandEquityRanking, FitSummary, TwoStageFit, significance_code};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Table serialization error.
    #[error("Table serialization error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// One coefficient row of a regression CSV.
#[derive(Debug, Serialize)]
struct CoefficientRow<'a> {
    formula: &'a str,
    term: &'a str,
    estimate: f64,
    std_error: f64,
    t_statistic: f64,
    p_value: f64,
    significance: &'static str,
}

/// One row of a brand ranking CSV.
#[derive(Debug, Serialize)]
struct RankRow<'a> {
    rank: usize,
    brand: &'a str,
    value: f64,
    observations: Option<usize>,
    p_value: Option<f64>,
}

fn csv_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_json::to_string(value)?),
    }
}

fn coefficient_rows(summary: &FitSummary) -> impl Iterator<Item = CoefficientRow<'_>> {
    summary.coefficients.iter().map(|c| CoefficientRow {
        formula: &summary.formula,
        term: &c.term,
        estimate: c.estimate,
        std_error: c.std_error,
        t_statistic: c.t_statistic,
        p_value: c.p_value,
        significance: significance_code(c.p_value),
    })
}

impl Exporter for FitSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(coefficient_rows(self)),
            _ => json(self, format),
        }
    }
}

impl Exporter for TwoStageFit {
    /// CSV holds the structural coefficient table.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(self.structural.iter().map(|c| CoefficientRow {
                formula: &self.second_stage.formula,
                term: &c.term,
                estimate: c.estimate,
                std_error: c.std_error,
                t_statistic: c.t_statistic,
                p_value: c.p_value,
                significance: significance_code(c.p_value),
            })),
            _ => json(self, format),
        }
    }
}

impl Exporter for BrandRanking {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(self.iter().enumerate().map(|(i, e)| RankRow {
                rank: i + 1,
                brand: &e.brand,
                value: e.avg_weekly_dollar_sales,
                observations: Some(e.observations),
                p_value: None,
            })),
            _ => json(self, format),
        }
    }
}

impl Exporter for BrandEquityRanking {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(self.entries.iter().enumerate().map(|(i, e)| RankRow {
                rank: i + 1,
                brand: &e.brand,
                value: e.coefficient,
                observations: None,
                p_value: e.p_value,
            })),
            _ => json(self, format),
        }
    }
}

/// Render a table as CSV with a header row.
pub fn table_to_csv_string(df: &DataFrame) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)?;
    String::from_utf8(buffer).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// Write a table to a CSV file with a header row.
pub fn write_table(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, DataFrame};
    use salesmix_features::BrandRevenue;
    use salesmix_model::{BrandEquity, Coefficient};

    fn summary() -> FitSummary {
        FitSummary {
            formula: "sales ~ final_price".to_string(),
            coefficients: vec![
                Coefficient {
                    term: "(Intercept)".to_string(),
                    factor: None,
                    level: None,
                    estimate: 120.5,
                    std_error: 4.2,
                    t_statistic: 28.69,
                    p_value: 1e-20,
                },
                Coefficient {
                    term: "final_price".to_string(),
                    factor: None,
                    level: None,
                    estimate: -0.75,
                    std_error: 0.3,
                    t_statistic: -2.5,
                    p_value: 0.02,
                },
            ],
            nobs: 50,
            df_residual: 48,
            r_squared: 0.4,
            adj_r_squared: 0.3875,
            residual_std_error: 3.1,
            f_statistic: Some(6.25),
            f_p_value: Some(0.02),
            dropped_rows: 0,
        }
    }

    #[test]
    fn test_summary_csv() {
        let csv = summary().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "formula,term,estimate,std_error,t_statistic,p_value,significance"
        );
        assert!(lines.next().unwrap().contains("(Intercept)"));
        let price = lines.next().unwrap();
        assert!(price.contains("final_price"));
        assert!(price.contains("-0.75"));
        assert!(price.ends_with(",*"));
    }

    #[test]
    fn test_summary_json() {
        let json = summary().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"formula\":\"sales ~ final_price\""));
        assert!(json.contains("\"r_squared\":0.4"));

        let pretty = summary().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[test]
    fn test_ranking_csv() {
        let ranking = BrandRanking {
            entries: vec![
                BrandRevenue::new("Zenith", 400.0, 3),
                BrandRevenue::new("Acme", 200.0, 3),
            ],
            excluded_rows: 1,
        };
        let csv = ranking.export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "rank,brand,value,observations,p_value");
        assert_eq!(lines[1], "1,Zenith,400.0,3,");
        assert_eq!(lines[2], "2,Acme,200.0,3,");
    }

    #[test]
    fn test_equity_csv() {
        let ranking = BrandEquityRanking {
            reference: "Acme".to_string(),
            entries: vec![
                BrandEquity {
                    brand: "Acme".to_string(),
                    coefficient: 0.0,
                    std_error: None,
                    p_value: None,
                },
                BrandEquity {
                    brand: "Orbit".to_string(),
                    coefficient: -4.5,
                    std_error: Some(1.0),
                    p_value: Some(0.001),
                },
            ],
        };
        let csv = ranking.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.contains("1,Acme,0.0,,"));
        assert!(csv.contains("2,Orbit,-4.5,,0.001"));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(
            "pretty-json".parse::<ExportFormat>().unwrap(),
            ExportFormat::PrettyJson
        );
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn test_table_csv() {
        let df = DataFrame::new(vec![
            Column::new("brand".into(), vec!["Acme", "Zenith"]),
            Column::new("sales".into(), vec![Some(10.0), None]),
        ])
        .unwrap();
        let csv = table_to_csv_string(&df).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "brand,sales");
        assert!(lines[1].starts_with("Acme,10"));
        assert_eq!(lines[2], "Zenith,");
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join("salesmix_export_summary.json");
        summary().export_to_file(&path, ExportFormat::Json).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("final_price"));

        std::fs::remove_file(path).ok();
    }
}
