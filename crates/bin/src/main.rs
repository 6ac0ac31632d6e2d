//! SalesMix CLI binary.
//!
//! Provides command-line interface for the SalesMix marketing-mix pipeline.

use clap::{Args, Parser, Subcommand, ValueEnum};
use salesmix::features::InvalidPricePolicy;
use salesmix::output::{ExportFormat, Exporter, Render, table_to_csv_string, write_table};
use salesmix::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "salesmix")]
#[command(about = "SalesMix: price, promotion and brand effects on weekly sales", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and fit every model specification
    Analyze {
        #[command(flatten)]
        inputs: InputArgs,

        /// Reference level of the brand factor (default: top revenue brand)
        #[arg(long)]
        reference_brand: Option<String>,

        /// Instrument column for the two-stage price model, repeatable
        #[arg(long = "instrument")]
        instruments: Vec<String>,

        /// Base model formula, e.g. "sales ~ final_price + marketing_expense"
        #[arg(long)]
        base_formula: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write tables and the JSON report to this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Rank brands by average weekly dollar sales
    Rank {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write the ranking to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Format of the exported ranking: csv, json or pretty-json
        #[arg(long, default_value = "csv")]
        export_format: ExportFormat,
    },

    /// Write the merged analysis table as CSV
    Merge {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Product catalog CSV
    #[arg(long)]
    products: Option<PathBuf>,

    /// Weekly sales CSV
    #[arg(long)]
    sales: Option<PathBuf>,

    /// Weekly marketing spend CSV
    #[arg(long)]
    marketing: Option<PathBuf>,

    /// Flag out-of-range discount or RRP instead of failing
    #[arg(long)]
    flag_invalid_prices: bool,
}

impl InputArgs {
    /// Config file values overridden by the flags that were given.
    fn resolve(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(path) = self.products {
            config.products = path;
        }
        if let Some(path) = self.sales {
            config.sales = path;
        }
        if let Some(path) = self.marketing {
            config.marketing = path;
        }
        if self.flag_invalid_prices {
            config.invalid_price_policy = InvalidPricePolicy::Flag;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Plain-text tables
    Text,
    /// Pretty-printed JSON
    Json,
    /// Markdown tables
    Markdown,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Analyze {
            inputs,
            reference_brand,
            instruments,
            base_formula,
            format,
            export_dir,
        } => {
            let mut config = inputs.resolve()?;
            if reference_brand.is_some() {
                config.reference_brand = reference_brand;
            }
            if !instruments.is_empty() {
                config.instruments = instruments;
            }
            if base_formula.is_some() {
                config.base_formula = base_formula;
            }
            if export_dir.is_some() {
                config.export_dir = export_dir;
            }
            analyze(config, format)?;
        }
        Commands::Rank {
            inputs,
            format,
            export,
            export_format,
        } => {
            let export = export.map(|path| (path, export_format));
            rank(inputs.resolve()?, format, export)?;
        }
        Commands::Merge { inputs, output } => {
            merge(inputs.resolve()?, output)?;
        }
    }

    Ok(())
}

fn analyze(config: PipelineConfig, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let export_dir = config.export_dir.clone();
    let pipeline = Pipeline::new(config);
    let output = pipeline.run()?;

    match format {
        OutputFormat::Text => println!("{}", output.report.to_ascii_table()),
        OutputFormat::Markdown => println!("{}", output.report.to_markdown()),
        OutputFormat::Json => println!("{}", output.report.to_json()?),
    }

    if let Some(dir) = export_dir {
        let written = pipeline.export(&output, &dir)?;
        for path in written {
            tracing::info!(path = %path.display(), "wrote");
        }
    }

    if output.report.failures() > 0 {
        tracing::warn!(
            failed = output.report.failures(),
            "see the report for the failed specifications"
        );
    }

    Ok(())
}

fn rank(
    config: PipelineConfig,
    format: OutputFormat,
    export: Option<(PathBuf, ExportFormat)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config);
    let prepared = pipeline.prepare(&pipeline.load()?)?;

    match format {
        OutputFormat::Text => println!("{}", prepared.ranking.to_ascii_table()),
        OutputFormat::Markdown => println!("{}", prepared.ranking.to_markdown()),
        OutputFormat::Json => println!(
            "{}",
            prepared.ranking.export_to_string(ExportFormat::PrettyJson)?
        ),
    }

    if let Some((path, export_format)) = export {
        prepared.ranking.export_to_file(&path, export_format)?;
        tracing::info!(path = %path.display(), format = export_format.extension(), "wrote ranking");
    }

    Ok(())
}

fn merge(config: PipelineConfig, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config);
    let prepared = pipeline.prepare(&pipeline.load()?)?;

    match output {
        Some(path) => {
            write_table(&prepared.table, &path)?;
            tracing::info!(
                path = %path.display(),
                rows = prepared.table.height(),
                "wrote merged table"
            );
        }
        None => print!("{}", table_to_csv_string(&prepared.table)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rank_export_format() {
        let cli = Cli::try_parse_from([
            "salesmix",
            "rank",
            "--export",
            "ranking.json",
            "--export-format",
            "pretty-json",
        ])
        .unwrap();

        match cli.command {
            Commands::Rank {
                export,
                export_format,
                ..
            } => {
                assert_eq!(export, Some(PathBuf::from("ranking.json")));
                assert_eq!(export_format, ExportFormat::PrettyJson);
            }
            _ => panic!("expected the rank command"),
        }
    }

    #[test]
    fn test_rank_export_defaults_to_csv() {
        let cli = Cli::try_parse_from(["salesmix", "rank"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Rank {
                export: None,
                export_format: ExportFormat::Csv,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_export_format() {
        assert!(Cli::try_parse_from(["salesmix", "rank", "--export-format", "xml"]).is_err());
    }

    #[test]
    fn test_analyze_base_formula() {
        let cli = Cli::try_parse_from([
            "salesmix",
            "analyze",
            "--base-formula",
            "sales ~ final_price",
            "--instrument",
            "supplier_cost",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                base_formula,
                instruments,
                ..
            } => {
                assert_eq!(base_formula.as_deref(), Some("sales ~ final_price"));
                assert_eq!(instruments, vec!["supplier_cost"]);
            }
            _ => panic!("expected the analyze command"),
        }
    }
}
