//! Terminal and Markdown tables for regression results and brand rankings.

use salesmix_features::BrandRanking;
use salesmix_model::{BrandEquityRanking, Coefficient, FitSummary, INTERCEPT, TwoStageFit};

const WIDTH: usize = 80;
const SIGNIF_LEGEND: &str = "Signif. codes: 0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1 ' ' 1";

/// Plain-text and Markdown rendering.
pub trait Render {
    /// Format as ASCII table for terminal display.
    fn to_ascii_table(&self) -> String;

    /// Format as Markdown for documentation.
    fn to_markdown(&self) -> String;
}

/// Format a p-value the way regression tables usually do.
pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 2e-16 {
        "<2e-16".to_string()
    } else if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

fn rule(c: char) -> String {
    let mut line = c.to_string().repeat(WIDTH);
    line.push('\n');
    line
}

fn ascii_coefficients(output: &mut String, coefficients: &[Coefficient]) {
    output.push_str(&format!(
        "{:<28} {:>12} {:>12} {:>9} {:>10}\n",
        "Term", "Estimate", "Std. Error", "t value", "Pr(>|t|)"
    ));
    output.push_str(&rule('-'));
    for c in coefficients {
        output.push_str(&format!(
            "{:<28} {:>12.4} {:>12.4} {:>9.3} {:>10} {}\n",
            c.term,
            c.estimate,
            c.std_error,
            c.t_statistic,
            format_p_value(c.p_value),
            c.significance()
        ));
    }
}

fn markdown_coefficients(output: &mut String, coefficients: &[Coefficient]) {
    output.push_str("| Term | Estimate | Std. Error | t value | Pr(>\\|t\\|) | |\n");
    output.push_str("|------|---------:|-----------:|--------:|-----------:|---|\n");
    for c in coefficients {
        output.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.3} | {} | {} |\n",
            c.term,
            c.estimate,
            c.std_error,
            c.t_statistic,
            format_p_value(c.p_value),
            c.significance()
        ));
    }
}

fn fit_statistics(summary: &FitSummary) -> Vec<String> {
    let mut lines = Vec::new();

    let mut residual = format!(
        "Residual standard error: {:.4} on {} degrees of freedom",
        summary.residual_std_error, summary.df_residual
    );
    if summary.dropped_rows > 0 {
        residual.push_str(&format!(
            " ({} rows dropped for missing values)",
            summary.dropped_rows
        ));
    }
    lines.push(residual);

    lines.push(format!(
        "R-squared: {:.4}, Adjusted R-squared: {:.4}, Observations: {}",
        summary.r_squared, summary.adj_r_squared, summary.nobs
    ));

    if let (Some(f), Some(p)) = (summary.f_statistic, summary.f_p_value) {
        lines.push(format!(
            "F-statistic: {:.3} on {} and {} DF, p-value: {}",
            f,
            summary.parameters() - usize::from(summary.coefficient(INTERCEPT).is_some()),
            summary.df_residual,
            format_p_value(p)
        ));
    }

    lines
}

impl Render for FitSummary {
    fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nModel: {}\n", self.formula));
        output.push_str(&rule('='));
        ascii_coefficients(&mut output, &self.coefficients);
        output.push_str(&rule('-'));
        output.push_str(SIGNIF_LEGEND);
        output.push('\n');
        for line in fit_statistics(self) {
            output.push_str(&line);
            output.push('\n');
        }
        output.push_str(&rule('='));

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("### `{}`\n\n", self.formula));
        markdown_coefficients(&mut output, &self.coefficients);
        output.push('\n');
        for line in fit_statistics(self) {
            output.push_str(&format!("- {line}\n"));
        }
        output.push_str(&format!("\n_{SIGNIF_LEGEND}_\n"));

        output
    }
}

impl Render for TwoStageFit {
    fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nStage 1");
        output.push_str(&self.first_stage.to_ascii_table());
        output.push_str("\nStage 2 (naive standard errors)");
        output.push_str(&self.second_stage.to_ascii_table());

        output.push_str("\nStage 2 (structural standard errors)\n");
        output.push_str(&rule('='));
        ascii_coefficients(&mut output, &self.structural);
        output.push_str(&rule('-'));
        output.push_str(&format!(
            "Structural residual standard error: {:.4}\n",
            self.structural_residual_std_error
        ));
        output.push_str(&rule('='));

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("#### Stage 1\n\n");
        output.push_str(&self.first_stage.to_markdown());
        output.push_str("\n#### Stage 2\n\n");
        output.push_str(&self.second_stage.to_markdown());
        output.push_str("\n#### Stage 2, structural standard errors\n\n");
        markdown_coefficients(&mut output, &self.structural);
        output.push_str(&format!(
            "\n- Structural residual standard error: {:.4}\n",
            self.structural_residual_std_error
        ));

        output
    }
}

impl Render for BrandRanking {
    fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nBrands by Average Weekly Dollar Sales\n");
        output.push_str(&rule('='));
        output.push_str(&format!(
            "{:>4}  {:<30} {:>22} {:>12}\n",
            "Rank", "Brand", "Avg Weekly $ Sales", "Rows"
        ));
        output.push_str(&rule('-'));
        for (i, entry) in self.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:<30} {:>22.2} {:>12}\n",
                i + 1,
                entry.brand,
                entry.avg_weekly_dollar_sales,
                entry.observations
            ));
        }
        if self.excluded_rows > 0 {
            output.push_str(&rule('-'));
            output.push_str(&format!(
                "{} rows without sales, price or brand excluded\n",
                self.excluded_rows
            ));
        }
        output.push_str(&rule('='));

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("## Brands by Average Weekly Dollar Sales\n\n");
        output.push_str("| Rank | Brand | Avg Weekly $ Sales | Rows |\n");
        output.push_str("|-----:|-------|-------------------:|-----:|\n");
        for (i, entry) in self.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {:.2} | {} |\n",
                i + 1,
                entry.brand,
                entry.avg_weekly_dollar_sales,
                entry.observations
            ));
        }
        if self.excluded_rows > 0 {
            output.push_str(&format!(
                "\n_{} rows without sales, price or brand excluded._\n",
                self.excluded_rows
            ));
        }

        output
    }
}

impl Render for BrandEquityRanking {
    fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nBrand Equity (reference: {})\n",
            self.reference
        ));
        output.push_str(&rule('='));
        output.push_str(&format!(
            "{:>4}  {:<30} {:>14} {:>12} {:>10}\n",
            "Rank", "Brand", "Differential", "Std. Error", "Pr(>|t|)"
        ));
        output.push_str(&rule('-'));
        for (i, entry) in self.entries.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:<30} {:>14.4} {:>12} {:>10}\n",
                i + 1,
                entry.brand,
                entry.coefficient,
                entry.std_error.map(|s| format!("{s:.4}")).unwrap_or_default(),
                entry.p_value.map(format_p_value).unwrap_or_default()
            ));
        }
        output.push_str(&rule('='));

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "## Brand Equity\n\n**Reference brand:** {}\n\n",
            self.reference
        ));
        output.push_str("| Rank | Brand | Differential | Std. Error | Pr(>\\|t\\|) |\n");
        output.push_str("|-----:|-------|-------------:|-----------:|-----------:|\n");
        for (i, entry) in self.entries.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {:.4} | {} | {} |\n",
                i + 1,
                entry.brand,
                entry.coefficient,
                entry.std_error.map(|s| format!("{s:.4}")).unwrap_or_default(),
                entry.p_value.map(format_p_value).unwrap_or_default()
            ));
        }

        output
    }
}
