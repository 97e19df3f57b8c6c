//! Output formatting for the ML baseline CLI
//!
//! Renders run reports and run listings as JSON, YAML or colored tables,
//! and prints short summaries after training and prediction.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use ml_baseline_core::{
    BaselineError, ClassificationMetrics, PredictionOutcome, RunId, RunReport, TrainOutcome,
};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// One entry of `list-runs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunListing {
    pub run_id: RunId,
    pub latest: bool,
}

impl RunListing {
    pub fn from_pairs(runs: &[(RunId, bool)]) -> Vec<Self> {
        runs.iter()
            .map(|(run_id, latest)| Self {
                run_id: run_id.clone(),
                latest: *latest,
            })
            .collect()
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BaselineError> {
    serde_json::to_string_pretty(value).map_err(|e| BaselineError::Serialization(e.to_string()))
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String, BaselineError> {
    serde_yaml::to_string(value).map_err(|e| BaselineError::Serialization(e.to_string()))
}

/// Render a run report in the specified format
pub fn render_report(report: &RunReport, format: OutputFormat) -> Result<(), BaselineError> {
    let mut stdout = io::stdout();
    match format {
        OutputFormat::Json => writeln!(stdout, "{}", to_json(report)?).ok(),
        OutputFormat::Yaml => writeln!(stdout, "{}", to_yaml(report)?).ok(),
        OutputFormat::Table => write_report_table(&mut stdout, report).ok(),
    };
    stdout.flush().ok();
    Ok(())
}

/// Render the run listing in the specified format
pub fn render_runs(runs: &[(RunId, bool)], format: OutputFormat) -> Result<(), BaselineError> {
    let listing = RunListing::from_pairs(runs);
    let mut stdout = io::stdout();
    match format {
        OutputFormat::Json => writeln!(stdout, "{}", to_json(&listing)?).ok(),
        OutputFormat::Yaml => writeln!(stdout, "{}", to_yaml(&listing)?).ok(),
        OutputFormat::Table => write_runs_table(&mut stdout, &listing).ok(),
    };
    stdout.flush().ok();
    Ok(())
}

fn write_metrics<W: Write>(out: &mut W, metrics: &ClassificationMetrics) -> io::Result<()> {
    writeln!(out, "{}", "Holdout metrics:".cyan().bold())?;
    for (name, value) in metrics.as_pairs() {
        writeln!(out, "  {:<12} {:.4}", name, value)?;
    }
    if metrics.roc_auc.is_none() {
        writeln!(out, "  {:<12} {}", "roc_auc", "n/a (single class)".dimmed())?;
    }
    Ok(())
}

/// Write a run report as a human-readable table
pub fn write_report_table<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Run".cyan().bold())?;
    writeln!(out, "{}", "=".repeat(60))?;
    let marker = if report.is_latest {
        " (latest)".green().to_string()
    } else {
        String::new()
    };
    writeln!(out, "  Id:        {}{}", report.run_id, marker)?;
    writeln!(out, "  Location:  {}", report.location.display())?;
    if let Some(timestamp) = report.metadata.get("timestamp").and_then(|v| v.as_str()) {
        writeln!(out, "  Created:   {}", timestamp)?;
    }
    if let Some(model) = report
        .metadata
        .pointer("/model/type")
        .and_then(|v| v.as_str())
    {
        writeln!(out, "  Model:     {}", model)?;
    }
    if let Some(stats) = report.metadata.get("data_stats") {
        let n_train = stats.get("n_train").and_then(|v| v.as_u64()).unwrap_or(0);
        let n_test = stats.get("n_test").and_then(|v| v.as_u64()).unwrap_or(0);
        writeln!(out, "  Rows:      {} train / {} test", n_train, n_test)?;
    }
    writeln!(out)?;

    write_metrics(out, &report.metrics)?;
    writeln!(out)?;

    let schema = &report.schema;
    writeln!(out, "{}", "Input schema:".cyan().bold())?;
    writeln!(out, "{}", "-".repeat(60))?;
    for (index, column) in schema.required_feature_columns().iter().enumerate() {
        let dtype = schema.dtype_of(column).map(|d| d.to_string()).unwrap_or_default();
        writeln!(out, "  {:>3}. {:<30} {}", index + 1, column, dtype.dimmed())?;
    }
    if !schema.optional_id_columns().is_empty() {
        let ids: Vec<&str> = schema.optional_id_columns().iter().map(String::as_str).collect();
        writeln!(out, "  Id columns:        {}", ids.join(", "))?;
    }
    if !schema.forbidden_columns().is_empty() {
        let forbidden: Vec<&str> = schema.forbidden_columns().iter().map(String::as_str).collect();
        writeln!(out, "  Forbidden columns: {}", forbidden.join(", ").red())?;
    }
    Ok(())
}

/// Write the run listing as a table, newest last
pub fn write_runs_table<W: Write>(out: &mut W, runs: &[RunListing]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Runs".cyan().bold())?;
    writeln!(out, "{}", "=".repeat(60))?;
    if runs.is_empty() {
        writeln!(out, "  {}", "No runs recorded".dimmed())?;
        return Ok(());
    }
    for run in runs {
        if run.latest {
            writeln!(out, "{} {} {}", "*".green(), run.run_id, "(latest)".green())?;
        } else {
            writeln!(out, "  {}", run.run_id)?;
        }
    }
    writeln!(out)?;
    writeln!(out, "{} run(s)", runs.len())?;
    Ok(())
}

/// Print the outcome of a training run
pub fn print_train_summary(outcome: &TrainOutcome) {
    let mut stdout = io::stdout();
    let summary = &outcome.summary;
    writeln!(stdout, "{} Trained run {}", "+".green(), summary.run_id).ok();
    writeln!(stdout, "{}", "=".repeat(60)).ok();
    writeln!(stdout, "  Target:    {}", summary.target).ok();
    writeln!(stdout, "  Features:  {}", summary.features.join(", ")).ok();
    writeln!(
        stdout,
        "  Split:     {} ({} train / {} test)",
        summary.split_strategy, summary.n_train, summary.n_test
    )
    .ok();
    writeln!(stdout, "  Location:  {}", outcome.run.location.display()).ok();
    writeln!(stdout).ok();
    write_metrics(&mut stdout, &summary.metrics).ok();
    stdout.flush().ok();
}

/// Print where a scored batch was written
pub fn print_prediction_summary(outcome: &PredictionOutcome, path: &Path) {
    println!(
        "{} Scored {} row(s) with run {}",
        "+".green(),
        outcome.output.n_rows(),
        outcome.run_id
    );
    println!("  Predictions saved to: {}", path.display());
}
