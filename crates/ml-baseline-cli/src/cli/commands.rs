//! CLI command definitions for the ML baseline
//!
//! Provides Clap-based commands for training runs, batch prediction, run
//! inspection and synthetic sample data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use ml_baseline_core::report::list_runs;
use ml_baseline_core::{
    describe_run, read_table, write_table, BaselineError, Column, FsRunStore,
    PredictionOrchestrator, RunRef, Table, TrainConfig, TrainingOrchestrator,
};

use super::output::{self, OutputFormat};
use super::ExitCode;

/// ML Baseline CLI
///
/// Train a tabular binary classifier, freeze its input schema and serve
/// predictions from versioned runs.
#[derive(Parser, Debug)]
#[command(name = "ml-baseline")]
#[command(about = "ML Baseline - train, version and serve a tabular classifier", long_about = None)]
#[command(version)]
pub struct BaselineCli {
    /// Output verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Root directory of the run store
    #[arg(long, env = "ML_BASELINE_HOME", default_value = "models", global = true)]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log line formats
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model and record it as a new run
    ///
    /// Flags override values from --config, which override the defaults.
    Train(TrainArgs),

    /// Score a table with a trained run
    Predict {
        /// Run id, or "latest"
        #[arg(short, long, default_value = "latest")]
        run: String,

        /// Input table (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output table (defaults to output/predictions.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show metadata, metrics and schema of a run
    ShowRun {
        /// Run id, or "latest"
        #[arg(short, long, default_value = "latest")]
        run: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List all runs, marking the latest
    ListRuns {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Write a deterministic synthetic training table
    MakeSampleData {
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of rows
        #[arg(long, default_value_t = 200)]
        rows: usize,

        /// Destination file (.csv or .json)
        #[arg(short, long, default_value = "data/processed/features.csv")]
        output: PathBuf,
    },
}

/// Arguments of the train command
#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Training data file (.csv or .json)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Target (label) column
    #[arg(short, long)]
    pub target: Option<String>,

    /// Identifier column passed through at prediction time
    #[arg(long)]
    pub id_column: Option<String>,

    /// Split strategy: random, time or group
    #[arg(long)]
    pub split: Option<String>,

    /// Column the time split expects the data to be ordered by
    #[arg(long)]
    pub time_column: Option<String>,

    /// Column whose groups the group split keeps together
    #[arg(long)]
    pub group_column: Option<String>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Seed for the random and group splits
    #[arg(long)]
    pub random_state: Option<u64>,

    /// Configuration file (.json, .yaml, .yml or .toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Column to exclude from features and forbid at prediction time (repeatable)
    #[arg(long = "leakage")]
    pub leakage: Vec<String>,
}

impl TrainArgs {
    /// Merge the configuration file (if any) with the command-line flags
    pub fn to_config(&self) -> Result<TrainConfig, BaselineError> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_file(path)?,
            None => TrainConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = Some(data.clone());
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(id_column) = &self.id_column {
            config.id_column = Some(id_column.clone());
        }
        if let Some(split) = &self.split {
            config.split.strategy = split.clone();
        }
        if let Some(time_column) = &self.time_column {
            config.split.time_column = Some(time_column.clone());
        }
        if let Some(group_column) = &self.group_column {
            config.split.group_column = Some(group_column.clone());
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(random_state) = self.random_state {
            config.random_state = random_state;
        }
        if !self.leakage.is_empty() {
            config.leakage_columns = self.leakage.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Execute the train command
pub fn execute_train(
    store: &FsRunStore,
    args: TrainArgs,
    quiet: bool,
) -> Result<ExitCode, BaselineError> {
    let config = args.to_config()?;
    let data_path = config.data_path.clone().ok_or_else(|| {
        BaselineError::configuration(
            "no training data given; pass --data or set data_path in the config file",
        )
    })?;

    let table = read_table(&data_path)?;
    tracing::info!(
        path = %data_path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "Loaded training data"
    );

    let outcome = TrainingOrchestrator::new(store).train(&table, &config)?;
    if !quiet {
        output::print_train_summary(&outcome);
    }
    Ok(ExitCode::Success)
}

/// Execute the predict command
pub fn execute_predict(
    store: &FsRunStore,
    run: &str,
    input: &Path,
    output_path: Option<&Path>,
    quiet: bool,
) -> Result<ExitCode, BaselineError> {
    let run_ref: RunRef = run.parse()?;
    let (outcome, written) =
        PredictionOrchestrator::new(store).predict_file(&run_ref, input, output_path)?;
    if !quiet {
        output::print_prediction_summary(&outcome, &written);
    }
    Ok(ExitCode::Success)
}

/// Execute the show-run command
pub fn execute_show_run(
    store: &FsRunStore,
    run: &str,
    format: OutputFormat,
) -> Result<ExitCode, BaselineError> {
    let report = describe_run(store, &run.parse()?)?;
    output::render_report(&report, format)?;
    Ok(ExitCode::Success)
}

/// Execute the list-runs command
pub fn execute_list_runs(
    store: &FsRunStore,
    format: OutputFormat,
) -> Result<ExitCode, BaselineError> {
    let runs = list_runs(store)?;
    output::render_runs(&runs, format)?;
    Ok(ExitCode::Success)
}

/// Execute the make-sample-data command
pub fn execute_make_sample_data(
    seed: u64,
    rows: usize,
    output_path: &Path,
    quiet: bool,
) -> Result<ExitCode, BaselineError> {
    let table = make_sample_data(seed, rows)?;
    write_table(output_path, &table)?;
    if !quiet {
        println!(
            "Sample data created at {}, shape: ({}, {})",
            output_path.display(),
            table.n_rows(),
            table.n_columns()
        );
    }
    Ok(ExitCode::Success)
}

const SAMPLE_COUNTRIES: [&str; 3] = ["US", "GB", "CA"];

/// Synthetic users: `is_high_value` is 1 exactly when `total_amount` > 50
pub fn make_sample_data(seed: u64, rows: usize) -> Result<Table, BaselineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut countries = Vec::with_capacity(rows);
    let mut n_orders = Vec::with_capacity(rows);
    let mut amounts = Vec::with_capacity(rows);
    for _ in 0..rows {
        countries.push(SAMPLE_COUNTRIES[rng.gen_range(0..SAMPLE_COUNTRIES.len())]);
        n_orders.push(rng.gen_range(1..10i64));
        amounts.push((rng.gen_range(10.0..100.0f64) * 100.0).round() / 100.0);
    }
    let high_value = amounts.iter().map(|&a| i64::from(a > 50.0)).collect();

    Table::new(vec![
        Column::text("user_id", (1..=rows).map(|i| format!("u{:03}", i)).collect()),
        Column::text("country", countries),
        Column::integer("n_orders", n_orders),
        Column::float("total_amount", amounts),
        Column::integer("is_high_value", high_value),
    ])
}
