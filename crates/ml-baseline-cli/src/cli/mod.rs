//! CLI module for the ML baseline
//!
//! Training, prediction and run inspection over a filesystem run store.

pub mod commands;
pub mod output;

pub use commands::{BaselineCli, Commands};

use colored::Colorize;
use ml_baseline_core::{BaselineError, FsRunStore};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Input broke the run's schema contract
    SchemaViolation = 1,
    /// Invalid configuration, arguments or input data
    InvalidInput = 3,
    /// Run or run artifact not found
    NotFound = 4,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Map a failed operation to its exit code
    pub fn from_error(err: &BaselineError) -> Self {
        match err {
            BaselineError::SchemaViolation(_) => ExitCode::SchemaViolation,
            BaselineError::RunNotFound(_) | BaselineError::ArtifactMissing { .. } => {
                ExitCode::NotFound
            }
            BaselineError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ExitCode::InvalidInput
            }
            e if e.is_user_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: BaselineCli) -> Result<ExitCode, BaselineError> {
    let store = FsRunStore::new(&cli.root);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Train(args) => commands::execute_train(&store, args, quiet),
        Commands::Predict {
            run,
            input,
            output,
        } => commands::execute_predict(&store, &run, &input, output.as_deref(), quiet),
        Commands::ShowRun { run, format } => {
            commands::execute_show_run(&store, &run, format)
        }
        Commands::ListRuns { format } => {
            commands::execute_list_runs(&store, format)
        }
        Commands::MakeSampleData { seed, rows, output } => {
            commands::execute_make_sample_data(seed, rows, &output, quiet)
        }
    }
}

/// Run the CLI, reporting any error on stderr
pub fn run_cli(cli: BaselineCli) -> ExitCode {
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::from_error(&e)
        }
    }
}
