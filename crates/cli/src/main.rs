// eancheck - reconcile product identifiers against reference sources

mod compare;
mod exit_codes;
mod inspect;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eancheck_io::IoError;
use eancheck_recon::{EventLevel, ReconError, RunEvent};
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "eancheck")]
#[command(about = "Classify spreadsheet rows by the reference sources their identifiers appear in")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Show engine progress (info/debug logging)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation described by a TOML run file
    #[command(after_help = "\
Examples:
  eancheck run orders.toml
  eancheck run orders.toml --json
  eancheck run orders.toml --output orders-labelled.xlsx
  eancheck run orders.toml --output assignments.csv --strict-labels")]
    Run {
        /// Path to the run file
        config: PathBuf,

        /// Print the full result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write results to a file (.xlsx annotated copy, .csv rows, .json result)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Fail when the label count differs from labels.expected_count
        #[arg(long)]
        strict_labels: bool,
    },

    /// Compare the label columns of two workbooks row by row
    #[command(after_help = "\
Examples:
  eancheck compare before.xlsx after.xlsx --column F
  eancheck compare before.xlsx after.xlsx --column F --sheet Orders --right-sheet 0
  eancheck compare before.xlsx after.xlsx --column 6 --json
  eancheck compare before.xlsx after.csv --column F --output diff.csv")]
    Compare {
        /// Left (side 1) workbook or CSV
        left: PathBuf,

        /// Right (side 2) workbook or CSV
        right: PathBuf,

        /// Column to compare (letters or 1-based number)
        #[arg(long, short = 'c')]
        column: String,

        /// Sheet of the left file (index or name)
        #[arg(long, default_value = "0")]
        sheet: String,

        /// Sheet of the right file; defaults to --sheet
        #[arg(long)]
        right_sheet: Option<String>,

        /// First data row (1-based)
        #[arg(long, default_value_t = 2)]
        start_row: u32,

        /// Print the result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write divergent rows to a CSV file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the candidate labels of a status column
    #[command(after_help = "\
Examples:
  eancheck labels orders.xlsx --column F
  eancheck labels orders.xlsx --column F --sheet Orders")]
    Labels {
        /// Workbook holding the status column
        workbook: PathBuf,

        /// Status column (letters or 1-based number)
        #[arg(long, short = 'c')]
        column: String,

        /// Sheet (index or name)
        #[arg(long, default_value = "0")]
        sheet: String,

        /// First data row, used when labels are read from cell values
        #[arg(long, default_value_t = 2)]
        start_row: u32,
    },

    /// Extract identifiers from a document (.docx, .txt)
    #[command(after_help = "\
Examples:
  eancheck extract 'KING01042 Brief.docx'
  eancheck extract notes.txt --min-digits 12 --max-digits 13
  eancheck extract brief.docx --allow-non-numeric --json")]
    Extract {
        /// Document to scan
        file: PathBuf,

        /// Shortest accepted identifier
        #[arg(long, default_value_t = 8)]
        min_digits: usize,

        /// Longest accepted all-digit identifier
        #[arg(long, default_value_t = 14)]
        max_digits: usize,

        /// Also accept alphanumeric codes
        #[arg(long)]
        allow_non_numeric: bool,

        /// Print identifiers with context as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how source names would map to candidate labels
    #[command(after_help = "\
Examples:
  eancheck map --source 'KING01042 Brief' --source 'KING01058 Brief' \\
      --label 'Recieved - KING01042' --label 'Recieved - KING01058' --label Missing")]
    Map {
        /// Reference source name (repeatable)
        #[arg(long = "source", required = true)]
        sources: Vec<String>,

        /// Candidate label (repeatable)
        #[arg(long = "label", required = true)]
        labels: Vec<String>,

        /// Print the mapping as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  eancheck-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "eancheck=debug,info" } else { "eancheck=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, json, output, strict_labels } => {
            run::cmd_run(config, json, output, strict_labels)
        }
        Commands::Compare { left, right, column, sheet, right_sheet, start_row, json, output } => {
            compare::cmd_compare(left, right, column, sheet, right_sheet, start_row, json, output)
        }
        Commands::Labels { workbook, column, sheet, start_row } => {
            inspect::cmd_labels(workbook, column, sheet, start_row)
        }
        Commands::Extract { file, min_digits, max_digits, allow_non_numeric, json } => {
            inspect::cmd_extract(file, min_digits, max_digits, allow_non_numeric, json)
        }
        Commands::Map { sources, labels, json } => inspect::cmd_map(sources, labels, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Exit code only; nothing is printed.
    pub fn silent(code: u8) -> Self {
        Self::new(code, "")
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::NoIdentifiers => {
                Some("check main.ean_column, main.start_row and the [bounds] digit range")
            }
            ReconError::EmptyCandidateLabels => {
                Some("add a list data validation to the status column, or fill it with the labels")
            }
            ReconError::UnresolvedMapping { .. } => {
                Some("set labels.fallback, or give the reference a `label` in the run file")
            }
            ReconError::LabelCountMismatch { .. } => {
                Some("fix labels.expected_count or drop --strict-labels")
            }
            _ => None,
        };
        Self {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::UnsupportedFormat(_) => {
                Some("supported: .xlsx .xlsm .xls .xlsb .ods .csv .tsv (grids), .docx .txt (documents)")
            }
            IoError::SheetNotFound { .. } => Some("sheets are selected by 0-based index or exact name"),
            _ => None,
        };
        Self {
            code: io_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}

// ============================================================================
// Event routing
// ============================================================================

/// Replay engine events through tracing. Error events are skipped; the
/// failure itself is reported by `main`.
pub fn emit_events(events: &[RunEvent]) {
    for event in events {
        match event.level {
            EventLevel::Info => tracing::info!("{}", event.message),
            EventLevel::Warning => tracing::warn!("{}", event.message),
            EventLevel::Error => {}
        }
    }
}

pub fn parse_column_arg(flag: &str, value: &str) -> Result<u32, CliError> {
    eancheck_recon::grid::parse_column(value).ok_or_else(|| {
        CliError::usage(format!("{flag}: bad column '{value}'"))
            .with_hint("use letters (F, AA) or a 1-based number (6)")
    })
}
