//! `eancheck run` — config-driven reconciliation of one main sheet.

use std::path::{Path, PathBuf};

use eancheck_io::source::{load_reference, open_main_grid, ReferenceOptions};
use eancheck_io::{writer, xlsx_validation, SheetGrid, SheetSelector};
use eancheck_recon::engine::{run, ReferenceInput, RunInput, RunOptions, RunOutput};
use eancheck_recon::grid::{collect_column, column_letters, parse_column};
use eancheck_recon::RunConfig;

use crate::{emit_events, CliError};

/// Everything loaded from disk for one run.
struct Loaded {
    grid: SheetGrid,
    input: RunInput,
    options: RunOptions,
    status_col: u32,
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    strict_labels: bool,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", config_path.display())))?;
    let config = RunConfig::from_toml(&config_str)?;

    // Resolve file paths relative to the run file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut loaded = load(&config, base_dir)?;
    loaded.options.strict_label_count |= strict_labels;

    let output = match run(&loaded.input, &loaded.options) {
        Ok(output) => output,
        Err(failure) => {
            emit_events(&failure.events);
            return Err(failure.error.into());
        }
    };
    emit_events(&output.events);

    if let Some(ref path) = output_file {
        write_output(path, &loaded, &output)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::new(crate::exit_codes::EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    for m in &output.mapping.mapped {
        eprintln!("  {} -> {} ({})", m.source, m.label, m.method);
    }
    for source in &output.mapping.unmapped {
        eprintln!("  {} -> (ignored)", source);
    }
    let s = &output.summary;
    eprintln!(
        "{} row(s): {} matched, {} '{}'",
        s.total_rows, s.matched_rows, s.fallback_rows, output.fallback_label,
    );

    Ok(())
}

fn load(config: &RunConfig, base_dir: &Path) -> Result<Loaded, CliError> {
    let ean_col = config.ean_column()?;
    let status_col = config.status_column()?;
    let bounds = config.bounds;

    let main_path = base_dir.join(&config.main.file);
    let grid = open_main_grid(&main_path, &SheetSelector::from(config.main.sheet.as_str()))?;
    let main = collect_column(&grid, ean_col, config.main.start_row, &bounds);
    tracing::info!(
        "main sheet '{}': {} valid identifier(s) in column {}",
        grid.sheet_name(),
        main.len(),
        column_letters(ean_col)
    );

    let candidate_labels = candidate_labels(&main_path, &grid, status_col, config.main.start_row)?;

    let mut input = RunInput {
        main,
        candidate_labels,
        references: Vec::with_capacity(config.references.len()),
    };
    let mut options = RunOptions {
        fallback_label: config.labels.fallback.clone(),
        expected_label_count: config.labels.expected_count,
        strict_label_count: config.labels.strict,
        ..Default::default()
    };

    for (i, reference) in config.references.iter().enumerate() {
        let path = base_dir.join(&reference.file);
        let reference_options = ReferenceOptions {
            column: reference.column.as_deref().and_then(parse_column),
            sheet: reference.sheet.as_deref().map(SheetSelector::from),
            start_row: reference.start_row,
            bounds,
        };
        let loaded = load_reference(&path, &reference_options)?;

        if let Some(label) = &reference.label {
            options.manual_mappings.insert(loaded.name.clone(), label.clone());
        }
        input.references.push(ReferenceInput {
            name: loaded.name,
            priority: config.priority_of(i),
            members: loaded.members,
        });
    }

    Ok(Loaded { grid, input, options, status_col })
}

/// List-validation labels, or the distinct values of the status column when
/// the workbook has no list validation there.
fn candidate_labels(
    path: &Path,
    grid: &SheetGrid,
    status_col: u32,
    start_row: u32,
) -> Result<Vec<String>, CliError> {
    if xlsx_validation::supports(path) {
        let labels = xlsx_validation::list_labels(path, grid.sheet_name(), status_col)?;
        if !labels.is_empty() {
            return Ok(labels);
        }
    }

    let observed = xlsx_validation::observed_labels(grid, status_col, start_row);
    if !observed.is_empty() {
        tracing::warn!(
            "no list validation on column {}; using {} value(s) found in the column",
            column_letters(status_col),
            observed.len()
        );
    }
    Ok(observed)
}

fn write_output(path: &Path, loaded: &Loaded, output: &RunOutput) -> Result<(), CliError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" => writer::write_annotated_xlsx(
            path,
            loaded.grid.sheet_name(),
            &loaded.grid,
            loaded.status_col,
            &output.assignment,
        )?,
        "csv" => writer::write_assignment_csv(path, &output.assignment)?,
        "json" => {
            let json_str = serde_json::to_string_pretty(output)
                .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
            std::fs::write(path, json_str)
                .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        }
        _ => {
            return Err(CliError::usage(format!("unsupported output file: {}", path.display()))
                .with_hint("use .xlsx, .csv or .json"))
        }
    }
    Ok(())
}
