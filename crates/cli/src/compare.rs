//! `eancheck compare` — row-by-row comparison of two label columns.

use std::path::PathBuf;

use eancheck_io::source::open_main_grid;
use eancheck_io::{writer, SheetSelector};
use eancheck_recon::compare::compare;
use eancheck_recon::grid::collect_raw_column;

use crate::exit_codes::{EXIT_COMPARE_DIFFS, EXIT_ERROR};
use crate::{parse_column_arg, CliError};

#[allow(clippy::too_many_arguments)]
pub fn cmd_compare(
    left: PathBuf,
    right: PathBuf,
    column: String,
    sheet: String,
    right_sheet: Option<String>,
    start_row: u32,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let col = parse_column_arg("--column", &column)?;
    if start_row == 0 {
        return Err(CliError::usage("--start-row is 1-based"));
    }

    let left_selector = SheetSelector::from(sheet.as_str());
    let right_selector = right_sheet
        .as_deref()
        .map(SheetSelector::from)
        .unwrap_or_else(|| left_selector.clone());

    let left_grid = open_main_grid(&left, &left_selector)?;
    let right_grid = open_main_grid(&right, &right_selector)?;

    let side1 = collect_raw_column(&left_grid, col, start_row);
    let side2 = collect_raw_column(&right_grid, col, start_row);
    tracing::info!("comparing {} row(s) against {} row(s)", side1.len(), side2.len());

    let result = compare(&side1, &side2);

    if let Some(ref path) = output_file {
        writer::write_comparison_csv(path, &result)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for d in &result.divergences {
            println!(
                "{}\t{}\t{}\t{}",
                d.row,
                d.kind.as_str(),
                d.side1.as_deref().unwrap_or("-"),
                d.side2.as_deref().unwrap_or("-"),
            );
        }
    }

    eprintln!(
        "{} row(s) compared: {} matching, {} mismatching, {} missing left, {} missing right",
        result.rows_compared,
        result.matching,
        result.mismatching,
        result.missing_in_side1,
        result.missing_in_side2,
    );

    if result.is_identical() {
        Ok(())
    } else {
        Err(CliError::silent(EXIT_COMPARE_DIFFS))
    }
}
