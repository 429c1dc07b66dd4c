//! Single-step commands: `labels`, `extract`, `map`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use eancheck_io::source::open_main_grid;
use eancheck_io::{document, xlsx_validation, SheetSelector};
use eancheck_recon::extract::Extractor;
use eancheck_recon::identifier::IdentifierBounds;
use eancheck_recon::mapper::{map_with_fallback, reserve_no_match_label};
use serde_json::json;

use crate::exit_codes::{EXIT_EMPTY_LABELS, EXIT_ERROR, EXIT_NO_IDENTIFIERS, EXIT_UNRESOLVED_MAPPING};
use crate::{parse_column_arg, CliError};

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))
}

// ============================================================================
// labels
// ============================================================================

pub fn cmd_labels(workbook: PathBuf, column: String, sheet: String, start_row: u32) -> Result<(), CliError> {
    let col = parse_column_arg("--column", &column)?;
    let grid = open_main_grid(&workbook, &SheetSelector::from(sheet.as_str()))?;

    let mut origin = "list validation";
    let mut labels = if xlsx_validation::supports(&workbook) {
        xlsx_validation::list_labels(&workbook, grid.sheet_name(), col)?
    } else {
        Vec::new()
    };
    if labels.is_empty() {
        origin = "column values";
        labels = xlsx_validation::observed_labels(&grid, col, start_row.max(1));
    }

    if labels.is_empty() {
        return Err(CliError::new(
            EXIT_EMPTY_LABELS,
            format!("no candidate labels for column {} of '{}'", column, grid.sheet_name()),
        ));
    }

    for label in &labels {
        println!("{label}");
    }
    eprintln!("{} label(s) from {}", labels.len(), origin);
    Ok(())
}

// ============================================================================
// extract
// ============================================================================

pub fn cmd_extract(
    file: PathBuf,
    min_digits: usize,
    max_digits: usize,
    allow_non_numeric: bool,
    json_output: bool,
) -> Result<(), CliError> {
    let bounds = IdentifierBounds::new(min_digits, max_digits, allow_non_numeric);
    let extractor = Extractor::new(bounds)
        .map_err(|e| CliError::usage(e.to_string()).with_hint("--min-digits must be 1..=--max-digits"))?;

    let fragments = document::read_fragments(&file)?;
    let found = extractor.extract_fragments(&fragments);

    if json_output {
        println!("{}", to_json(&found)?);
    } else {
        for info in &found {
            println!("{}\t{}", info.ean, info.context);
        }
    }

    if found.is_empty() {
        return Err(CliError::new(
            EXIT_NO_IDENTIFIERS,
            format!("no identifiers found in {}", file.display()),
        ));
    }
    eprintln!("{} identifier(s) in {} fragment(s)", found.len(), fragments.len());
    Ok(())
}

// ============================================================================
// map
// ============================================================================

pub fn cmd_map(sources: Vec<String>, labels: Vec<String>, json_output: bool) -> Result<(), CliError> {
    let manual = BTreeMap::new();
    let reserved = reserve_no_match_label(&labels, &manual);
    let (outcome, fallback) = map_with_fallback(&sources, &labels, &manual, reserved.as_deref());

    if json_output {
        let value = json!({
            "mapped": outcome.mapped,
            "unmapped": outcome.unmapped,
            "fallback_label": fallback,
        });
        println!("{}", to_json(&value)?);
    } else {
        for m in &outcome.mapped {
            println!("{}\t{}\t{}", m.source, m.label, m.method);
        }
        for source in &outcome.unmapped {
            println!("{}\t-\tunmapped", source);
        }
        match &fallback {
            Some(label) => eprintln!("fallback label: {label}"),
            None => eprintln!("fallback label: none"),
        }
    }

    if fallback.is_none() {
        return Err(CliError::new(EXIT_UNRESOLVED_MAPPING, "no fallback label could be determined")
            .with_hint("a run needs one unclaimed label (e.g. 'Missing') or labels.fallback"));
    }
    Ok(())
}
