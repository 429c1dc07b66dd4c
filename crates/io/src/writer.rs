// Report export: annotated workbook, assignment CSV, comparison CSV

use std::path::Path;

use eancheck_recon::classify::{ClassificationSummary, RowAssignment};
use eancheck_recon::compare::ComparisonResult;
use eancheck_recon::grid::{CellGrid, CellValue};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{IoError, Result};

const SUMMARY_SHEET: &str = "Summary";

/// Write a copy of the main sheet with each classified row's label in `status_col`,
/// followed by a summary sheet of label counts.
///
/// Cell values are copied; formatting and formulas of the original are not.
pub fn write_annotated_xlsx<G: CellGrid + ?Sized>(
    path: &Path,
    sheet_name: &str,
    grid: &G,
    status_col: u32,
    assignment: &RowAssignment,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for row in 1..=grid.last_row() {
        for col in 1..=grid.last_col() {
            if col == status_col && assignment.get(row).is_some() {
                continue;
            }
            match grid.value(row, col) {
                Some(CellValue::Text(s)) => {
                    sheet.write_string(row - 1, xlsx_col(col)?, &s)?;
                }
                Some(CellValue::Number(n)) => {
                    sheet.write_number(row - 1, xlsx_col(col)?, n)?;
                }
                None => {}
            }
        }
    }
    for (row, a) in assignment.iter() {
        sheet.write_string(row - 1, xlsx_col(status_col)?, &a.label)?;
    }

    let summary = ClassificationSummary::from_assignment(assignment);
    let ws = workbook.add_worksheet();
    ws.set_name(SUMMARY_SHEET)?;
    ws.write_string_with_format(0, 0, "Label", &bold)?;
    ws.write_string_with_format(0, 1, "Rows", &bold)?;
    let mut r = 1u32;
    for (label, count) in &summary.label_counts {
        ws.write_string(r, 0, label)?;
        ws.write_number(r, 1, *count as f64)?;
        r += 1;
    }
    ws.write_string_with_format(r + 1, 0, "Matched", &bold)?;
    ws.write_number(r + 1, 1, summary.matched_rows as f64)?;
    ws.write_string_with_format(r + 2, 0, "Fallback", &bold)?;
    ws.write_number(r + 2, 1, summary.fallback_rows as f64)?;
    ws.set_column_width(0, 32)?;

    workbook.save(path)?;
    tracing::debug!(file = %path.display(), rows = assignment.len(), "annotated workbook written");
    Ok(())
}

/// One line per classified row: row, identifier, label, source.
pub fn write_assignment_csv(path: &Path, assignment: &RowAssignment) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(["row", "identifier", "label", "source"])?;
    for (row, a) in assignment.iter() {
        writer.write_record([
            row.to_string().as_str(),
            a.identifier.as_str(),
            a.label.as_str(),
            a.source.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// One line per divergent row: row, kind, left value, right value.
pub fn write_comparison_csv(path: &Path, result: &ComparisonResult) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(["row", "kind", "left", "right"])?;
    for d in &result.divergences {
        writer.write_record([
            d.row.to_string().as_str(),
            d.kind.as_str(),
            d.side1.as_deref().unwrap_or(""),
            d.side2.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// rust_xlsxwriter columns are 0-based u16
fn xlsx_col(col: u32) -> Result<u16> {
    u16::try_from(col - 1).map_err(|_| IoError::UnsupportedFormat(format!("column {} out of range", col)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::{open_grid, SheetGrid, SheetSelector};
    use eancheck_recon::classify::{classify, ReferenceSet};
    use eancheck_recon::compare::compare;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn sample() -> (SheetGrid, RowAssignment) {
        let mut grid = SheetGrid::empty("Orders");
        grid.set_text(1, 1, "EAN");
        grid.set_text(1, 2, "Status");
        grid.set(2, 1, CellValue::Number(12345678.0));
        grid.set_text(2, 2, "stale");
        grid.set_text(3, 1, "87654321");

        let main: BTreeMap<u32, String> =
            [(2, "12345678".to_string()), (3, "87654321".to_string())].into_iter().collect();
        let sets = vec![ReferenceSet::new("Vendor A", 1, "Received", ["12345678"])];
        (grid, classify(&main, &sets, "Missing"))
    }

    #[test]
    fn annotated_copy_carries_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let (grid, assignment) = sample();

        write_annotated_xlsx(&path, "Orders", &grid, 2, &assignment).unwrap();

        let back = open_grid(&path, &SheetSelector::Name("Orders".into())).unwrap();
        assert_eq!(back.value(1, 2), Some(CellValue::Text("Status".into())));
        assert_eq!(back.value(2, 1), Some(CellValue::Number(12345678.0)));
        assert_eq!(back.value(2, 2), Some(CellValue::Text("Received".into())));
        assert_eq!(back.value(3, 2), Some(CellValue::Text("Missing".into())));

        let summary = open_grid(&path, &SheetSelector::Name(SUMMARY_SHEET.into())).unwrap();
        assert_eq!(summary.value(2, 1), Some(CellValue::Text("Missing".into())));
        assert_eq!(summary.value(2, 2), Some(CellValue::Number(1.0)));
    }

    #[test]
    fn assignment_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let (_, assignment) = sample();

        write_assignment_csv(&path, &assignment).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "row,identifier,label,source\n2,12345678,Received,Vendor A\n3,87654321,Missing,\n"
        );
    }

    #[test]
    fn comparison_csv_lists_divergences() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.csv");
        let left: BTreeMap<u32, String> = [(2, "A".to_string()), (3, "B".to_string())].into_iter().collect();
        let right: BTreeMap<u32, String> = [(2, "\"A\"".to_string()), (4, "C".to_string())].into_iter().collect();

        write_comparison_csv(&path, &compare(&left, &right)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "row,kind,left,right\n3,missing_in_side2,B,\n4,missing_in_side1,,C\n");
    }
}
