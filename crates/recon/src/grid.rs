//! Cell-grid abstraction the engine reads identifiers from.
//!
//! Readers for concrete formats live in `eancheck-io`; the engine only
//! needs typed cell values addressed by 1-based row and column.

use std::collections::{BTreeMap, BTreeSet};

use crate::identifier::{normalize_valid, render_number, IdentifierBounds};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Text form; numbers are rendered without exponent or trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => render_number(*n),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }
}

/// Read-only view of one worksheet. Rows and columns are 1-based.
pub trait CellGrid {
    /// Value at (row, col), `None` when the cell is empty.
    fn value(&self, row: u32, col: u32) -> Option<CellValue>;

    /// Last row holding any value (0 for an empty grid).
    fn last_row(&self) -> u32;

    /// Last column holding any value (0 for an empty grid).
    fn last_col(&self) -> u32;

    fn has_value(&self, row: u32, col: u32) -> bool {
        self.value(row, col).is_some()
    }
}

/// Parse a column reference: letters (`"F"`, `"aa"`) or a 1-based number (`"6"`).
pub fn parse_column(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<u32>().ok().filter(|&c| c > 0);
    }
    let mut col: u32 = 0;
    for c in s.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

/// Column letters for a 1-based index (1 → "A", 27 → "AA").
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Valid identifiers of one column, keyed by row. Invalid cells are skipped.
pub fn collect_column<G: CellGrid + ?Sized>(
    grid: &G,
    col: u32,
    start_row: u32,
    bounds: &IdentifierBounds,
) -> BTreeMap<u32, String> {
    (start_row.max(1)..=grid.last_row())
        .filter_map(|row| {
            let value = grid.value(row, col)?;
            normalize_valid(&value.as_text(), bounds).map(|id| (row, id))
        })
        .collect()
}

/// Valid identifiers of a reference grid: one column, or every cell when `col` is `None`.
pub fn collect_members<G: CellGrid + ?Sized>(
    grid: &G,
    col: Option<u32>,
    start_row: u32,
    bounds: &IdentifierBounds,
) -> BTreeSet<String> {
    match col {
        Some(c) => collect_column(grid, c, start_row, bounds).into_values().collect(),
        None => (1..=grid.last_col())
            .flat_map(|c| collect_column(grid, c, start_row, bounds).into_values())
            .collect(),
    }
}

/// Raw text of the non-empty cells of one column, keyed by row.
pub fn collect_raw_column<G: CellGrid + ?Sized>(
    grid: &G,
    col: u32,
    start_row: u32,
) -> BTreeMap<u32, String> {
    (start_row.max(1)..=grid.last_row())
        .filter_map(|row| {
            let text = grid.value(row, col)?.as_text();
            (!text.trim().is_empty()).then_some((row, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapGrid(HashMap<(u32, u32), CellValue>);

    impl CellGrid for MapGrid {
        fn value(&self, row: u32, col: u32) -> Option<CellValue> {
            self.0.get(&(row, col)).cloned()
        }
        fn last_row(&self) -> u32 {
            self.0.keys().map(|k| k.0).max().unwrap_or(0)
        }
        fn last_col(&self) -> u32 {
            self.0.keys().map(|k| k.1).max().unwrap_or(0)
        }
    }

    fn grid() -> MapGrid {
        let mut cells = HashMap::new();
        cells.insert((1, 2), CellValue::Text("EAN".into()));
        cells.insert((2, 2), CellValue::Number(4012345678901.0));
        cells.insert((3, 2), CellValue::Text(" 0012-3456-7890 ".into()));
        cells.insert((4, 2), CellValue::Text("n/a".into()));
        cells.insert((5, 2), CellValue::Text("  ".into()));
        cells.insert((5, 3), CellValue::Text("98765432".into()));
        MapGrid(cells)
    }

    #[test]
    fn parse_column_letters_and_numbers() {
        assert_eq!(parse_column("A"), Some(1));
        assert_eq!(parse_column("f"), Some(6));
        assert_eq!(parse_column("AA"), Some(27));
        assert_eq!(parse_column("6"), Some(6));
        assert_eq!(parse_column("0"), None);
        assert_eq!(parse_column("A1"), None);
        assert_eq!(parse_column(""), None);
        assert_eq!(column_letters(28), "AB");
    }

    #[test]
    fn collect_column_skips_header_and_invalid() {
        let ids = collect_column(&grid(), 2, 2, &IdentifierBounds::default());
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get(&2).map(String::as_str), Some("4012345678901"));
        assert_eq!(ids.get(&3).map(String::as_str), Some("001234567890"));
    }

    #[test]
    fn collect_members_scans_every_column() {
        let members = collect_members(&grid(), None, 1, &IdentifierBounds::default());
        assert!(members.contains("98765432"));
        assert!(members.contains("4012345678901"));
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn raw_column_keeps_text_as_is() {
        let raw = collect_raw_column(&grid(), 2, 1);
        assert_eq!(raw.get(&4).map(String::as_str), Some("n/a"));
        assert!(!raw.contains_key(&5));
    }
}
