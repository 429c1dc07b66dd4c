// Excel import (xlsx, xls, xlsb, ods) into read-only cell grids

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use eancheck_recon::grid::{CellGrid, CellValue};

use crate::error::{IoError, Result};

// ============================================================================
// Sheet selection
// ============================================================================

/// Which worksheet to read: 0-based position or exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl From<&str> for SheetSelector {
    /// All-digit strings select by position, anything else by name.
    fn from(s: &str) -> Self {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(i) = s.parse() {
                return SheetSelector::Index(i);
            }
        }
        SheetSelector::Name(s.to_string())
    }
}

impl FromStr for SheetSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(SheetSelector::from(s))
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "#{}", i),
            SheetSelector::Name(n) => write!(f, "'{}'", n),
        }
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Sparse snapshot of one worksheet. Rows and columns are 1-based.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    name: String,
    cells: HashMap<(u32, u32), CellValue>,
    last_row: u32,
    last_col: u32,
}

impl SheetGrid {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        self.last_row = self.last_row.max(row);
        self.last_col = self.last_col.max(col);
        self.cells.insert((row, col), value);
    }

    pub fn set_text(&mut self, row: u32, col: u32, text: impl Into<String>) {
        self.set(row, col, CellValue::Text(text.into()));
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl CellGrid for SheetGrid {
    fn value(&self, row: u32, col: u32) -> Option<CellValue> {
        self.cells.get(&(row, col)).cloned()
    }

    fn last_row(&self) -> u32 {
        self.last_row
    }

    fn last_col(&self) -> u32 {
        self.last_col
    }
}

// ============================================================================
// Import
// ============================================================================

fn open_workbook(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>> {
    open_workbook_auto(path).map_err(|e| IoError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    Ok(open_workbook(path)?.sheet_names().to_vec())
}

/// Formula of a workbook-level defined name (e.g. `Lists!$A$1:$A$3`).
pub fn defined_name(path: &Path, name: &str) -> Result<Option<String>> {
    let workbook = open_workbook(path)?;
    Ok(workbook
        .defined_names()
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, formula)| formula.clone()))
}

/// Load one worksheet.
pub fn open_grid(path: &Path, selector: &SheetSelector) -> Result<SheetGrid> {
    let mut workbook = open_workbook(path)?;
    let names = workbook.sheet_names().to_vec();

    let name = match selector {
        SheetSelector::Index(i) => names.get(*i).cloned(),
        SheetSelector::Name(n) => names.iter().find(|s| *s == n).cloned(),
    }
    .ok_or_else(|| IoError::SheetNotFound {
        path: path.to_path_buf(),
        selector: selector.to_string(),
    })?;

    read_sheet(&mut workbook, path, &name)
}

/// Load every worksheet in workbook order.
pub fn open_all_grids(path: &Path) -> Result<Vec<SheetGrid>> {
    let mut workbook = open_workbook(path)?;
    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(IoError::Workbook {
            path: path.to_path_buf(),
            message: "workbook contains no sheets".into(),
        });
    }

    names
        .iter()
        .map(|name| read_sheet(&mut workbook, path, name))
        .collect()
}

fn read_sheet(
    workbook: &mut Sheets<std::io::BufReader<std::fs::File>>,
    path: &Path,
    name: &str,
) -> Result<SheetGrid> {
    let range = workbook.worksheet_range(name).map_err(|e| IoError::Workbook {
        path: path.to_path_buf(),
        message: format!("failed to read sheet '{}': {}", name, e),
    })?;

    let grid = grid_from_range(name, &range);
    tracing::debug!(
        file = %path.display(),
        sheet = name,
        rows = grid.last_row,
        cells = grid.cell_count(),
        "sheet loaded"
    );
    Ok(grid)
}

/// Convert a calamine range into a grid. The range may start below A1.
fn grid_from_range(name: &str, range: &Range<Data>) -> SheetGrid {
    let mut grid = SheetGrid::empty(name);
    let (row0, col0) = range.start().unwrap_or((0, 0));

    for (r, c, data) in range.used_cells() {
        if let Some(value) = convert(data) {
            grid.set(row0 + r as u32 + 1, col0 + c as u32 + 1, value);
        }
    }
    grid
}

fn convert(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Text(if *b { "TRUE" } else { "FALSE" }.into())),
        // Dates stay serial numbers; they are never identifiers anyway
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}
