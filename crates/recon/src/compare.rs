// Row-wise comparison of two label snapshots.
// Pure functions: two row→value maps in, counts and divergences out.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    Mismatch,
    MissingInSide1,
    MissingInSide2,
}

impl DivergenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenceKind::Mismatch => "mismatch",
            DivergenceKind::MissingInSide1 => "missing_in_side1",
            DivergenceKind::MissingInSide2 => "missing_in_side2",
        }
    }
}

/// One row where the sides disagree. `None` means the row is absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDivergence {
    pub row: u32,
    pub kind: DivergenceKind,
    pub side1: Option<String>,
    pub side2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub rows_compared: usize,
    pub matching: usize,
    pub mismatching: usize,
    pub missing_in_side1: usize,
    pub missing_in_side2: usize,
    pub divergences: Vec<RowDivergence>,
}

impl ComparisonResult {
    pub fn is_identical(&self) -> bool {
        self.mismatching == 0 && self.missing_in_side1 == 0 && self.missing_in_side2 == 0
    }
}

// ---------------------------------------------------------------------------
// Value normalization
// ---------------------------------------------------------------------------

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Trim, peel every layer of surrounding quotes, trim again.
pub fn normalize_compare_value(raw: &str) -> String {
    raw.trim().trim_matches(is_quote).trim().to_string()
}

fn values_equal(a: &str, b: &str) -> bool {
    normalize_compare_value(a).to_lowercase() == normalize_compare_value(b).to_lowercase()
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

pub fn compare(side1: &BTreeMap<u32, String>, side2: &BTreeMap<u32, String>) -> ComparisonResult {
    let rows: BTreeSet<u32> = side1.keys().chain(side2.keys()).copied().collect();
    let mut result = ComparisonResult {
        rows_compared: rows.len(),
        ..Default::default()
    };

    for row in rows {
        let (left, right) = (side1.get(&row), side2.get(&row));
        let kind = match (left, right) {
            (Some(l), Some(r)) if values_equal(l, r) => {
                result.matching += 1;
                continue;
            }
            (Some(_), Some(_)) => {
                result.mismatching += 1;
                DivergenceKind::Mismatch
            }
            (Some(_), None) => {
                result.missing_in_side2 += 1;
                DivergenceKind::MissingInSide2
            }
            (None, Some(_)) => {
                result.missing_in_side1 += 1;
                DivergenceKind::MissingInSide1
            }
            (None, None) => continue,
        };
        result.divergences.push(RowDivergence {
            row,
            kind,
            side1: left.cloned(),
            side2: right.cloned(),
        });
    }

    result
}
