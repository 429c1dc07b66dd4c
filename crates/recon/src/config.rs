use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::grid::parse_column;
use crate::identifier::IdentifierBounds;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation run, as described by a `.toml` run file.
///
/// File paths are stored as written; callers resolve them relative to the
/// run file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub main: MainConfig,
    #[serde(default)]
    pub bounds: IdentifierBounds,
    pub references: Vec<ReferenceConfig>,
    #[serde(default)]
    pub labels: LabelConfig,
}

// ---------------------------------------------------------------------------
// Main source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    pub file: String,
    /// Worksheet index (0-based digits) or name.
    #[serde(default = "default_sheet")]
    pub sheet: String,
    pub ean_column: String,
    pub status_column: String,
    #[serde(default = "default_main_start_row")]
    pub start_row: u32,
}

fn default_sheet() -> String {
    "0".into()
}

fn default_main_start_row() -> u32 {
    2
}

// ---------------------------------------------------------------------------
// Reference sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub file: String,
    /// Defaults to the source's position in the list (1-based).
    #[serde(default)]
    pub priority: Option<u32>,
    /// Column to read from grid sources; every cell is scanned when absent.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default = "default_reference_start_row")]
    pub start_row: u32,
    /// Manual label; bypasses name matching for this source.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_reference_start_row() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelConfig {
    #[serde(default)]
    pub expected_count: Option<usize>,
    /// Treat an expected-count disagreement as fatal.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub fallback: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.bounds.min_digits == 0 {
            return Err(ReconError::ConfigValidation("bounds.min_digits must be at least 1".into()));
        }
        if self.bounds.min_digits > self.bounds.max_digits {
            return Err(ReconError::ConfigValidation(format!(
                "bounds.min_digits ({}) exceeds bounds.max_digits ({})",
                self.bounds.min_digits, self.bounds.max_digits
            )));
        }

        if self.main.start_row == 0 {
            return Err(ReconError::ConfigValidation("main.start_row is 1-based".into()));
        }
        self.ean_column()?;
        self.status_column()?;

        if self.references.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one [[references]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, reference) in self.references.iter().enumerate() {
            if reference.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("references[{i}]: file is empty")));
            }
            if !seen.insert(reference.file.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "references[{i}]: duplicate file '{}'",
                    reference.file
                )));
            }
            if let Some(col) = &reference.column {
                parse_column(col).ok_or_else(|| {
                    ReconError::ConfigValidation(format!("references[{i}]: bad column '{col}'"))
                })?;
            }
            if reference.start_row == 0 {
                return Err(ReconError::ConfigValidation(format!(
                    "references[{i}]: start_row is 1-based"
                )));
            }
        }

        Ok(())
    }

    pub fn ean_column(&self) -> Result<u32, ReconError> {
        column_field("main.ean_column", &self.main.ean_column)
    }

    pub fn status_column(&self) -> Result<u32, ReconError> {
        column_field("main.status_column", &self.main.status_column)
    }

    /// Effective priority of the reference at `index`.
    pub fn priority_of(&self, index: usize) -> u32 {
        self.references
            .get(index)
            .and_then(|r| r.priority)
            .unwrap_or(index as u32 + 1)
    }
}

fn column_field(field: &str, value: &str) -> Result<u32, ReconError> {
    parse_column(value)
        .ok_or_else(|| ReconError::ConfigValidation(format!("{field}: bad column '{value}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
