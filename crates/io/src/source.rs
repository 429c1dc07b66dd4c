//! Reference source loading: dispatch by file type, return identifier members.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use eancheck_recon::extract::Extractor;
use eancheck_recon::grid::collect_members;
use eancheck_recon::identifier::IdentifierBounds;

use crate::error::{IoError, Result};
use crate::xlsx::{SheetGrid, SheetSelector};
use crate::{csv, document, xlsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Spreadsheet or delimited text; cells are scanned.
    Grid,
    /// Free text; identifiers are extracted.
    Document,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Grid => write!(f, "grid"),
            SourceKind::Document => write!(f, "document"),
        }
    }
}

/// How to read a reference source.
#[derive(Debug, Clone, Default)]
pub struct ReferenceOptions {
    /// Column to scan; every column when `None`. Ignored for documents.
    pub column: Option<u32>,
    /// Sheet to scan; every sheet when `None`.
    pub sheet: Option<SheetSelector>,
    pub start_row: u32,
    pub bounds: IdentifierBounds,
}

#[derive(Debug, Clone)]
pub struct LoadedReference {
    pub name: String,
    pub kind: SourceKind,
    pub members: BTreeSet<String>,
}

/// Classify a path by extension.
pub fn source_kind(path: &Path) -> Result<SourceKind> {
    match extension(path).as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" | "csv" | "tsv" => Ok(SourceKind::Grid),
        "docx" | "docm" | "txt" | "text" => Ok(SourceKind::Document),
        _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Display name of a source: the file name without extension.
pub fn source_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Open the primary sheet of a workbook or delimited file.
pub fn open_main_grid(path: &Path, sheet: &SheetSelector) -> Result<SheetGrid> {
    if is_delimited(path) {
        csv::open_grid(path)
    } else {
        xlsx::open_grid(path, sheet)
    }
}

/// Load the valid identifiers of one reference source.
pub fn load_reference(path: &Path, options: &ReferenceOptions) -> Result<LoadedReference> {
    let kind = source_kind(path)?;
    let start_row = options.start_row.max(1);

    let members = match kind {
        SourceKind::Grid => {
            let grids = if is_delimited(path) {
                vec![csv::open_grid(path)?]
            } else {
                match &options.sheet {
                    Some(sel) => vec![xlsx::open_grid(path, sel)?],
                    None => xlsx::open_all_grids(path)?,
                }
            };
            grids
                .iter()
                .flat_map(|g| collect_members(g, options.column, start_row, &options.bounds))
                .collect()
        }
        SourceKind::Document => {
            let extractor = Extractor::new(options.bounds)?;
            let fragments = document::read_fragments(path)?;
            extractor
                .extract_fragments(&fragments)
                .into_iter()
                .map(|info| info.ean)
                .collect()
        }
    };

    let loaded = LoadedReference {
        name: source_name_from_path(path),
        kind,
        members,
    };
    tracing::debug!(
        source = %loaded.name,
        kind = %loaded.kind,
        members = loaded.members.len(),
        "reference loaded"
    );
    Ok(loaded)
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_delimited(path: &Path) -> bool {
    matches!(extension(path).as_str(), "csv" | "tsv")
}
