//! `eancheck-recon` — identifier reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded identifiers and labels, returns
//! row assignments, comparisons and the events emitted along the way.
//! No CLI or IO dependencies.

pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod grid;
pub mod identifier;
pub mod mapper;

pub use classify::{classify, ReferenceSet, RowAssignment};
pub use compare::{compare, ComparisonResult};
pub use config::RunConfig;
pub use engine::{run, ReferenceInput, RunFailure, RunInput, RunOptions, RunOutput};
pub use error::ReconError;
pub use events::{EventLevel, RunEvent};
pub use extract::{extract, EanInfo, Extractor};
pub use grid::{CellGrid, CellValue};
pub use identifier::{is_valid, normalize, IdentifierBounds};
pub use mapper::map_sources_to_labels;
