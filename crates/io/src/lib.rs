// File I/O: cell grids, validation lists, documents, reports

pub mod csv;
pub mod document;
pub mod error;
pub mod source;
pub mod writer;
pub mod xlsx;
pub mod xlsx_validation;
mod xml;

pub use error::IoError;
pub use source::{load_reference, source_name_from_path, LoadedReference, ReferenceOptions, SourceKind};
pub use xlsx::{SheetGrid, SheetSelector};
