use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook '{path}': {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("sheet {selector} not found in '{path}'")]
    SheetNotFound { path: PathBuf, selector: String },

    #[error("'{path}' is not a valid container: {message}")]
    Container { path: PathBuf, message: String },

    #[error("XML parse error in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Recon(#[from] eancheck_recon::ReconError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IoError>;
