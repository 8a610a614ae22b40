use std::path::PathBuf;
use thiserror::Error;

/// Failures of the ingestion pipeline and the dataset store.
///
/// Validation problems in an upload are not errors: they are reported as a
/// list of [`Defect`](super::validator::Defect)s so that every problem reaches
/// the operator at once.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required columns: {}", .0.join(", "))]
    Schema(Vec<String>),

    #[error("Could not parse {field}: {message}")]
    Parse { field: String, message: String },

    #[error("Unsupported file format '{0}'. Upload a .csv or spreadsheet (.xlsx, .xls, .xlsm, .ods) file")]
    UnsupportedFormat(String),

    #[error("Uploaded file contains no data rows")]
    EmptyUpload,

    #[error("Dataset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Dataset file {} is corrupt: {message}", path.display())]
    Corruption { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
