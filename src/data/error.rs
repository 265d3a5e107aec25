//! Error taxonomy for loading and querying tabular datasets.
use std::path::PathBuf;

use thiserror::Error;

use super::schema::ColumnKind;

/// Convenience alias used throughout the data layer.
pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    /// The input source does not exist. Callers are expected to recover
    /// from this by showing a "no data" state.
    #[error("input file '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field did not conform to its column's declared kind.
    #[error("row {row}, column '{column}': cannot parse '{value}' ({reason})")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// The schema names a column the source does not provide.
    #[error("source is missing column '{0}'")]
    MissingColumn(String),

    /// A query referenced a column that is not part of the schema.
    #[error("column '{0}' is not part of the schema")]
    UnknownColumn(String),

    #[error("column '{column}' is {actual}, expected {expected}")]
    WrongColumnKind {
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },

    #[error("schema has no date column")]
    NoDateColumn,

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// min/max requested over a dataset with zero records.
    #[error("dataset is empty, column '{column}' has no range")]
    EmptyDataset { column: String },

    /// mean requested over zero records.
    #[error("cannot take the mean of '{column}' over zero records")]
    EmptyAggregation { column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl DataError {
    /// Whether this error means the input source is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }

    /// Map an I/O error on `path`, turning `ErrorKind::NotFound` into
    /// [`DataError::NotFound`].
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            DataError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DataError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
