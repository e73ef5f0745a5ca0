// Error types for the per-diem pipeline
// Load failures are fatal to data availability, never to the process.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to produce the canonical table.
///
/// Callers recover by serving an empty table (see `loader::load_or_empty`).
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited text itself is malformed (bad quoting, ragged rows).
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file does not have the fixed eight-column layout.
    #[error("Expected {expected} columns but line {line} has {found}")]
    ColumnCount {
        expected: usize,
        found: usize,
        line: u64,
    },

    /// The file has no header row at all.
    #[error("File {0} is empty")]
    Empty(PathBuf),
}

/// A single field that could not be coerced to its canonical type.
///
/// Never fatal: the loader substitutes a safe default and keeps the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldCoercionError {
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Negative amount: {0:?}")]
    NegativeAmount(String),

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),
}

/// Invalid filter input at the presentation boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Month {0} is outside 1..=12")]
    MonthOutOfRange(u32),

    #[error("Month range start {min} is after end {max}")]
    InvertedRange { min: u32, max: u32 },
}

/// Convenience alias for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;
