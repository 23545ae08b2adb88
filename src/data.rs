//! data — loading observation series from delimited files.
//!
//! Purpose
//! -------
//! Turn a header-less, comma-delimited table of per-region daily counts into
//! the scalar observation window consumed by
//! [`ObservationSeries::from_scalars`](crate::assimilation::ObservationSeries::from_scalars).
//!
//! Key behaviors
//! -------------
//! - Rows whose region column differs from [`SeriesSpec::region`] are skipped.
//! - The value column is parsed as `f64` and, when `accumulate` is set,
//!   turned into a running total (daily counts → cumulative counts).
//! - Only the last `window` values are returned.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rows may have different lengths; a matching row that is too short for
//!   the value column is an error, not skipped.
//! - Surrounding whitespace (including stray `\r`) is trimmed from fields.
use csv::{ReaderBuilder, Trim};
use ndarray::Array1;
use std::{fs::File, path::Path};

/// Result alias for data loading.
pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug)]
pub enum DataError {
    // ---- I/O ----
    /// The file could not be opened or read.
    Io(std::io::Error),

    /// The CSV reader rejected a record.
    Csv(csv::Error),

    // ---- Content ----
    /// A matching row has no field at the value column.
    MissingColumn { row: usize, column: usize },

    /// The value field of a matching row is not a finite number.
    Parse { row: usize, value: String },

    /// Fewer matching rows than the requested window.
    TooFewRows { found: usize, window: usize },

    // ---- Configuration ----
    /// A window of zero values was requested.
    InvalidWindow,
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Io(e) => Some(e),
            DataError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- I/O ----
            DataError::Io(e) => write!(f, "Failed to read data file: {e}"),
            DataError::Csv(e) => write!(f, "Malformed delimited record: {e}"),

            // ---- Content ----
            DataError::MissingColumn { row, column } => {
                write!(f, "Row {row} has no column {column}")
            }
            DataError::Parse { row, value } => {
                write!(f, "Row {row}: cannot parse {value:?} as a finite number")
            }
            DataError::TooFewRows { found, window } => {
                write!(f, "Only {found} matching rows; a window of {window} was requested")
            }

            // ---- Configuration ----
            DataError::InvalidWindow => write!(f, "Window length must be positive"),
        }
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io(err)
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv(err)
    }
}

/// Which rows and column to read, and how to shape the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSpec {
    /// Zero-based column holding the region code.
    pub region_column: usize,
    /// Zero-based column holding the daily value.
    pub value_column: usize,
    pub region: String,
    /// Replace daily values by their running total.
    pub accumulate: bool,
    /// Number of trailing values to keep.
    pub window: usize,
}

impl Default for SeriesSpec {
    fn default() -> Self {
        Self {
            region_column: 1,
            value_column: 3,
            region: "POL".to_string(),
            accumulate: true,
            window: 100,
        }
    }
}

impl SeriesSpec {
    pub fn for_region(region: impl Into<String>) -> Self {
        Self { region: region.into(), ..Self::default() }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

/// Read the trailing observation window for one region.
///
/// # Errors
/// - [`DataError::InvalidWindow`] when `selection.window == 0`.
/// - [`DataError::Io`] / [`DataError::Csv`] for unreadable input.
/// - [`DataError::MissingColumn`] / [`DataError::Parse`] for bad matching rows.
/// - [`DataError::TooFewRows`] when fewer than `selection.window` rows match.
pub fn load_series(path: impl AsRef<Path>, selection: &SeriesSpec) -> DataResult<Array1<f64>> {
    if selection.window == 0 {
        return Err(DataError::InvalidWindow);
    }
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), region = %selection.region, window = selection.window, "loading series");

    let file = File::open(path)?;
    let mut reader =
        ReaderBuilder::new().has_headers(false).flexible(true).trim(Trim::All).from_reader(file);

    let mut values = Vec::new();
    let mut total = 0.0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.get(selection.region_column) != Some(selection.region.as_str()) {
            continue;
        }
        let field = record
            .get(selection.value_column)
            .ok_or(DataError::MissingColumn { row, column: selection.value_column })?;
        let value = field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DataError::Parse { row, value: field.to_string() })?;
        if selection.accumulate {
            total += value;
            values.push(total);
        } else {
            values.push(value);
        }
    }

    if values.len() < selection.window {
        return Err(DataError::TooFewRows { found: values.len(), window: selection.window });
    }
    let tail = values.split_off(values.len() - selection.window);
    tracing::info!(rows = tail.len(), last = tail.last().copied(), "series loaded");
    Ok(Array1::from(tail))
}
