//! CSV-backed series

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::info;

use sc_core::{LoadHandle, Range, Sample, SeriesLoader};

use super::MemorySource;
use crate::DataError;

/// Series read from two integer columns of a CSV file.
///
/// The file is parsed once up front; loads are served from memory.
#[derive(Debug, Clone)]
pub struct CsvSource {
    /// Path to the CSV file, if it came from disk
    path: Option<PathBuf>,
    data: MemorySource,
}

impl CsvSource {
    /// Parse `x_column` and `y_column` of a CSV file on a blocking thread
    pub async fn open(path: PathBuf, x_column: &str, y_column: &str) -> Result<Self, DataError> {
        info!("Creating CsvSource for {:?}", path);
        let x_column = x_column.to_string();
        let y_column = y_column.to_string();
        tokio::task::spawn_blocking(move || -> Result<Self, DataError> {
            let file = File::open(&path)?;
            let mut source = Self::from_reader(BufReader::new(file), &x_column, &y_column)?;
            source.path = Some(path);
            Ok(source)
        })
        .await?
    }

    /// Parse CSV data with a header row from any reader
    pub fn from_reader<R: Read>(reader: R, x_column: &str, y_column: &str) -> Result<Self, DataError> {
        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| DataError::Csv(format!("column '{}' not found", name)))
        };
        let x_idx = column(x_column)?;
        let y_idx = column(y_column)?;

        let mut samples = Vec::new();
        for (row, result) in csv_reader.records().enumerate() {
            let record = result?;
            let x = parse_field(&record, x_idx, row)?;
            let y = parse_field(&record, y_idx, row)?;
            samples.push(Sample::new(x, y));
        }

        Ok(Self {
            path: None,
            data: MemorySource::new(samples),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bounds(&self) -> Range {
        self.data.bounds()
    }
}

fn parse_field(record: &csv::StringRecord, idx: usize, row: usize) -> Result<i64, DataError> {
    let value = record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| DataError::Csv(format!("row {}: missing column {}", row + 1, idx)))?;
    value
        .parse::<i64>()
        .map_err(|e| DataError::Csv(format!("row {}: '{}' is not an integer: {}", row + 1, value, e)))
}

impl SeriesLoader for CsvSource {
    fn load(&self, range: Range, handle: LoadHandle) {
        self.data.load(range, handle);
    }
}
