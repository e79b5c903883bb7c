//! Data loading utilities

use crate::error::{LtvError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Rows sampled for schema inference when reading CSV
const INFER_SCHEMA_ROWS: usize = 1000;

/// Tabular input format, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv { delimiter: u8 },
    Parquet,
    Json { lines: bool },
}

impl DataFormat {
    /// Detect the format of a path; unknown extensions read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "tsv" => DataFormat::Csv { delimiter: b'\t' },
            "parquet" | "pq" => DataFormat::Parquet,
            "json" => DataFormat::Json { lines: false },
            "jsonl" | "ndjson" => DataFormat::Json { lines: true },
            _ => DataFormat::Csv { delimiter: b',' },
        }
    }
}

/// Load a raw table from disk
pub fn load_data(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LtvError::Data(format!("Data file not found at {}", path.display())));
    }

    let start = Instant::now();
    let df = match DataFormat::from_path(path) {
        DataFormat::Csv { delimiter } => {
            let parse_opts = CsvParseOptions::default().with_separator(delimiter);
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
                .with_parse_options(parse_opts)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        }
        DataFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
        DataFormat::Json { lines } => {
            let format = if lines { JsonFormat::JsonLines } else { JsonFormat::Json };
            JsonReader::new(File::open(path)?).with_json_format(format).finish()?
        }
    };

    info!(
        "Loaded {} rows x {} cols from {} in {:?}",
        df.height(),
        df.width(),
        path.display(),
        start.elapsed()
    );
    Ok(df)
}

/// Write a table to CSV, creating the parent directory if needed
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
