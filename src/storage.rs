// Persist the two result tables so the report renderer (or anything
// else) can pick them up: CSV for human eyes, Parquet for tooling.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Save a DataFrame to a CSV file
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .context("Failed to write CSV data")?;

    Ok(())
}

/// Save a DataFrame to a Parquet file
pub fn write_parquet<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(df)
        .context("Failed to write Parquet data")?;

    Ok(())
}

/// Load a DataFrame from a Parquet file
pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open Parquet file: {}", path.display()))?;

    let df = ParquetReader::new(file)
        .finish()
        .context("Failed to read Parquet data")?;

    Ok(df)
}
