use crate::config::AnalysisConfig;
use crate::contracts;
use crate::loader::{self, RawTable};
use crate::normalizer;
use crate::signals::{self, EnrichedRow};
use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use std::path::PathBuf;

/// The combined dataset across every input file, with per-file
/// accounting. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub rows: Vec<EnrichedRow>,
    pub files_processed: usize,
    pub files_failed: usize,
}

impl Corpus {
    /// Distinct base instruments, for run summaries.
    pub fn base_instrument_count(&self) -> usize {
        let mut bases: Vec<&str> = self.rows.iter().map(|r| r.base_instrument.as_str()).collect();
        bases.sort_unstable();
        bases.dedup();
        bases.len()
    }

    /// Distinct (instrument, contract) pairs.
    pub fn contract_count(&self) -> usize {
        let mut contracts: Vec<(&str, &str)> = self
            .rows
            .iter()
            .map(|r| (r.instrument.as_str(), r.contract_id.as_str()))
            .collect();
        contracts.sort_unstable();
        contracts.dedup();
        contracts.len()
    }
}

/// Normalizer -> segmenter -> signal engine for one file.
pub fn analyze_table(table: &RawTable, config: &AnalysisConfig) -> Result<Vec<EnrichedRow>> {
    let normalized = normalizer::normalize(table)?;
    let mut rows = Vec::new();
    for series in contracts::segment_contracts(&normalized, config) {
        rows.extend(signals::enrich_series(&series, &normalized, config));
    }
    Ok(rows)
}

fn collect(per_file: Vec<Vec<EnrichedRow>>) -> Result<Corpus> {
    let files_processed = per_file.iter().filter(|rows| !rows.is_empty()).count();
    let files_failed = per_file.len() - files_processed;
    let rows: Vec<EnrichedRow> = per_file.into_iter().flatten().collect();

    info!(
        "Summary: {} files processed, {} files skipped/failed",
        files_processed, files_failed
    );
    if rows.is_empty() {
        anyhow::bail!("No valid data found in any input file");
    }
    Ok(Corpus {
        rows,
        files_processed,
        files_failed,
    })
}

fn run_one(name: &str, outcome: Result<Vec<EnrichedRow>>) -> Vec<EnrichedRow> {
    match outcome {
        Ok(rows) if rows.is_empty() => {
            warn!("Skipped: {name} (insufficient data)");
            rows
        }
        Ok(rows) => {
            info!("Processed: {name} ({} rows)", rows.len());
            rows
        }
        Err(err) => {
            warn!("Failed: {name} - {err:#}");
            Vec::new()
        }
    }
}

/// Run the per-file pipeline over every path and concatenate the
/// results in path order. A failing file is logged and counted, never
/// fatal; a corpus with no rows at all is.
///
/// Files are independent, so the fan-out is parallel; everything
/// downstream (ranking, both aggregations) waits for the full corpus.
pub fn assemble_files(paths: &[PathBuf], config: &AnalysisConfig) -> Result<Corpus> {
    let per_file: Vec<Vec<EnrichedRow>> = paths
        .par_iter()
        .map(|path| {
            let name = path.display().to_string();
            let outcome =
                loader::load_raw_from_file(path).and_then(|table| analyze_table(&table, config));
            run_one(&name, outcome)
        })
        .collect();
    collect(per_file)
}

/// Same pipeline for tables already in memory, for suppliers that are
/// not files.
pub fn assemble_tables(tables: &[RawTable], config: &AnalysisConfig) -> Result<Corpus> {
    let per_file: Vec<Vec<EnrichedRow>> = tables
        .par_iter()
        .map(|table| run_one(&table.name, analyze_table(table, config)))
        .collect();
    collect(per_file)
}
