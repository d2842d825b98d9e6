use anyhow::Result;
use log::info;
use nextday::{assembler, config::AnalysisConfig, loader, report, storage, yearwise};

fn main() -> Result<()> {
    env_logger::init();

    let data_folder = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data_folder".to_string());
    let config = AnalysisConfig::default();

    let paths = loader::discover_csv_files(&data_folder)?;
    info!("Found {} CSV file(s) in {data_folder}", paths.len());

    let corpus = assembler::assemble_files(&paths, &config)?;
    info!("Total rows analyzed: {}", corpus.rows.len());
    info!("Unique base instruments: {}", corpus.base_instrument_count());
    info!("Unique contracts: {}", corpus.contract_count());

    let compiled = report::compile_report(&corpus.rows);
    let mut compiled_df = report::to_dataframe(&compiled)?;
    let yearwise_rows = yearwise::yearwise_summary(&corpus.rows);
    let mut yearwise_df = yearwise::to_dataframe(&yearwise_rows)?;

    storage::write_csv(&mut compiled_df, "compiled_analysis.csv")?;
    storage::write_csv(&mut yearwise_df, "yearwise_summary.csv")?;
    storage::write_parquet(&mut compiled_df, "compiled_analysis.parquet")?;
    storage::write_parquet(&mut yearwise_df, "yearwise_summary.parquet")?;

    info!("Compiled analysis: {} rows", compiled_df.height());
    info!("Year-wise summary: {} rows", yearwise_df.height());
    Ok(())
}
