use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One input file read into memory: trimmed header names plus raw
/// string-valued cells, still untyped.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// File stem, e.g. `FUTIDX_BANKNIFTY_01-Apr-2024_TO_30-Jun-2024`.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a column by exact (already trimmed) header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// List every CSV file in a folder, sorted by path for stable output order.
pub fn discover_csv_files<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
    let folder = folder.as_ref();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("Data folder not found: {}", folder.display()))?
    {
        let path = entry?.path();
        if path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        anyhow::bail!("No CSV files found in {}", folder.display());
    }
    paths.sort();
    Ok(paths)
}

/// Read one delimited file into a `RawTable`
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header row: {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read record: {}", path.display()))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(RawTable {
        name,
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_file_trims_headers() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("FUTIDX_NIFTY_sample.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "Date , Open,Close,No. of contracts").unwrap();
        writeln!(file, "01-Apr-2024,100,101,5000").unwrap();
        drop(file);

        let table = load_raw_from_file(&file_path).unwrap();
        assert_eq!(table.name, "FUTIDX_NIFTY_sample");
        assert_eq!(table.headers, ["Date", "Open", "Close", "No. of contracts"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column_index("No. of contracts"), Some(3));
        assert_eq!(table.column_index("Open Int"), None);
    }

    #[test]
    fn test_discover_only_csv_sorted() {
        let dir = tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let paths = discover_csv_files(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_empty_folder_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(discover_csv_files(dir.path()).is_err());
    }
}
