use crate::loader::RawTable;
use anyhow::Result;
use chrono::NaiveDate;

/// Input date format, e.g. `01-Apr-2024`.
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// One trading day with its fields parsed. Rows that fail to parse a
/// required field never make it into a `NormalizedTable`.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    /// Undefined when the cell is missing or unparseable; the row stays.
    pub open_interest: Option<f64>,
    pub contract_id: String,
}

/// A file's cleaned rows plus whether the source carried an open
/// interest column at all. Downstream signal availability hinges on
/// that flag, not on per-row presence checks.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub instrument: String,
    pub base_instrument: String,
    pub has_open_interest: bool,
    pub rows: Vec<NormalizedRow>,
}

/// Base instrument from an underscore-delimited file name:
/// `FUTIDX_BANKNIFTY_01-Apr-2024_TO_30-Jun-2024` -> `BANKNIFTY`.
/// Names without at least two tokens fall back to the full name.
pub fn extract_base_instrument(name: &str) -> String {
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() >= 2 {
        parts[1].to_string()
    } else {
        name.to_string()
    }
}

fn parse_number(cell: Option<&String>) -> Option<f64> {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Coerce one raw file into typed rows.
///
/// A missing `Date` column yields an empty table (the file contributes
/// nothing). A missing price or volume column is a file-level error,
/// caught at the assembler boundary. Individual rows with unparseable
/// dates or numbers are dropped silently.
pub fn normalize(table: &RawTable) -> Result<NormalizedTable> {
    let instrument = table.name.clone();
    let base_instrument = extract_base_instrument(&table.name);

    let date_idx = match table.column_index("Date") {
        Some(idx) => idx,
        None => {
            return Ok(NormalizedTable {
                instrument,
                base_instrument,
                has_open_interest: false,
                rows: Vec::new(),
            })
        }
    };

    let mut required = Vec::new();
    for name in ["Open", "Close", "No. of contracts"] {
        match table.column_index(name) {
            Some(idx) => required.push(idx),
            None => anyhow::bail!("{}: missing required column {name:?}", table.name),
        }
    }
    let (open_idx, close_idx, volume_idx) = (required[0], required[1], required[2]);

    let contract_idx = table
        .column_index("Expiry")
        .or_else(|| table.column_index("Expiry_Date"));
    let oi_idx = table.column_index("Open Int");

    let mut rows = Vec::new();
    for (position, cells) in table.rows.iter().enumerate() {
        let date = match cells
            .get(date_idx)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
        {
            Some(d) => d,
            None => continue,
        };
        let (open, close, volume) = match (
            parse_number(cells.get(open_idx)),
            parse_number(cells.get(close_idx)),
            parse_number(cells.get(volume_idx)),
        ) {
            (Some(o), Some(c), Some(v)) => (o, c, v),
            _ => continue,
        };

        // Without an expiry column every row becomes its own contract,
        // which the segmenter then discards as undersized.
        let contract_id = match contract_idx {
            Some(idx) => cells.get(idx).map(|s| s.trim().to_string()).unwrap_or_default(),
            None => position.to_string(),
        };
        let open_interest = oi_idx.and_then(|idx| parse_number(cells.get(idx)));

        rows.push(NormalizedRow {
            date,
            open,
            close,
            volume,
            open_interest,
            contract_id,
        });
    }

    rows.sort_by(|a, b| (a.date, &a.contract_id).cmp(&(b.date, &b.contract_id)));

    Ok(NormalizedTable {
        instrument,
        base_instrument,
        has_open_interest: oi_idx.is_some(),
        rows,
    })
}
