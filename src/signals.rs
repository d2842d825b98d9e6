use crate::config::AnalysisConfig;
use crate::contracts::ContractSeries;
use crate::normalizer::NormalizedTable;
use chrono::NaiveDate;

/// A contract row with every derived signal attached. Conditional
/// fields are `None` when their inputs are unavailable: no prior row,
/// no following row, not enough window history, a zero denominator, or
/// a source file without an open-interest column.
#[derive(Debug, Clone)]
pub struct EnrichedRow {
    pub instrument: String,
    pub base_instrument: String,
    pub contract_id: String,
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: Option<f64>,
    /// Whether the source file carried an open-interest column at all.
    pub has_open_interest: bool,
    pub daily_change: f64,
    pub is_loss: bool,
    pub is_gain: bool,
    pub volume_pct_change: Option<f64>,
    pub oi_change: Option<f64>,
    pub oi_trailing_avg: Option<f64>,
    pub oi_normalized_change: Option<f64>,
    pub next_day_oi: Option<f64>,
    pub next_day_oi_change: Option<f64>,
    pub next_day_oi_normalized_change: Option<f64>,
    pub next_day_volume: Option<f64>,
    pub next_day_volume_pct_change: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn pct_change(from: f64, to: f64) -> Option<f64> {
    finite((to - from) / from * 100.0)
}

/// Mean of the defined open-interest values in the trailing window
/// ending at `index`, requiring `min_periods` of them.
fn trailing_oi_avg(
    rows: &[crate::normalizer::NormalizedRow],
    index: usize,
    window: usize,
    min_periods: usize,
) -> Option<f64> {
    let start = (index + 1).saturating_sub(window);
    let defined: Vec<f64> = rows[start..=index]
        .iter()
        .filter_map(|r| r.open_interest)
        .collect();
    if defined.len() < min_periods {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Compute the full signal set for one cleaned, date-sorted series,
/// stamping the owning instrument onto every row.
pub fn enrich_series(
    series: &ContractSeries,
    table: &NormalizedTable,
    config: &AnalysisConfig,
) -> Vec<EnrichedRow> {
    let rows = &series.rows;
    let has_oi = table.has_open_interest;
    let mut enriched = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let previous = (i > 0).then(|| &rows[i - 1]);
        let next = rows.get(i + 1);

        let daily_change = row.close - row.open;

        let volume_pct_change = previous.and_then(|p| pct_change(p.volume, row.volume));
        let next_day_volume = next.map(|n| n.volume);
        let next_day_volume_pct_change =
            next_day_volume.and_then(|nv| pct_change(row.volume, nv));

        let (oi_change, oi_trailing_avg, oi_normalized_change) = if has_oi {
            let change = match (previous.and_then(|p| p.open_interest), row.open_interest) {
                (Some(prev), Some(cur)) => Some(cur - prev),
                _ => None,
            };
            let avg = trailing_oi_avg(rows, i, config.oi_avg_window, config.oi_avg_min_periods);
            let normalized = match (change, avg) {
                (Some(c), Some(a)) => finite(c / a),
                _ => None,
            };
            (change, avg, normalized)
        } else {
            (None, None, None)
        };

        let (next_day_oi, next_day_oi_change, next_day_oi_normalized_change) = if has_oi {
            let next_oi = next.and_then(|n| n.open_interest);
            let change = match (next_oi, row.open_interest) {
                (Some(n), Some(cur)) => Some(n - cur),
                _ => None,
            };
            let normalized = match (change, oi_trailing_avg) {
                (Some(c), Some(a)) => finite(c / a),
                _ => None,
            };
            (next_oi, change, normalized)
        } else {
            (None, None, None)
        };

        enriched.push(EnrichedRow {
            instrument: table.instrument.clone(),
            base_instrument: table.base_instrument.clone(),
            contract_id: series.contract_id.clone(),
            date: row.date,
            open: row.open,
            close: row.close,
            volume: row.volume,
            open_interest: row.open_interest,
            has_open_interest: has_oi,
            daily_change,
            is_loss: daily_change < 0.0,
            is_gain: daily_change > 0.0,
            volume_pct_change,
            oi_change,
            oi_trailing_avg,
            oi_normalized_change,
            next_day_oi,
            next_day_oi_change,
            next_day_oi_normalized_change,
            next_day_volume,
            next_day_volume_pct_change,
        });
    }

    enriched
}
