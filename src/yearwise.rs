use crate::metrics::{self, ResponseMetrics};
use crate::ranker;
use crate::signals::EnrichedRow;
use anyhow::Result;
use chrono::Datelike;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Output format for the period bounds, e.g. `01 Apr 2024`.
const PERIOD_FORMAT: &str = "%d %b %Y";

/// One (base instrument, calendar year) row, pooling every contract
/// of that instrument active in the year.
#[derive(Debug, Clone)]
pub struct YearSummaryRow {
    pub instrument: String,
    pub year: i32,
    pub period: String,
    pub total_days: u32,
    pub loss_days: u32,
    pub gain_days: u32,
    pub after_loss: ResponseMetrics,
    pub after_gain: ResponseMetrics,
}

/// Group the combined dataset by (base instrument, year) and compute
/// the loss/gain response metrics directly from the pooled rows. The
/// percentile ranking is the same population-wide one the compiled
/// report uses, recomputed here over the identical dataset.
pub fn yearwise_summary(rows: &[EnrichedRow]) -> Vec<YearSummaryRow> {
    let percentiles = ranker::global_oi_percentiles(rows);

    let mut groups: BTreeMap<(&str, i32), Vec<(&EnrichedRow, Option<f64>)>> = BTreeMap::new();
    for (row, pctl) in rows.iter().zip(&percentiles) {
        groups
            .entry((row.base_instrument.as_str(), row.date.year()))
            .or_default()
            .push((row, *pctl));
    }

    groups
        .iter()
        .map(|((base, year), days)| {
            let min_date = days.iter().map(|(r, _)| r.date).min().unwrap_or_default();
            let max_date = days.iter().map(|(r, _)| r.date).max().unwrap_or_default();
            let losses: Vec<_> = days.iter().filter(|(r, _)| r.is_loss).copied().collect();
            let gains: Vec<_> = days.iter().filter(|(r, _)| r.is_gain).copied().collect();
            YearSummaryRow {
                instrument: base.to_string(),
                year: *year,
                period: format!(
                    "{} to {}",
                    min_date.format(PERIOD_FORMAT),
                    max_date.format(PERIOD_FORMAT)
                ),
                total_days: days.len() as u32,
                loss_days: losses.len() as u32,
                gain_days: gains.len() as u32,
                after_loss: metrics::response_metrics(&losses).rounded(),
                after_gain: metrics::response_metrics(&gains).rounded(),
            }
        })
        .collect()
}

/// Render the year-wise summary as the table handed to the consumer.
pub fn to_dataframe(rows: &[YearSummaryRow]) -> Result<DataFrame> {
    let df = df![
        "Instrument" => rows.iter().map(|r| r.instrument.clone()).collect::<Vec<_>>(),
        "Year" => rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        "Period" => rows.iter().map(|r| r.period.clone()).collect::<Vec<_>>(),
        "Total_Days" => rows.iter().map(|r| r.total_days).collect::<Vec<_>>(),
        "Loss_Days" => rows.iter().map(|r| r.loss_days).collect::<Vec<_>>(),
        "Gain_Days" => rows.iter().map(|r| r.gain_days).collect::<Vec<_>>(),
        "Avg_OI_Percentile_AfterLoss" => rows.iter().map(|r| r.after_loss.avg_oi_percentile).collect::<Vec<_>>(),
        "Avg_NextDay_Volume_Change_AfterLoss" => rows.iter().map(|r| r.after_loss.avg_next_day_volume_change).collect::<Vec<_>>(),
        "Avg_NextDay_OI_Normalized_AfterLoss" => rows.iter().map(|r| r.after_loss.avg_next_day_oi_normalized).collect::<Vec<_>>(),
        "Pct_OI_Increase_AfterLoss" => rows.iter().map(|r| r.after_loss.pct_oi_increase).collect::<Vec<_>>(),
        "Avg_OI_Percentile_AfterGain" => rows.iter().map(|r| r.after_gain.avg_oi_percentile).collect::<Vec<_>>(),
        "Avg_NextDay_Volume_Change_AfterGain" => rows.iter().map(|r| r.after_gain.avg_next_day_volume_change).collect::<Vec<_>>(),
        "Avg_NextDay_OI_Normalized_AfterGain" => rows.iter().map(|r| r.after_gain.avg_next_day_oi_normalized).collect::<Vec<_>>(),
        "Pct_OI_Increase_AfterGain" => rows.iter().map(|r| r.after_gain.pct_oi_increase).collect::<Vec<_>>(),
    ]?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(
        base: &str,
        contract: &str,
        date: NaiveDate,
        daily_change: f64,
        next_day_volume_pct_change: Option<f64>,
    ) -> EnrichedRow {
        EnrichedRow {
            instrument: format!("FUTIDX_{base}_file"),
            base_instrument: base.to_string(),
            contract_id: contract.to_string(),
            date,
            open: 100.0,
            close: 100.0 + daily_change,
            volume: 1000.0,
            open_interest: None,
            has_open_interest: false,
            daily_change,
            is_loss: daily_change < 0.0,
            is_gain: daily_change > 0.0,
            volume_pct_change: None,
            oi_change: None,
            oi_trailing_avg: None,
            oi_normalized_change: None,
            next_day_oi: None,
            next_day_oi_change: None,
            next_day_oi_normalized_change: None,
            next_day_volume: None,
            next_day_volume_pct_change,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_contracts_pool_within_a_year() {
        let rows = vec![
            row("NIFTY", "c1", d(2024, 2, 5), -1.0, Some(10.0)),
            row("NIFTY", "c1", d(2024, 3, 5), 1.0, Some(2.0)),
            row("NIFTY", "c2", d(2024, 8, 5), -1.0, Some(30.0)),
            row("NIFTY", "c2", d(2024, 9, 5), 1.0, Some(4.0)),
        ];
        let summary = yearwise_summary(&rows);
        assert_eq!(summary.len(), 1);
        let year = &summary[0];
        assert_eq!(year.year, 2024);
        assert_eq!(year.total_days, 4);
        assert_eq!(year.loss_days, 2);
        // Pooled, single-level mean across both contracts' loss days.
        assert_eq!(year.after_loss.avg_next_day_volume_change, Some(20.0));
        assert_eq!(year.period, "05 Feb 2024 to 05 Sep 2024");
    }

    #[test]
    fn test_sorted_by_instrument_then_year() {
        let rows = vec![
            row("ZINC", "c1", d(2023, 5, 1), -1.0, None),
            row("ZINC", "c1", d(2024, 5, 1), -1.0, None),
            row("ALU", "c2", d(2024, 5, 1), 1.0, None),
        ];
        let summary = yearwise_summary(&rows);
        let keys: Vec<(&str, i32)> = summary
            .iter()
            .map(|r| (r.instrument.as_str(), r.year))
            .collect();
        assert_eq!(keys, [("ALU", 2024), ("ZINC", 2023), ("ZINC", 2024)]);
    }

    #[test]
    fn test_dataframe_shape() {
        let rows = vec![
            row("NIFTY", "c1", d(2024, 2, 5), -1.0, Some(10.0)),
            row("NIFTY", "c1", d(2024, 3, 5), 1.0, Some(2.0)),
        ];
        let summary = yearwise_summary(&rows);
        let df = to_dataframe(&summary).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 14);
        let period = df.column("Period").unwrap().str().unwrap().get(0).unwrap();
        assert_eq!(period, "05 Feb 2024 to 05 Mar 2024");
    }
}
