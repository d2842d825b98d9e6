use crate::config::AnalysisConfig;
use crate::normalizer::{NormalizedRow, NormalizedTable};
use std::collections::HashMap;

/// Date-ordered rows for one contract within one file, after the
/// rollover trim and the liquidity filter.
#[derive(Debug, Clone)]
pub struct ContractSeries {
    pub contract_id: String,
    pub rows: Vec<NormalizedRow>,
}

/// Split a normalized file into per-contract series and apply, in
/// order: the undersized-contract discard, the head/tail rollover trim,
/// the prior-day open-interest floor, and the too-few-rows discard.
///
/// The trim must run before the floor so rollover-contaminated rows do
/// not count toward the liquidity decision.
pub fn segment_contracts(table: &NormalizedTable, config: &AnalysisConfig) -> Vec<ContractSeries> {
    let mut groups: HashMap<&str, Vec<NormalizedRow>> = HashMap::new();
    for row in &table.rows {
        groups.entry(&row.contract_id).or_default().push(row.clone());
    }

    let mut series: Vec<ContractSeries> = Vec::new();
    for (contract_id, mut rows) in groups {
        rows.sort_by_key(|r| r.date);

        if rows.len() <= config.min_contract_rows {
            continue;
        }

        let trim = config.rollover_trim;
        if rows.len() <= 2 * trim {
            continue;
        }
        let trimmed: Vec<NormalizedRow> = rows[trim..rows.len() - trim].to_vec();

        let filtered: Vec<NormalizedRow> = if table.has_open_interest {
            // A row survives only when the previous trimmed row clears
            // the floor, so the first trimmed row always falls out.
            trimmed
                .iter()
                .enumerate()
                .filter(|(i, _)| {
                    *i > 0
                        && trimmed[i - 1]
                            .open_interest
                            .map_or(false, |oi| oi >= config.oi_floor)
                })
                .map(|(_, row)| row.clone())
                .collect()
        } else {
            trimmed
        };

        if filtered.len() < 2 {
            continue;
        }

        series.push(ContractSeries {
            contract_id: contract_id.to_string(),
            rows: filtered,
        });
    }

    // Ascending (first date, contract id) keeps corpus row order stable.
    series.sort_by(|a, b| {
        (a.rows[0].date, &a.contract_id).cmp(&(b.rows[0].date, &b.contract_id))
    });
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, contract_id: &str, oi: Option<f64>) -> NormalizedRow {
        NormalizedRow {
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            open: 100.0,
            close: 101.0,
            volume: 5000.0,
            open_interest: oi,
            contract_id: contract_id.to_string(),
        }
    }

    fn table(rows: Vec<NormalizedRow>, has_oi: bool) -> NormalizedTable {
        NormalizedTable {
            instrument: "FUTIDX_NIFTY_test".to_string(),
            base_instrument: "NIFTY".to_string(),
            has_open_interest: has_oi,
            rows,
        }
    }

    #[test]
    fn test_undersized_contract_discarded() {
        let rows = (1..=6).map(|d| row(d, "A", None)).collect();
        let series = segment_contracts(&table(rows, false), &AnalysisConfig::default());
        assert!(series.is_empty());
    }

    #[test]
    fn test_trim_without_oi() {
        // 10 rows -> survives the <=6 discard -> 3/3 trim leaves 4.
        let rows = (1..=10).map(|d| row(d, "A", None)).collect();
        let series = segment_contracts(&table(rows, false), &AnalysisConfig::default());
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].rows.len(), 4);
        assert_eq!(
            series[0].rows[0].date,
            NaiveDate::from_ymd_opt(2024, 4, 4).unwrap()
        );
        assert_eq!(
            series[0].rows[3].date,
            NaiveDate::from_ymd_opt(2024, 4, 7).unwrap()
        );
    }

    #[test]
    fn test_floor_filter_drops_first_row() {
        // All rows clear the floor on their own, yet the first trimmed
        // row has no predecessor and falls out. Deliberately pinned;
        // see DESIGN.md before changing.
        let rows = (1..=13).map(|d| row(d, "A", Some(5000.0))).collect();
        let series = segment_contracts(&table(rows, true), &AnalysisConfig::default());
        assert_eq!(series.len(), 1);
        // 13 -> trim to 7 -> first trimmed row dropped -> 6.
        assert_eq!(series[0].rows.len(), 6);
        assert_eq!(
            series[0].rows[0].date,
            NaiveDate::from_ymd_opt(2024, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_floor_filter_uses_previous_row() {
        let mut rows: Vec<NormalizedRow> = (1..=13).map(|d| row(d, "A", Some(5000.0))).collect();
        // Row 6 (inside the trimmed window) is illiquid, so row 7 goes.
        rows[5].open_interest = Some(100.0);
        let series = segment_contracts(&table(rows, true), &AnalysisConfig::default());
        assert_eq!(series[0].rows.len(), 5);
        assert!(!series[0]
            .rows
            .iter()
            .any(|r| r.date == NaiveDate::from_ymd_opt(2024, 4, 7).unwrap()));
    }

    #[test]
    fn test_floor_is_monotonic() {
        let oi = [3000.0, 1500.0, 4000.0, 2500.0, 5000.0, 800.0, 3500.0, 4200.0, 2100.0, 900.0,
            6000.0, 2700.0, 3100.0];
        let rows: Vec<NormalizedRow> = oi
            .iter()
            .enumerate()
            .map(|(i, &v)| row(i as u32 + 1, "A", Some(v)))
            .collect();
        let mut previous_len = usize::MAX;
        for floor in [0.0, 1000.0, 2000.0, 3000.0, 5000.0] {
            let config = AnalysisConfig {
                oi_floor: floor,
                ..AnalysisConfig::default()
            };
            let series = segment_contracts(&table(rows.clone(), true), &config);
            let len = series.first().map_or(0, |s| s.rows.len());
            assert!(len <= previous_len, "floor {floor} grew the row set");
            previous_len = len;
        }
    }

    #[test]
    fn test_contracts_ordered_by_first_date() {
        let mut rows: Vec<NormalizedRow> = (11..=20).map(|d| row(d, "B", None)).collect();
        rows.extend((1..=10).map(|d| row(d, "A", None)));
        let series = segment_contracts(&table(rows, false), &AnalysisConfig::default());
        let ids: Vec<&str> = series.iter().map(|s| s.contract_id.as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
    }
}
