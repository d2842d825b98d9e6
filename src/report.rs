use crate::metrics::{self, ResponseMetrics};
use crate::ranker;
use crate::signals::EnrichedRow;
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Which roll-up level a summary row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryTier {
    Contract,
    InstrumentAverage,
    OverallAverage,
}

impl SummaryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryTier::Contract => "CONTRACT",
            SummaryTier::InstrumentAverage => "INSTRUMENT_AVG",
            SummaryTier::OverallAverage => "OVERALL_AVG",
        }
    }
}

/// One row of the compiled report: a single contract, a per-instrument
/// average, or the overall average.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub tier: SummaryTier,
    pub instrument: String,
    pub base_instrument: String,
    pub contract_id: String,
    pub total_days: u32,
    pub loss_days: u32,
    pub gain_days: u32,
    pub after_loss: ResponseMetrics,
    pub after_gain: ResponseMetrics,
}

fn summarize_group(
    tier: SummaryTier,
    instrument: &str,
    base_instrument: &str,
    contract_id: &str,
    days: &[(&EnrichedRow, Option<f64>)],
) -> SummaryRow {
    let losses: Vec<_> = days.iter().filter(|(r, _)| r.is_loss).copied().collect();
    let gains: Vec<_> = days.iter().filter(|(r, _)| r.is_gain).copied().collect();
    SummaryRow {
        tier,
        instrument: instrument.to_string(),
        base_instrument: base_instrument.to_string(),
        contract_id: contract_id.to_string(),
        total_days: days.len() as u32,
        loss_days: losses.len() as u32,
        gain_days: gains.len() as u32,
        after_loss: metrics::response_metrics(&losses),
        after_gain: metrics::response_metrics(&gains),
    }
}

/// Mean-of-means roll-up over a set of contract summaries. Every
/// contract weighs the same regardless of its row count; recomputing
/// from pooled raw rows would give a different (wrong) answer.
fn average_of(contracts: &[&SummaryRow], instrument: String, base_instrument: String, tier: SummaryTier) -> SummaryRow {
    let side = |pick: fn(&SummaryRow) -> &ResponseMetrics| ResponseMetrics {
        avg_oi_percentile: metrics::mean_defined(
            contracts.iter().map(|c| pick(c).avg_oi_percentile),
        ),
        avg_next_day_volume_change: metrics::mean_defined(
            contracts.iter().map(|c| pick(c).avg_next_day_volume_change),
        ),
        avg_next_day_oi_normalized: metrics::mean_defined(
            contracts.iter().map(|c| pick(c).avg_next_day_oi_normalized),
        ),
        pct_oi_increase: metrics::mean_defined(
            contracts.iter().map(|c| pick(c).pct_oi_increase),
        ),
    };
    SummaryRow {
        tier,
        instrument,
        base_instrument,
        contract_id: String::new(),
        total_days: contracts.iter().map(|c| c.total_days).sum(),
        loss_days: contracts.iter().map(|c| c.loss_days).sum(),
        gain_days: contracts.iter().map(|c| c.gain_days).sum(),
        after_loss: side(|c| &c.after_loss),
        after_gain: side(|c| &c.after_gain),
    }
}

/// Build the three-tier compiled report: contract summaries sorted by
/// (base instrument, contract id), then one average row per base
/// instrument, then the overall average. Percentiles are ranked over
/// the complete dataset before any grouping. All metrics are rounded
/// to 4 decimals at the very end, so roll-ups average unrounded means.
pub fn compile_report(rows: &[EnrichedRow]) -> Vec<SummaryRow> {
    let percentiles = ranker::global_oi_percentiles(rows);

    let mut groups: BTreeMap<(&str, &str), Vec<(&EnrichedRow, Option<f64>)>> = BTreeMap::new();
    for (row, pctl) in rows.iter().zip(&percentiles) {
        groups
            .entry((row.instrument.as_str(), row.contract_id.as_str()))
            .or_default()
            .push((row, *pctl));
    }

    let mut contracts: Vec<SummaryRow> = groups
        .iter()
        .map(|((instrument, contract_id), days)| {
            summarize_group(
                SummaryTier::Contract,
                instrument,
                &days[0].0.base_instrument,
                contract_id,
                days,
            )
        })
        .collect();
    contracts.sort_by(|a, b| {
        (&a.base_instrument, &a.contract_id, &a.instrument)
            .cmp(&(&b.base_instrument, &b.contract_id, &b.instrument))
    });

    let (instrument_averages, overall) = {
        let mut by_base: BTreeMap<&str, Vec<&SummaryRow>> = BTreeMap::new();
        for contract in &contracts {
            by_base
                .entry(contract.base_instrument.as_str())
                .or_default()
                .push(contract);
        }
        let averages: Vec<SummaryRow> = by_base
            .iter()
            .map(|(base, members)| {
                average_of(
                    members,
                    format!("{base} - AVERAGE"),
                    base.to_string(),
                    SummaryTier::InstrumentAverage,
                )
            })
            .collect();

        let all: Vec<&SummaryRow> = contracts.iter().collect();
        let overall = average_of(
            &all,
            "OVERALL AVERAGE".to_string(),
            "ALL".to_string(),
            SummaryTier::OverallAverage,
        );
        (averages, overall)
    };

    let mut report = contracts;
    report.extend(instrument_averages);
    report.push(overall);
    for row in &mut report {
        row.after_loss = row.after_loss.rounded();
        row.after_gain = row.after_gain.rounded();
    }
    report
}

/// Render the compiled report as the table handed to the consumer.
pub fn to_dataframe(rows: &[SummaryRow]) -> Result<DataFrame> {
    let df = df![
        "Tier" => rows.iter().map(|r| r.tier.as_str()).collect::<Vec<_>>(),
        "Instrument" => rows.iter().map(|r| r.instrument.clone()).collect::<Vec<_>>(),
        "Base_Instrument" => rows.iter().map(|r| r.base_instrument.clone()).collect::<Vec<_>>(),
        "Contract_ID" => rows.iter().map(|r| r.contract_id.clone()).collect::<Vec<_>>(),
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
