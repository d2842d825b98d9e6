use crate::signals::EnrichedRow;

/// The four response metrics for one side of the loss/gain split.
///
/// Every field is undefined when no defined observation backs it; a
/// mean over zero values is never coerced to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetrics {
    pub avg_oi_percentile: Option<f64>,
    pub avg_next_day_volume_change: Option<f64>,
    pub avg_next_day_oi_normalized: Option<f64>,
    pub pct_oi_increase: Option<f64>,
}

/// Mean over the defined values; `None` when nothing is defined.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.into_iter().flatten() {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Compute the response metrics over one subset (the loss days or the
/// gain days of a group), given each row's global percentile.
///
/// The OI-increase share counts rows with an undefined next-day change
/// against the denominator; it is undefined only when no row of the
/// subset carries the open-interest capability.
pub fn response_metrics(days: &[(&EnrichedRow, Option<f64>)]) -> ResponseMetrics {
    if days.is_empty() {
        return ResponseMetrics::default();
    }

    let avg_oi_percentile = mean_defined(days.iter().map(|(_, pctl)| *pctl));
    let avg_next_day_volume_change =
        mean_defined(days.iter().map(|(r, _)| r.next_day_volume_pct_change));
    let avg_next_day_oi_normalized =
        mean_defined(days.iter().map(|(r, _)| r.next_day_oi_normalized_change));

    let pct_oi_increase = days
        .iter()
        .any(|(r, _)| r.has_open_interest)
        .then(|| {
            let increases = days
                .iter()
                .filter(|(r, _)| r.next_day_oi_change.map_or(false, |c| c > 0.0))
                .count();
            increases as f64 / days.len() as f64 * 100.0
        });

    ResponseMetrics {
        avg_oi_percentile,
        avg_next_day_volume_change,
        avg_next_day_oi_normalized,
        pct_oi_increase,
    }
}

/// Round to 4 decimal places for presentation.
pub fn round4(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 10_000.0).round() / 10_000.0)
}

impl ResponseMetrics {
    pub fn rounded(&self) -> Self {
        Self {
            avg_oi_percentile: round4(self.avg_oi_percentile),
            avg_next_day_volume_change: round4(self.avg_next_day_volume_change),
            avg_next_day_oi_normalized: round4(self.avg_next_day_oi_normalized),
            pct_oi_increase: round4(self.pct_oi_increase),
        }
    }
}
