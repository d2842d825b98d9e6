use crate::signals::EnrichedRow;

/// Average-rank percentile of the open-interest normalized change,
/// computed across the whole combined dataset.
///
/// Must run after assembly: the population is every row of every file,
/// never a per-file or per-instrument slice. Rows without a defined
/// normalized change get no percentile. Ties share the averaged rank,
/// so defined values land in (0, 100] and the maximum ranks at 100.
pub fn global_oi_percentiles(rows: &[EnrichedRow]) -> Vec<Option<f64>> {
    let mut out = vec![None; rows.len()];

    let mut defined: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.oi_normalized_change.is_some())
        .map(|(i, _)| i)
        .collect();
    let n = defined.len();
    if n == 0 {
        return out;
    }

    let value = |i: usize| rows[i].oi_normalized_change.unwrap_or_default();
    defined.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && value(defined[end + 1]) == value(defined[start]) {
            end += 1;
        }
        // 1-based ranks averaged over the tie run.
        let average_rank = (start + end + 2) as f64 / 2.0;
        let percentile = average_rank / n as f64 * 100.0;
        for &index in &defined[start..=end] {
            out[index] = Some(percentile);
        }
        start = end + 1;
    }

    out
}
