// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::debug;

use crate::store::{
    StoreError,
    history::HistoryStore,
    retry::{RetryPolicy, retry},
};

/// Per-SE historical pairing counts for the given attendees.
pub async fn build_counts<H: HistoryStore>(
    history: &Arc<H>,
    policy: &RetryPolicy,
    attendees: &BTreeSet<String>,
) -> Result<BTreeMap<String, usize>, StoreError> {
    let mut counts = BTreeMap::new();
    for alias in attendees {
        let n = retry(policy, "history.match_count", || {
            history.match_count(alias)
        })
        .await?;
        counts.insert(alias.clone(), n);
    }
    debug!(attendees = counts.len(), "assignment counts built");
    Ok(counts)
}

/// 80th percentile of the counts, linearly interpolated between ranks and
/// rounded to the nearest integer.
pub fn percentile_80(counts: &BTreeMap<String, usize>) -> i64 {
    let mut vals: Vec<usize> = counts.values().copied().collect();
    if vals.is_empty() {
        return 0;
    }
    vals.sort_unstable();
    let n = vals.len();
    if n == 1 {
        return vals[0] as i64;
    }
    let rank = 0.8 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    let p = vals[lo] as f64 + frac * (vals[hi] as f64 - vals[lo] as f64);
    p.round() as i64
}

/// The high-frequency cohort: everyone strictly above the percentile.
pub fn top_ses(counts: &BTreeMap<String, usize>, percentile: i64) -> BTreeSet<String> {
    counts
        .iter()
        .filter(|&(_, &c)| c as i64 > percentile)
        .map(|(alias, _)| alias.clone())
        .collect()
}

/// Upper median: the greater of the two middle values for even-length input.
pub fn median_high(values: &[usize]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}
