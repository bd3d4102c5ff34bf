// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    engine::{PairingError, frequency::median_high},
    models::se::SeInfo,
    store::{
        directory::DirectoryStore,
        retry::{RetryPolicy, retry},
    },
};

/// One region's unassigned attendees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub region: String,
    pub aliases: Vec<String>,
}

/// Region-index-keyed partition of the unassigned attendance set. Buckets
/// are dropped as they empty, so the key set always equals the non-empty
/// regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionBuckets {
    inner: BTreeMap<u16, Bucket>,
}

impl RegionBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u16, region: &str, alias: &str) {
        self.inner
            .entry(index)
            .or_insert_with(|| Bucket {
                region: region.to_string(),
                aliases: Vec::new(),
            })
            .aliases
            .push(alias.to_string());
    }

    /// Total unassigned attendees across all buckets.
    pub fn total(&self) -> usize {
        self.inner.values().map(|b| b.aliases.len()).sum()
    }

    /// Key-sorted map of region index to bucket size.
    pub fn running_count(&self) -> BTreeMap<u16, usize> {
        self.inner
            .iter()
            .map(|(&idx, b)| (idx, b.aliases.len()))
            .collect()
    }

    pub fn aliases_in(&self, index: u16) -> BTreeSet<String> {
        self.inner
            .get(&index)
            .map(|b| b.aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn region_name(&self, index: u16) -> Option<&str> {
        self.inner.get(&index).map(|b| b.region.as_str())
    }

    pub fn choose_alias<R: Rng>(&self, index: u16, rng: &mut R) -> Option<String> {
        self.inner
            .get(&index)
            .and_then(|b| b.aliases.choose(rng).cloned())
    }

    /// Removes an alias from its bucket, dropping the bucket when emptied.
    pub fn remove_alias(&mut self, index: u16, alias: &str) {
        if let Some(b) = self.inner.get_mut(&index) {
            b.aliases.retain(|a| a != alias);
            if b.aliases.is_empty() {
                debug!(region = index, "region bucket emptied");
                self.inner.remove(&index);
            }
        }
    }
}

/// The region with the most unassigned SEs; ties go to the lowest index.
pub fn priority_region(running: &BTreeMap<u16, usize>) -> Option<(u16, usize)> {
    let mut best: Option<(u16, usize)> = None;
    for (&region, &size) in running {
        match best {
            Some((_, best_size)) if size <= best_size => {},
            _ => best = Some((region, size)),
        }
    }
    best
}

/// Candidate regions for a uniform draw: every non-empty region, padded —
/// once the field is large enough — with a second entry for regions well
/// above the high median of bucket sizes (or, when none are, for those at
/// or above it). The padding doubles those regions' weight.
pub fn region_plus_median(count: usize, running: &BTreeMap<u16, usize>) -> Vec<u16> {
    let mut regions: Vec<u16> = running.keys().copied().collect();
    if count <= 10 {
        return regions;
    }

    let sizes: Vec<usize> = running.values().copied().collect();
    let median = median_high(&sizes);
    let mut pad: Vec<u16> = running
        .iter()
        .filter(|&(_, &size)| size > median + 2)
        .map(|(&region, _)| region)
        .collect();
    if pad.is_empty() {
        pad = running
            .iter()
            .filter(|&(_, &size)| size >= median)
            .map(|(&region, _)| region)
            .collect();
    }
    debug!(?pad, median, "regions padded above the size median");
    regions.extend(pad);
    regions
}

/// Builds the bucket partition for an attendance set from the resolved
/// directory records, resolving each region name to its index through the
/// directory's region table (cached per name). Returns the partition and
/// the warm cache.
pub(crate) async fn build<D: DirectoryStore>(
    directory: &Arc<D>,
    policy: &RetryPolicy,
    attendees: &BTreeSet<String>,
    infos: &HashMap<String, SeInfo>,
) -> Result<(RegionBuckets, HashMap<String, u16>), PairingError> {
    let mut buckets = RegionBuckets::new();
    let mut cache: HashMap<String, u16> = HashMap::new();

    for alias in attendees {
        let info = infos.get(alias).ok_or_else(|| {
            PairingError::DirectoryIncomplete(format!("no directory record for {alias}"))
        })?;
        let index = match cache.get(&info.region) {
            Some(&idx) => idx,
            None => {
                let idx = retry(policy, "directory.region_index", || {
                    directory.region_index(&info.region)
                })
                .await?
                .ok_or_else(|| {
                    PairingError::DirectoryIncomplete(format!(
                        "region {:?} has no index",
                        info.region
                    ))
                })?;
                cache.insert(info.region.clone(), idx);
                idx
            },
        };
        buckets.insert(index, &info.region, alias);
    }

    debug!(regions = buckets.running_count().len(), total = buckets.total(), "region buckets built");
    Ok((buckets, cache))
}
