// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rand::{Rng, RngExt, seq::IndexedRandom};
use tracing::{debug, info, warn};

use crate::{
    engine::{
        Pair, PairingError, PairingEngine, buckets,
        buckets::RegionBuckets,
        frequency, host,
        reset::Snapshot,
    },
    models::se::{SeClass, SSEM_REGION, SeInfo, VIP_REGION},
    store::{
        directory::DirectoryStore,
        history::HistoryStore,
        retry::retry,
    },
    utils::{STORAGE_DATE_FMT, waterline_target},
};

/// Mutable state of one selection attempt. Created fresh per attempt (and
/// per reset) and discarded at the end.
pub(crate) struct SelectorState {
    pub buckets: RegionBuckets,
    /// Unassigned attendees.
    pub attendees: BTreeSet<String>,
    /// Remaining mid-tier managers.
    pub sem_set: BTreeSet<String>,
    /// Remaining senior leaders (region 0).
    pub zero_set: BTreeSet<String>,
    /// Remaining VIP guests (region 100).
    pub vips: BTreeSet<String>,
    /// Remaining high-frequency attendees.
    pub top_ses: BTreeSet<String>,
    /// Resolved directory records for everyone in play.
    pub infos: HashMap<String, SeInfo>,
    /// Region name to index, warmed during bucket build.
    pub region_cache: HashMap<String, u16>,
    /// Pairs committed so far, in selection order.
    pub pairs: Vec<Pair>,
}

impl SelectorState {
    /// Removes an SE from its bucket and every auxiliary set once selected.
    fn retire(&mut self, alias: &str, region: u16) {
        self.buckets.remove_alias(region, alias);
        self.attendees.remove(alias);
        self.sem_set.remove(alias);
        self.top_ses.remove(alias);
        self.vips.remove(alias);
        self.zero_set.remove(alias);
    }
}

/// Result of one full selection attempt.
pub(crate) enum SelectOutcome {
    /// Everyone paired; the list partitions the attendance set.
    Complete(Vec<Pair>),
    /// Dead end; the reset controller should restore and retry.
    Reset,
}

/// Result of one loop iteration.
enum Step {
    Paired,
    Finished,
    DeadEnd,
}

/// Outcome of the repeat-pair repair path.
enum Repair {
    /// The waterline admitted the old repeat.
    Accept,
    /// A fresh partner and its region.
    Replace(String, u16),
    DeadEnd,
}

fn choose_from_set<R: Rng>(rng: &mut R, set: &BTreeSet<String>) -> Option<String> {
    if set.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..set.len());
    set.iter().nth(idx).cloned()
}

/// Same-region pairs are never allowed mid-repair, and neither is matching
/// a VIP with senior leadership in either direction.
fn regions_conflict(a: u16, b: u16) -> bool {
    a == b
        || (a == VIP_REGION && b == SSEM_REGION)
        || (a == SSEM_REGION && b == VIP_REGION)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl<D, H, R> PairingEngine<D, H, R>
where
    D: DirectoryStore,
    H: HistoryStore,
    R: Rng + Send,
{
    /// Builds the selector state for one attempt: restores the attendance
    /// set from the snapshot, injects the host on odd parity, and builds the
    /// region partition and the frequency analysis concurrently.
    pub(crate) async fn prepare_attempt(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<SelectorState, PairingError> {
        let mut attendees = snapshot.attendees.clone();
        host::inject_host(&mut attendees, &self.settings.host);

        let infos = snapshot.infos.clone();

        let (bucket_build, counts) = tokio::join!(
            buckets::build(&self.directory, &self.retry, &attendees, &infos),
            frequency::build_counts(&self.history, &self.retry, &attendees),
        );
        let (region_buckets, region_cache) = bucket_build?;
        let counts = counts?;

        let percentile = frequency::percentile_80(&counts);
        let top_ses = frequency::top_ses(&counts, percentile);
        info!(percentile, top = top_ses.len(), "assignment percentile computed");

        let sem_set: BTreeSet<String> = attendees
            .iter()
            .filter(|a| infos.get(*a).is_some_and(|i| i.sem))
            .cloned()
            .collect();
        if sem_set.is_empty() {
            debug!("no SEMs to match");
        } else {
            info!(sems = sem_set.len(), "SEMs attending");
        }
        let zero_set = region_buckets.aliases_in(SSEM_REGION);
        let vips = region_buckets.aliases_in(VIP_REGION);

        Ok(SelectorState {
            buckets: region_buckets,
            attendees,
            sem_set,
            zero_set,
            vips,
            top_ses,
            infos,
            region_cache,
            pairs: Vec::new(),
        })
    }

    /// Drives the iteration until the attendance set is exhausted or a dead
    /// end forces a reset.
    pub(crate) async fn select_pairs(
        &mut self,
        st: &mut SelectorState,
        date: NaiveDate,
    ) -> Result<SelectOutcome, PairingError> {
        loop {
            match self.step(st, date).await? {
                Step::Paired => {},
                Step::Finished => {
                    return Ok(SelectOutcome::Complete(std::mem::take(&mut st.pairs)));
                },
                Step::DeadEnd => return Ok(SelectOutcome::Reset),
            }
        }
    }

    /// One iteration: bookkeeping, feasibility gate, SE1, SE2, repeat guard,
    /// commit.
    async fn step(
        &mut self,
        st: &mut SelectorState,
        date: NaiveDate,
    ) -> Result<Step, PairingError> {
        let count = st.buckets.total();
        if count == 0 {
            info!("no more SEs remaining");
            return Ok(Step::Finished);
        }
        debug!(count, "SEs remaining");

        let running = st.buckets.running_count();
        let Some((priority_region, priority_size)) = buckets::priority_region(&running)
        else {
            return Ok(Step::Finished);
        };

        // Does the priority region hold exactly half of everyone left?
        let priority_region_select =
            running.len() > 2 && priority_size == count - priority_size;
        if priority_region_select {
            warn!(
                region = priority_region,
                "priority region holds half the remaining SEs"
            );
        }

        st.sem_set = st.sem_set.intersection(&st.attendees).cloned().collect();
        st.zero_set = st.buckets.aliases_in(SSEM_REGION);
        let leader_percent = if st.attendees.is_empty() {
            0.0
        } else {
            round2(
                (st.zero_set.len() + st.sem_set.len()) as f64
                    / st.attendees.len() as f64
                    * 100.0,
            )
        };
        debug!(leader_percent, "leadership share");

        if running.len() == 1 {
            warn!(
                region = priority_region,
                remaining = count,
                "all remaining SEs share one region, triggering reset"
            );
            return Ok(Step::DeadEnd);
        }

        let region_pool = buckets::region_plus_median(count, &running);

        // --- SE1 ---
        let Some((se1, se1_region)) = self
            .pick_se1(
                st,
                &region_pool,
                priority_region,
                priority_region_select,
                leader_percent,
            )
            .await?
        else {
            warn!("no SE1 candidate, triggering reset");
            return Ok(Step::DeadEnd);
        };
        let se1_class = SeClass::classify(&se1, se1_region, &st.zero_set, &st.sem_set);
        info!(se1 = %se1, region = se1_region, class = ?se1_class, "SE1 selected");
        st.retire(&se1, se1_region);

        // --- SE2 ---
        let running = st.buckets.running_count();
        let region_pool = buckets::region_plus_median(count, &running);
        let Some((mut se2, mut se2_region)) = self
            .pick_se2_candidate(st, se1_class, se1_region, &region_pool)
            .await?
        else {
            warn!(se1 = %se1, "no SE2 candidate, triggering reset");
            return Ok(Step::DeadEnd);
        };

        // --- repeat guard ---
        let se2_assignments = retry(&self.retry, "history.assignments", || {
            self.history.assignments(&se2)
        })
        .await?;
        if se2_assignments.values().any(|partner| partner == &se1) {
            info!(se1 = %se1, se2 = %se2, "previously paired, repairing");
            match self.repair_repeat(st, date, &se1, se1_region, &se2).await? {
                Repair::Accept => {},
                Repair::Replace(alias, region) => {
                    se2 = alias;
                    se2_region = region;
                },
                Repair::DeadEnd => return Ok(Step::DeadEnd),
            }
        }

        let se2_class = SeClass::classify(&se2, se2_region, &st.zero_set, &st.sem_set);
        info!(se2 = %se2, region = se2_region, class = ?se2_class, "SE2 selected");
        st.retire(&se2, se2_region);

        st.pairs.push(Pair {
            first: se1,
            second: se2,
        });
        Ok(Step::Paired)
    }

    /// SE1 selection rules, first match wins: VIPs leave first, then the
    /// high-frequency cohort while leadership is scarce, then leadership
    /// when it is over-represented, then the priority region, then a
    /// weighted-random region.
    async fn pick_se1(
        &mut self,
        st: &mut SelectorState,
        region_pool: &[u16],
        priority_region: u16,
        priority_region_select: bool,
        leader_percent: f64,
    ) -> Result<Option<(String, u16)>, PairingError> {
        if let Some(vip) = st.buckets.choose_alias(VIP_REGION, &mut self.rng) {
            info!(vip = %vip, "VIP attending, selecting first");
            return Ok(Some((vip, VIP_REGION)));
        }

        if !st.top_ses.is_empty() && leader_percent <= 30.0 {
            if let Some(alias) = choose_from_set(&mut self.rng, &st.top_ses) {
                let region = self.region_index_of(st, &alias).await?;
                debug!(alias = %alias, region, "SE1 from the high-frequency cohort");
                return Ok(Some((alias, region)));
            }
        }

        if leader_percent > 20.0 {
            let leaders: BTreeSet<String> =
                st.zero_set.union(&st.sem_set).cloned().collect();
            if let Some(alias) = choose_from_set(&mut self.rng, &leaders) {
                let region = self.region_index_of(st, &alias).await?;
                info!(alias = %alias, leader_percent, "high leadership share, selecting a leader");
                return Ok(Some((alias, region)));
            }
        }

        if priority_region_select {
            if let Some(alias) = st.buckets.choose_alias(priority_region, &mut self.rng)
            {
                info!(alias = %alias, region = priority_region, "priority region selection");
                return Ok(Some((alias, priority_region)));
            }
        }

        let Some(&region) = region_pool.choose(&mut self.rng) else {
            return Ok(None);
        };
        Ok(st
            .buckets
            .choose_alias(region, &mut self.rng)
            .map(|alias| (alias, region)))
    }

    /// SE2 candidate by SE1's class. VIPs and leaders are matched with
    /// regular SEs; a regular SE1 draws a different region first.
    async fn pick_se2_candidate(
        &mut self,
        st: &mut SelectorState,
        se1_class: SeClass,
        se1_region: u16,
        region_pool: &[u16],
    ) -> Result<Option<(String, u16)>, PairingError> {
        match se1_class {
            SeClass::Vip | SeClass::Ssem | SeClass::Sem => {
                let exclude_vips = se1_class == SeClass::Vip;
                let pool: BTreeSet<String> = st
                    .attendees
                    .iter()
                    .filter(|a| {
                        !st.sem_set.contains(*a)
                            && !st.zero_set.contains(*a)
                            && (!exclude_vips || !st.vips.contains(*a))
                    })
                    .cloned()
                    .collect();
                let Some(alias) = choose_from_set(&mut self.rng, &pool) else {
                    return Ok(None);
                };
                let region = self.region_index_of(st, &alias).await?;
                Ok(Some((alias, region)))
            },
            SeClass::Regular => {
                let regions: Vec<u16> = region_pool
                    .iter()
                    .copied()
                    .filter(|r| *r != se1_region)
                    .collect();
                let Some(&region) = regions.choose(&mut self.rng) else {
                    return Ok(None);
                };
                Ok(st
                    .buckets
                    .choose_alias(region, &mut self.rng)
                    .map(|alias| (alias, region)))
            },
        }
    }

    /// SE1 and the tentative SE2 have met before. With only SE2 left, the
    /// waterline decides; otherwise draw a replacement from the SEs SE1 has
    /// never been paired with, skipping region conflicts.
    async fn repair_repeat(
        &mut self,
        st: &mut SelectorState,
        date: NaiveDate,
        se1: &str,
        se1_region: u16,
        se2: &str,
    ) -> Result<Repair, PairingError> {
        let se1_assignments = retry(&self.retry, "history.assignments", || {
            self.history.assignments(se1)
        })
        .await?;

        if st.attendees.len() == 1 {
            let target = waterline_target(date, self.settings.repeat_waterline_months);
            let last = se1_assignments
                .iter()
                .filter(|(_, partner)| partner.as_str() == se2)
                .filter_map(|(d, _)| {
                    NaiveDate::parse_from_str(d, STORAGE_DATE_FMT).ok()
                })
                .max();
            return Ok(match last {
                Some(d) if d >= target => {
                    warn!(se1, se2, last = %d, "repeat newer than the waterline, triggering reset");
                    Repair::DeadEnd
                },
                _ => {
                    info!(se1, se2, "repeat older than the waterline, accepting");
                    Repair::Accept
                },
            });
        }

        let previous: BTreeSet<&String> = se1_assignments.values().collect();
        let mut matchables: Vec<String> = st
            .attendees
            .iter()
            .filter(|a| !previous.contains(a))
            .cloned()
            .collect();
        info!(se1, candidates = matchables.len(), "fresh partners available");

        while !matchables.is_empty() {
            let idx = self.rng.random_range(0..matchables.len());
            let candidate = matchables.swap_remove(idx);
            let region = self.region_index_of(st, &candidate).await?;
            if regions_conflict(se1_region, region) {
                debug!(se1, candidate = %candidate, "region conflict, trying another");
                continue;
            }
            return Ok(Repair::Replace(candidate, region));
        }

        warn!(se1, "no fresh partners remain, triggering reset");
        Ok(Repair::DeadEnd)
    }

    /// Region index for an attendee: resolved record plus the per-run
    /// region-name cache backed by the directory's region table.
    async fn region_index_of(
        &self,
        st: &mut SelectorState,
        alias: &str,
    ) -> Result<u16, PairingError> {
        let region = st
            .infos
            .get(alias)
            .map(|i| i.region.clone())
            .ok_or_else(|| {
                PairingError::DirectoryIncomplete(format!(
                    "no directory record for {alias}"
                ))
            })?;
        if let Some(&idx) = st.region_cache.get(&region) {
            return Ok(idx);
        }
        let idx = retry(&self.retry, "directory.region_index", || {
            self.directory.region_index(&region)
        })
        .await?
        .ok_or_else(|| {
            PairingError::DirectoryIncomplete(format!("region {region:?} has no index"))
        })?;
        st.region_cache.insert(region, idx);
        Ok(idx)
    }
}
