// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rand::Rng;
use tracing::warn;

use crate::{
    engine::{Pair, PairingError, PairingEngine, selector::SelectOutcome},
    models::se::SeInfo,
    store::{directory::DirectoryStore, history::HistoryStore},
};

/// Immutable state captured before the first selection step. Resets restore
/// the attendance set from here; the resolved directory list never changes
/// within a run.
pub(crate) struct Snapshot {
    /// Effective attendance set, before host injection.
    pub attendees: BTreeSet<String>,
    /// Resolved directory records for the attendees and the host.
    pub infos: HashMap<String, SeInfo>,
}

/// Runs selection attempts until one completes, spending at most the
/// configured reset budget on dead ends. Partial pairs from a failed
/// attempt are discarded wholesale; nothing was persisted.
pub(crate) async fn run_with_resets<D, H, R>(
    engine: &mut PairingEngine<D, H, R>,
    snapshot: &Snapshot,
    date: NaiveDate,
) -> Result<Vec<Pair>, PairingError>
where
    D: DirectoryStore,
    H: HistoryStore,
    R: Rng + Send,
{
    let mut resets = 0u32;
    loop {
        let mut state = engine.prepare_attempt(snapshot).await?;
        match engine.select_pairs(&mut state, date).await? {
            SelectOutcome::Complete(pairs) => return Ok(pairs),
            SelectOutcome::Reset => {
                if resets == engine.settings.max_resets {
                    warn!(resets, "reset budget exhausted, giving up");
                    return Err(PairingError::Infeasible(resets));
                }
                resets += 1;
                warn!(resets, "selection dead-ended, restoring from snapshot");
            },
        }
    }
}
