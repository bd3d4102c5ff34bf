//! The pairing engine: region bucketing, frequency analysis, the selection
//! loop, bounded reset recovery, and match persistence.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Region-index partition of the attendance set.
pub mod buckets;
/// Historical pairing counts and the top-SE cohort.
pub mod frequency;
/// Odd-parity host injection.
pub mod host;
/// Snapshot-based reset recovery around the selection loop.
pub mod reset;
/// The SE1/SE2 selection loop.
pub mod selector;
/// History persistence and match CSV emission.
pub mod writer;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::PathBuf,
    sync::Arc,
};

use chrono::NaiveDate;
use rand::Rng;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{
    cfg::{config::Config, enums::RunMode},
    models::{roster::RosterError, se::SeInfo},
    store::{
        StoreError,
        directory::DirectoryStore,
        history::HistoryStore,
        retry::{RetryPolicy, retry},
    },
};

/// Sentinel returned instead of a filename when running in test mode.
pub const TEST_SENTINEL: &str = "NA";

/// Errors a pairing run can surface to its caller.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The uploaded roster cannot be parsed; nothing was modified.
    #[error("malformed roster: {0}")]
    MalformedRoster(#[from] RosterError),
    /// A store stayed unreachable through the retry budget.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Directory data is internally inconsistent (a record or region index
    /// that should exist does not).
    #[error("directory data incomplete: {0}")]
    DirectoryIncomplete(String),
    /// The reset budget was exhausted without a full pairing.
    #[error("pairing infeasible after {0} resets")]
    Infeasible(u32),
    /// Pairs were selected and the CSV written, but history persistence
    /// failed; the operator must reconcile manually.
    #[error("matches written to {csv_file} but history persistence failed")]
    PersistFailed { csv_file: String },
    /// Match file could not be written.
    #[error("failed writing match file: {0}")]
    Io(#[from] std::io::Error),
}

impl PairingError {
    /// HTTP status class for external consumers.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedRoster(_) => 400,
            _ => 500,
        }
    }
}

/// One committed pair, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub first: String,
    pub second: String,
}

impl Pair {
    pub fn contains(&self, alias: &str) -> bool {
        self.first == alias || self.second == alias
    }

    pub fn partner_of(&self, alias: &str) -> Option<&str> {
        if self.first == alias {
            Some(&self.second)
        } else if self.second == alias {
            Some(&self.first)
        } else {
            None
        }
    }
}

/// Engine knobs, typically derived from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Alias injected on odd attendance.
    pub host: String,
    /// Directory for match CSV files.
    pub match_file_dir: PathBuf,
    /// Concurrent directory lookups during bulk resolution.
    pub directory_workers: usize,
    /// Reset budget before a run fails infeasible.
    pub max_resets: u32,
    /// Repeat-pair waterline, in months before the session date.
    pub repeat_waterline_months: u32,
}

impl EngineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            host: cfg.session.host.clone(),
            match_file_dir: cfg.session.match_file_dir.clone(),
            directory_workers: cfg.selection.directory_workers,
            max_resets: cfg.selection.max_resets,
            repeat_waterline_months: cfg.session.repeat_waterline_months,
        }
    }
}

/// The pairing engine. Generic over its store handles (unit tests inject
/// in-memory fakes) and over the randomness source (tests inject a seeded
/// RNG; every uniform pick in the selection loop consults it).
pub struct PairingEngine<D, H, R> {
    pub(crate) directory: Arc<D>,
    pub(crate) history: Arc<H>,
    pub(crate) settings: EngineSettings,
    pub(crate) retry: RetryPolicy,
    pub(crate) rng: R,
}

impl<D, H, R> PairingEngine<D, H, R>
where
    D: DirectoryStore,
    H: HistoryStore,
    R: Rng + Send,
{
    pub fn new(
        directory: Arc<D>,
        history: Arc<H>,
        settings: EngineSettings,
        retry: RetryPolicy,
        rng: R,
    ) -> Self {
        Self {
            directory,
            history,
            settings,
            retry,
            rng,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Runs one full pairing session for `date`.
    ///
    /// `attendees` is the effective attendance set from intake;
    /// `display_names` (from the roster) seed auto-provisioned directory
    /// records. Returns the written CSV filename, or [`TEST_SENTINEL`] in
    /// test mode (no store mutation, no file).
    pub async fn run(
        &mut self,
        date: NaiveDate,
        attendees: BTreeSet<String>,
        display_names: &BTreeMap<String, String>,
        mode: RunMode,
    ) -> Result<String, PairingError> {
        info!(%date, attendees = attendees.len(), %mode, "pairing run starting");

        let snapshot = self.capture_snapshot(&attendees, display_names).await?;
        let pairs = reset::run_with_resets(self, &snapshot, date).await?;
        info!(pairs = pairs.len(), "selection complete");

        if mode.is_test() {
            info!("test mode: skipping history writes and CSV");
            return Ok(TEST_SENTINEL.to_string());
        }

        writer::persist_and_write(
            &self.history,
            &self.retry,
            &self.settings.match_file_dir,
            date,
            &pairs,
            &snapshot.infos,
        )
        .await
    }

    /// Resolves the attendance set (plus the host) against the directory
    /// before the first selection step. The result is immutable for the
    /// rest of the run and is what resets restore from.
    async fn capture_snapshot(
        &self,
        attendees: &BTreeSet<String>,
        display_names: &BTreeMap<String, String>,
    ) -> Result<reset::Snapshot, PairingError> {
        let mut want = attendees.clone();
        want.insert(self.settings.host.clone());
        let infos = self.resolve_all(&want, display_names).await?;
        Ok(reset::Snapshot {
            attendees: attendees.clone(),
            infos,
        })
    }

    /// Bulk directory resolution on a bounded worker pool. Unknown aliases
    /// are auto-provisioned with their roster display name so every
    /// attendee resolves.
    async fn resolve_all(
        &self,
        aliases: &BTreeSet<String>,
        display_names: &BTreeMap<String, String>,
    ) -> Result<HashMap<String, SeInfo>, PairingError> {
        let mut pending = aliases.iter().cloned().collect::<Vec<_>>().into_iter();
        let mut workers: JoinSet<Result<SeInfo, StoreError>> = JoinSet::new();
        let mut infos = HashMap::with_capacity(aliases.len());

        loop {
            while workers.len() < self.settings.directory_workers {
                let Some(alias) = pending.next() else { break };
                let directory = Arc::clone(&self.directory);
                let policy = self.retry;
                let name = display_names
                    .get(&alias)
                    .cloned()
                    .unwrap_or_else(|| alias.clone());
                workers.spawn(async move {
                    let found = retry(&policy, "directory.lookup", || {
                        directory.lookup(&alias)
                    })
                    .await?;
                    match found {
                        Some(info) => Ok(info),
                        None => {
                            warn!(alias = %alias, "unknown SE, provisioning");
                            retry(&policy, "directory.register_unknown", || {
                                directory.register_unknown(&alias, &name)
                            })
                            .await
                        },
                    }
                });
            }

            match workers.join_next().await {
                Some(joined) => {
                    let info = joined.map_err(|e| StoreError::Unavailable {
                        op: "directory.resolve".to_string(),
                        attempts: 1,
                        last: format!("worker task failed: {e}"),
                    })??;
                    infos.insert(info.se.clone(), info);
                },
                None => break,
            }
        }

        info!(resolved = infos.len(), "attendance set resolved against directory");
        Ok(infos)
    }
}
