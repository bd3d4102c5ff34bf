// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::BTreeMap, future::Future, path::Path};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Durable per-SE pairing history: `date key -> partner alias`, symmetric
/// across both partners of a recorded pair.
pub trait HistoryStore: Send + Sync + 'static {
    /// All recorded assignments for an alias. Unknown aliases have an empty
    /// history.
    fn assignments(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, StoreError>> + Send;

    /// Records a pair for a date, upserting both directions. The two writes
    /// are independent; a torn write is repaired by the next successful run.
    fn record_pair(
        &self,
        date_key: &str,
        a: &str,
        b: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Number of recorded assignments for an alias.
    fn match_count(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// YAML shape for seeding and dumping a [`MemoryHistory`].
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct HistorySeed {
    #[serde(default)]
    pub matches: Vec<HistoryEntry>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HistoryEntry {
    #[serde(rename = "SE")]
    pub se: String,
    #[serde(default)]
    pub assignments: BTreeMap<String, String>,
}

/// In-memory [`HistoryStore`].
#[derive(Debug, Default)]
pub struct MemoryHistory {
    matches: DashMap<String, BTreeMap<String, String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: HistorySeed) -> Self {
        let store = Self::new();
        for entry in seed.matches {
            store.matches.insert(entry.se, entry.assignments);
        }
        store
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let seed: HistorySeed = serde_yaml::from_str(&s)?;
        Ok(Self::from_seed(seed))
    }

    /// Serializes the full store back to the seed shape, sorted by alias.
    pub fn dump(&self) -> HistorySeed {
        let mut matches: Vec<HistoryEntry> = self
            .matches
            .iter()
            .map(|e| HistoryEntry {
                se: e.key().clone(),
                assignments: e.value().clone(),
            })
            .collect();
        matches.sort_by(|a, b| a.se.cmp(&b.se));
        HistorySeed { matches }
    }
}

impl HistoryStore for MemoryHistory {
    async fn assignments(
        &self,
        alias: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .matches
            .get(alias)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn record_pair(
        &self,
        date_key: &str,
        a: &str,
        b: &str,
    ) -> Result<(), StoreError> {
        self.matches
            .entry(a.to_string())
            .or_default()
            .insert(date_key.to_string(), b.to_string());
        self.matches
            .entry(b.to_string())
            .or_default()
            .insert(date_key.to_string(), a.to_string());
        Ok(())
    }

    async fn match_count(&self, alias: &str) -> Result<usize, StoreError> {
        Ok(self.matches.get(alias).map(|e| e.value().len()).unwrap_or(0))
    }
}
