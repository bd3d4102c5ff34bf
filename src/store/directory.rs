// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{future::Future, path::Path, sync::atomic::Ordering};

use dashmap::DashMap;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    models::se::{SeInfo, VIP_REGION},
    store::StoreError,
};

/// Read-mostly SE directory: metadata lookup, the region-name → region-index
/// table, and auto-provisioning of unknown aliases.
pub trait DirectoryStore: Send + Sync + 'static {
    /// Looks up an SE by alias. `Ok(None)` means the alias is unknown (and a
    /// candidate for `register_unknown`), not a failure.
    fn lookup(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<Option<SeInfo>, StoreError>> + Send;

    /// Provisions a record for an unknown alias. The new record gets the
    /// next free directory index (or a random 6-digit one when the
    /// directory is empty) and the conservative VIP region/role defaults.
    fn register_unknown(
        &self,
        alias: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<SeInfo, StoreError>> + Send;

    /// Resolves a region name to its index. `Ok(None)` means the region is
    /// not in the table.
    fn region_index(
        &self,
        region: &str,
    ) -> impl Future<Output = Result<Option<u16>, StoreError>> + Send;
}

/// YAML shape for seeding a [`MemoryDirectory`].
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct DirectorySeed {
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
    #[serde(default)]
    pub ses: Vec<SeInfo>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RegionEntry {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Index")]
    pub index: u16,
}

/// In-memory [`DirectoryStore`]. The region table always knows the VIP
/// region so auto-provisioned records resolve.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    ses: DashMap<String, SeInfo>,
    regions: DashMap<String, u16>,
    next_idx: std::sync::atomic::AtomicU32,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let dir = Self::default();
        dir.regions.insert("VIP".to_string(), VIP_REGION);
        dir
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let dir = Self::new();
        for r in seed.regions {
            dir.regions.insert(r.region, r.index);
        }
        for se in seed.ses {
            dir.next_idx.fetch_max(se.se_idx + 1, Ordering::SeqCst);
            dir.ses.insert(se.se.clone(), se);
        }
        dir
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let seed: DirectorySeed = serde_yaml::from_str(&s)?;
        Ok(Self::from_seed(seed))
    }

    /// Adds or replaces a region table entry.
    pub fn insert_region(&self, region: &str, index: u16) {
        self.regions.insert(region.to_string(), index);
    }

    /// Adds or replaces an SE record directly (test/seed path).
    pub fn insert_se(&self, se: SeInfo) {
        self.next_idx.fetch_max(se.se_idx + 1, Ordering::SeqCst);
        self.ses.insert(se.se.clone(), se);
    }

    pub fn len(&self) -> usize {
        self.ses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ses.is_empty()
    }
}

impl DirectoryStore for MemoryDirectory {
    async fn lookup(&self, alias: &str) -> Result<Option<SeInfo>, StoreError> {
        Ok(self.ses.get(alias).map(|e| e.value().clone()))
    }

    async fn register_unknown(
        &self,
        alias: &str,
        display_name: &str,
    ) -> Result<SeInfo, StoreError> {
        let se_idx = if self.ses.is_empty() {
            rand::rng().random_range(100_000..=999_999)
        } else {
            self.next_idx.fetch_add(1, Ordering::SeqCst)
        };
        let info = SeInfo {
            se_idx,
            se: alias.to_string(),
            se_name: display_name.to_string(),
            region: "VIP".to_string(),
            sem: false,
            op: "VIP".to_string(),
        };
        info!(alias, se_idx, "provisioned unknown SE as VIP");
        self.ses.insert(alias.to_string(), info.clone());
        Ok(info)
    }

    async fn region_index(&self, region: &str) -> Result<Option<u16>, StoreError> {
        Ok(self.regions.get(region).map(|e| *e.value()))
    }
}
