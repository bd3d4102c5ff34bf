// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::BTreeSet, path::PathBuf, sync::Arc, time::Duration};

use fuse_pairing_rs::{
    engine::{EngineSettings, PairingEngine},
    models::se::SeInfo,
    store::{directory::MemoryDirectory, history::MemoryHistory, retry::RetryPolicy},
};
use rand::{SeedableRng, rngs::StdRng};

pub const HOST: &str = "fusebot";

/// Seeds worth scanning when a scenario's outcome depends on random draws;
/// an attempt can dead-end legitimately, so tests assert on the first seed
/// that completes.
pub const SEED_SCAN: std::ops::Range<u64> = 0..20;

pub fn se(alias: &str, idx: u32, region: &str, sem: bool) -> SeInfo {
    SeInfo {
        se_idx: idx,
        se: alias.to_string(),
        se_name: alias.to_uppercase(),
        region: region.to_string(),
        sem,
        op: if sem { "SEM" } else { "SE" }.to_string(),
    }
}

/// Directory with the standard region table and the session host.
pub fn seeded_directory() -> Arc<MemoryDirectory> {
    let dir = MemoryDirectory::new();
    dir.insert_region("SSEM", 0);
    dir.insert_region("US-East", 1);
    dir.insert_region("EMEA", 2);
    dir.insert_region("APJ", 3);
    dir.insert_region("US-West", 4);
    dir.insert_se(se(HOST, 1, "US-West", false));
    Arc::new(dir)
}

pub fn engine(
    directory: Arc<MemoryDirectory>,
    history: Arc<MemoryHistory>,
    match_dir: PathBuf,
    seed: u64,
) -> PairingEngine<MemoryDirectory, MemoryHistory, StdRng> {
    let settings = EngineSettings {
        host: HOST.to_string(),
        match_file_dir: match_dir,
        directory_workers: 10,
        max_resets: 5,
        repeat_waterline_months: 12,
    };
    let retry = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        backoff_factor: 2,
    };
    PairingEngine::new(directory, history, settings, retry, StdRng::seed_from_u64(seed))
}

pub fn aliases(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn scratch_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "fuse-pairing-integration-{tag}-{}",
        std::process::id()
    ))
}
