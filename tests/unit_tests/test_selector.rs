// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use fuse_pairing_rs::{
    cfg::enums::RunMode,
    store::history::{HistoryStore, MemoryHistory},
    utils::parse_session_date,
};

use super::{aliases, scratch_dir, se, seeded_directory, test_engine};

/// A randomized attempt can dead-end on an unlucky draw even when a valid
/// pairing exists, so property tests scan a few seeds and assert on the
/// first clean completion.
const SEED_SCAN: std::ops::Range<u64> = 0..10;

fn cross_region_setup() -> Vec<(&'static str, u32, &'static str)> {
    vec![
        ("e1", 10, "US-East"),
        ("e2", 11, "US-East"),
        ("m1", 12, "EMEA"),
        ("m2", 13, "EMEA"),
        ("p1", 14, "APJ"),
        ("p2", 15, "APJ"),
    ]
}

#[tokio::test]
async fn same_seed_same_pairs() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let attendees: BTreeSet<String> = aliases(&["e1", "e2", "m1", "m2", "p1", "p2"]);

    let mut per_seed: Option<(u64, String)> = None;
    'seeds: for seed in SEED_SCAN {
        let mut outputs = Vec::new();
        for round in 0..2 {
            let dir = seeded_directory();
            for (alias, idx, region) in cross_region_setup() {
                dir.insert_se(se(alias, idx, region, false));
            }
            let history = Arc::new(MemoryHistory::new());
            let match_dir = scratch_dir(&format!("determinism-{seed}-{round}"));
            let mut engine =
                test_engine(dir, history, match_dir.clone(), seed);

            let run = engine
                .run(date, attendees.clone(), &Default::default(), RunMode::Live)
                .await;
            let Ok(filename) = run else {
                continue 'seeds;
            };
            outputs.push(std::fs::read_to_string(match_dir.join(&filename))?);
            std::fs::remove_dir_all(&match_dir)?;
        }
        assert_eq!(outputs[0], outputs[1], "seed {seed} was not reproducible");
        per_seed = Some((seed, outputs.remove(0)));
        break;
    }

    let (_, csv) = per_seed.expect("no seed in the scan range completed");
    assert!(csv.starts_with("SE1_NAME,SE1_CCO,SE2_CCO,SE2_NAME\n"));
    assert_eq!(csv.lines().count(), 4, "header plus three pairs");
    Ok(())
}

#[tokio::test]
async fn pairs_cross_regions() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let region_of = |alias: &str| match alias.chars().next() {
        Some('e') => "US-East",
        Some('m') => "EMEA",
        _ => "APJ",
    };

    for seed in SEED_SCAN {
        let dir = seeded_directory();
        for (alias, idx, region) in cross_region_setup() {
            dir.insert_se(se(alias, idx, region, false));
        }
        let history = Arc::new(MemoryHistory::new());
        let match_dir = scratch_dir(&format!("cross-region-{seed}"));
        let mut engine = test_engine(dir, Arc::clone(&history), match_dir.clone(), seed);

        let run = engine
            .run(
                date,
                aliases(&["e1", "e2", "m1", "m2", "p1", "p2"]),
                &Default::default(),
                RunMode::Live,
            )
            .await;
        if run.is_err() {
            continue;
        }

        for alias in ["e1", "e2", "m1", "m2", "p1", "p2"] {
            let partner = history.assignments(alias).await?["2024-06-01"].clone();
            assert_ne!(
                region_of(alias),
                region_of(&partner),
                "{alias} was paired inside its own region with {partner}"
            );
        }
        std::fs::remove_dir_all(&match_dir)?;
        return Ok(());
    }
    panic!("no seed in the scan range completed");
}

#[tokio::test]
async fn test_mode_leaves_stores_untouched() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let dir = seeded_directory();
    dir.insert_se(se("a", 10, "US-East", false));
    dir.insert_se(se("b", 11, "EMEA", false));

    let history = Arc::new(MemoryHistory::new());
    let match_dir = scratch_dir("test-mode");
    let mut engine = test_engine(dir, Arc::clone(&history), match_dir.clone(), 3);

    let outcome = engine
        .run(date, aliases(&["a", "b"]), &Default::default(), RunMode::Test)
        .await?;

    assert_eq!(outcome, "NA");
    assert!(history.assignments("a").await?.is_empty());
    assert!(
        !match_dir.exists(),
        "test mode must not create the match directory"
    );
    Ok(())
}
