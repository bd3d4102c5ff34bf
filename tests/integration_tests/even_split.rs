// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use fuse_pairing_rs::{
    cfg::enums::RunMode,
    store::history::{HistoryStore, MemoryHistory},
    utils::parse_session_date,
};
use serial_test::serial;

use crate::integration_tests::common::{aliases, engine, scratch_dir, se, seeded_directory};

/// Four SEs split evenly over two regions pair straight across; neither
/// pair stays inside a region and the host is never involved.
#[tokio::test]
#[serial]
async fn even_attendance_pairs_across_regions() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let dir = seeded_directory();
    dir.insert_se(se("a1", 10, "US-East", false));
    dir.insert_se(se("b1", 11, "US-East", false));
    dir.insert_se(se("a2", 12, "EMEA", false));
    dir.insert_se(se("b2", 13, "EMEA", false));

    let history = Arc::new(MemoryHistory::new());
    let match_dir = scratch_dir("even-split");
    let mut eng = engine(dir, Arc::clone(&history), match_dir.clone(), 11);

    let filename = eng
        .run(
            date,
            aliases(&["a1", "a2", "b1", "b2"]),
            &Default::default(),
            RunMode::Live,
        )
        .await?;
    assert_eq!(filename, "2024_06_01-matches.csv");

    let east = ["a1", "b1"];
    for alias in ["a1", "b1"] {
        let partner = history.assignments(alias).await?["2024-06-01"].clone();
        assert!(
            !east.contains(&partner.as_str()),
            "{alias} must pair into EMEA, got {partner}"
        );
    }
    assert!(history.assignments("fusebot").await?.is_empty());

    let csv = std::fs::read_to_string(match_dir.join(&filename))?;
    assert_eq!(csv.lines().count(), 3, "header plus two pairs");
    std::fs::remove_dir_all(&match_dir)?;
    Ok(())
}
