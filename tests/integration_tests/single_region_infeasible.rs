// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use fuse_pairing_rs::{
    cfg::enums::RunMode,
    engine::PairingError,
    store::history::{HistoryStore, MemoryHistory},
    utils::parse_session_date,
};
use serial_test::serial;

use crate::integration_tests::common::{aliases, engine, scratch_dir, se, seeded_directory};

/// Everyone in one region can never pair across regions: every attempt
/// trips the feasibility gate, the reset budget drains, and the run fails
/// with 500 semantics leaving the stores untouched.
#[tokio::test]
#[serial]
async fn single_region_exhausts_resets() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let dir = seeded_directory();
    for (i, alias) in ["a", "b", "c", "d"].iter().enumerate() {
        dir.insert_se(se(alias, 10 + i as u32, "US-East", false));
    }

    let history = Arc::new(MemoryHistory::new());
    let match_dir = scratch_dir("single-region");
    let mut eng = engine(dir, Arc::clone(&history), match_dir.clone(), 1);

    let err = eng
        .run(
            date,
            aliases(&["a", "b", "c", "d"]),
            &Default::default(),
            RunMode::Live,
        )
        .await
        .expect_err("a one-region attendance set must be infeasible");

    match &err {
        PairingError::Infeasible(resets) => assert_eq!(*resets, 5),
        other => panic!("expected Infeasible, got {other:?}"),
    }
    assert_eq!(err.http_status(), 500);

    // nothing was persisted and no CSV appeared
    for alias in ["a", "b", "c", "d"] {
        assert!(history.assignments(alias).await?.is_empty());
    }
    assert!(!match_dir.exists());
    Ok(())
}
