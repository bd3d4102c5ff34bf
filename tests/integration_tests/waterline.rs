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

fn two_person_directory() -> Arc<fuse_pairing_rs::store::directory::MemoryDirectory> {
    let dir = seeded_directory();
    dir.insert_se(se("a", 10, "US-East", false));
    dir.insert_se(se("b", 11, "EMEA", false));
    dir
}

/// With only two attendees and a pairing from four years ago, the waterline
/// admits the repeat.
#[tokio::test]
#[serial]
async fn old_repeat_is_admitted() -> Result<()> {
    let date = parse_session_date("2024-01-01")?;
    let history = Arc::new(MemoryHistory::new());
    history.record_pair("2020-01-01", "a", "b").await?;

    let match_dir = scratch_dir("waterline-old");
    let mut eng = engine(two_person_directory(), Arc::clone(&history), match_dir.clone(), 2);

    eng.run(date, aliases(&["a", "b"]), &Default::default(), RunMode::Live)
        .await?;

    assert_eq!(history.assignments("a").await?["2024-01-01"], "b");
    assert_eq!(history.assignments("b").await?["2024-01-01"], "a");
    std::fs::remove_dir_all(&match_dir)?;
    Ok(())
}

/// The same pair met six months ago: inside the waterline, so the run can
/// only exhaust its resets.
#[tokio::test]
#[serial]
async fn recent_repeat_is_rejected() -> Result<()> {
    let date = parse_session_date("2024-01-01")?;
    let history = Arc::new(MemoryHistory::new());
    history.record_pair("2023-06-01", "a", "b").await?;

    let match_dir = scratch_dir("waterline-recent");
    let mut eng = engine(two_person_directory(), Arc::clone(&history), match_dir.clone(), 2);

    let err = eng
        .run(date, aliases(&["a", "b"]), &Default::default(), RunMode::Live)
        .await
        .expect_err("a repeat inside the waterline must be infeasible");
    assert!(matches!(err, PairingError::Infeasible(5)));
    assert!(history.assignments("a").await?.get("2024-01-01").is_none());
    Ok(())
}
