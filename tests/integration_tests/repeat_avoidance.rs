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

use crate::integration_tests::common::{
    HOST, SEED_SCAN, aliases, engine, scratch_dir, se, seeded_directory,
};

/// `a` and `b` met six months ago, which is inside the waterline, so the
/// only admissible outcome is (a, c) and (b, host).
#[tokio::test]
#[serial]
async fn recent_repeat_is_avoided() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;

    for seed in SEED_SCAN {
        let dir = seeded_directory();
        dir.insert_se(se("a", 10, "US-East", false));
        dir.insert_se(se("b", 11, "EMEA", false));
        dir.insert_se(se("c", 12, "EMEA", false));

        let history = Arc::new(MemoryHistory::new());
        history.record_pair("2024-01-01", "a", "b").await?;

        let match_dir = scratch_dir(&format!("repeat-{seed}"));
        let mut eng = engine(dir, Arc::clone(&history), match_dir.clone(), seed);

        let run = eng
            .run(date, aliases(&["a", "b", "c"]), &Default::default(), RunMode::Live)
            .await;
        if run.is_err() {
            // an unlucky draw order can dead-end; the next seed will land
            continue;
        }

        assert_eq!(history.assignments("a").await?["2024-06-01"], "c");
        assert_eq!(history.assignments("b").await?["2024-06-01"], HOST);
        // the January pairing is still on record
        assert_eq!(history.assignments("a").await?["2024-01-01"], "b");
        std::fs::remove_dir_all(&match_dir)?;
        return Ok(());
    }
    panic!("no seed in the scan range completed");
}
