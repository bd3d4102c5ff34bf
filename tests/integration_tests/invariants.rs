// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use fuse_pairing_rs::{
    cfg::enums::RunMode,
    store::{
        directory::DirectoryStore,
        history::{HistoryStore, MemoryHistory},
    },
    utils::parse_session_date,
};
use serial_test::serial;

use crate::integration_tests::common::{
    HOST, SEED_SCAN, engine, scratch_dir, se, seeded_directory,
};

/// A realistic mixed session: twelve known SEs over four regions (two of
/// them SEMs), one alias nobody has heard of, odd parity. A successful run
/// must partition everyone into disjoint symmetric pairs and leave the
/// unknown alias provisioned in the directory.
#[tokio::test]
#[serial]
async fn full_session_partitions_attendance() -> Result<()> {
    let date = parse_session_date("2024-06-01")?;
    let seeds: &[(&str, &str, bool)] = &[
        ("e1", "US-East", false),
        ("e2", "US-East", false),
        ("e3", "US-East", false),
        ("m1", "EMEA", true),
        ("m2", "EMEA", false),
        ("m3", "EMEA", false),
        ("p1", "APJ", false),
        ("p2", "APJ", false),
        ("p3", "APJ", false),
        ("w1", "US-West", true),
        ("w2", "US-West", false),
        ("w3", "US-West", false),
    ];

    for seed in SEED_SCAN {
        let dir = seeded_directory();
        for (i, (alias, region, sem)) in seeds.iter().enumerate() {
            dir.insert_se(se(alias, 10 + i as u32, region, *sem));
        }

        let history = Arc::new(MemoryHistory::new());
        let match_dir = scratch_dir(&format!("invariants-{seed}"));
        let mut eng = engine(Arc::clone(&dir), Arc::clone(&history), match_dir.clone(), seed);

        let mut attendees: BTreeSet<String> =
            seeds.iter().map(|(a, _, _)| a.to_string()).collect();
        attendees.insert("mystery".to_string());

        let run = eng
            .run(date, attendees.clone(), &Default::default(), RunMode::Live)
            .await;
        let Ok(filename) = run else { continue };
        assert_eq!(filename, "2024_06_01-matches.csv");

        // odd parity: the host must have been injected
        let mut everyone = attendees;
        everyone.insert(HOST.to_string());

        let mut seen: BTreeSet<String> = BTreeSet::new();
        for alias in &everyone {
            let assignments = history.assignments(alias).await?;
            let partner = assignments
                .get("2024-06-01")
                .unwrap_or_else(|| panic!("{alias} was left unpaired"));
            assert_ne!(partner, alias);
            assert!(everyone.contains(partner), "partner {partner} is a stranger");

            // bidirectional symmetry
            let back = history.assignments(partner).await?["2024-06-01"].clone();
            assert_eq!(&back, alias, "history symmetry broken for {alias}");
            seen.insert(alias.clone());
        }
        assert_eq!(seen.len(), 14, "every attendee appears exactly once");

        let csv = std::fs::read_to_string(match_dir.join(&filename))?;
        assert_eq!(csv.lines().count(), 8, "header plus seven pairs");

        // the unknown alias was provisioned with the VIP defaults
        let provisioned = dir
            .lookup("mystery")
            .await?
            .expect("mystery must resolve after the run");
        assert_eq!(provisioned.region, "VIP");

        std::fs::remove_dir_all(&match_dir)?;
        return Ok(());
    }
    panic!("no seed in the scan range completed");
}
