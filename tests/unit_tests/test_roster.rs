// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use fuse_pairing_rs::models::roster::{RosterError, parse_roster};

use super::load_fixture;

const FIXTURE: &str = "tests/unit_tests/fixtures/roster/attendance.csv";

#[test]
fn fixture_parses_despite_bom() -> Result<()> {
    let text = load_fixture(FIXTURE)?;
    assert!(text.starts_with('\u{feff}'), "fixture must carry a BOM");

    let parsed = parse_roster(&text)?;
    // the second jdoe row demotes the earlier Accepted to Tentative
    assert!(parsed.record.tentative.contains("jdoe"));
    assert!(parsed.record.accepted.is_empty());
    assert!(parsed.record.declined.contains("asmith"));
    assert!(parsed.record.tentative.contains("mpark"));
    assert!(parsed.record.no_response.contains("sreyes"));
    Ok(())
}

#[test]
fn fixture_sets_are_disjoint() -> Result<()> {
    let text = load_fixture(FIXTURE)?;
    let parsed = parse_roster(&text)?;
    let r = &parsed.record;

    let total = r.accepted.len() + r.declined.len() + r.tentative.len() + r.no_response.len();
    assert_eq!(total, r.all().len(), "an alias appeared in two status sets");
    Ok(())
}

#[test]
fn fixture_effective_set_excludes_declines() -> Result<()> {
    let text = load_fixture(FIXTURE)?;
    let parsed = parse_roster(&text)?;
    let effective = parsed.record.effective();

    assert_eq!(effective.len(), 3);
    assert!(!effective.contains("asmith"));
    Ok(())
}

#[test]
fn truncated_roster_is_malformed() {
    let err = parse_roster("Name,Alias,Team,Response\nDoe Jane,jdoe\n")
        .expect_err("two-column row must fail");
    assert!(matches!(err, RosterError::MissingColumns { row: 1, got: 2 }));
}
