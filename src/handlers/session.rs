// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use chrono::NaiveDate;
use rand::Rng;
use tracing::info;

use crate::{
    cfg::enums::RunMode,
    engine::{PairingEngine, PairingError},
    handlers::intake::RosterIntake,
    store::{
        attendance::AttendanceStore, directory::DirectoryStore, history::HistoryStore,
    },
};

/// Intake plus pairing in one call: parses the roster, updates the
/// attendance record for the date, and runs the engine on the effective
/// attendance set. Returns the match filename (or the test sentinel).
pub async fn run_session<D, H, A, R>(
    engine: &mut PairingEngine<D, H, R>,
    attendance: &A,
    date: NaiveDate,
    roster_text: &str,
    mode: RunMode,
) -> Result<String, PairingError>
where
    D: DirectoryStore,
    H: HistoryStore,
    A: AttendanceStore,
    R: Rng + Send,
{
    let intake = RosterIntake::new(date, attendance, engine.retry_policy());
    let summary = intake.process(roster_text).await?;

    let attendees = summary.record.effective();
    info!(%date, attendees = attendees.len(), "running pairing on effective attendance");
    engine
        .run(date, attendees, &summary.display_names, mode)
        .await
}
