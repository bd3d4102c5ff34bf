// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::{
    engine::PairingError,
    models::roster::{AttendanceRecord, parse_roster},
    store::{
        attendance::AttendanceStore,
        retry::{RetryPolicy, retry},
    },
    utils::storage_key,
};

/// What an intake produced: the merged attendance record for the date plus
/// the display names seen in the roster (used later to provision unknown
/// aliases in the directory).
#[derive(Debug, Clone)]
pub struct IntakeSummary {
    pub record: AttendanceRecord,
    pub display_names: BTreeMap<String, String>,
}

impl IntakeSummary {
    /// (accepted, declined, tentative, no_response)
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        self.record.counts()
    }
}

/// Parses an RSVP roster and folds it into the attendance record for one
/// session date. Re-running with the same roster is membership-idempotent;
/// a malformed roster leaves the record untouched.
pub struct RosterIntake<'a, A> {
    date: NaiveDate,
    store: &'a A,
    policy: RetryPolicy,
}

impl<'a, A: AttendanceStore> RosterIntake<'a, A> {
    pub fn new(date: NaiveDate, store: &'a A, policy: RetryPolicy) -> Self {
        Self { date, store, policy }
    }

    pub async fn process(&self, roster_text: &str) -> Result<IntakeSummary, PairingError> {
        let parsed = parse_roster(roster_text)?;

        let date_key = storage_key(self.date);
        let record = retry(&self.policy, "attendance.apply_intake", || {
            self.store.apply_intake(&date_key, &parsed.record)
        })
        .await?;

        let (accepted, declined, tentative, no_response) = record.counts();
        info!(
            date = %date_key,
            accepted, declined, tentative, no_response, "roster intake applied"
        );

        Ok(IntakeSummary {
            record,
            display_names: parsed.display_names,
        })
    }
}
