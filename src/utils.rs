// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, anyhow};
use chrono::{Months, NaiveDate};

/// Canonical storage format for session dates.
pub const STORAGE_DATE_FMT: &str = "%Y-%m-%d";

/// Legacy roster format still seen on exported invites.
pub const LEGACY_DATE_FMT: &str = "%m/%d/%Y";

/// Parses a session date, accepting the canonical `YYYY-MM-DD` form and the
/// legacy `MM/DD/YYYY` form. Everything downstream works on the returned
/// `NaiveDate`; strings never travel past this boundary.
pub fn parse_session_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, STORAGE_DATE_FMT)
        .or_else(|_| NaiveDate::parse_from_str(s, LEGACY_DATE_FMT))
        .map_err(|e| anyhow!("unparseable session date {s:?}: {e}"))
}

/// Key used for attendance and history records.
pub fn storage_key(date: NaiveDate) -> String {
    date.format(STORAGE_DATE_FMT).to_string()
}

/// Date stamp used in match filenames (`YYYY_MM_DD`).
pub fn file_stamp(date: NaiveDate) -> String {
    date.format("%Y_%m_%d").to_string()
}

/// Target date for the repeat-pair waterline: a repeated pairing is
/// admissible only if its most recent occurrence is strictly older than
/// `today - months`.
pub fn waterline_target(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
