// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cfg::enums::ResponseStatus;

/// Minimum number of cells a roster row must have after parenthesized-suffix
/// promotion: display name, alias, one filler column, response.
const MIN_CELLS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("row {row}: expected at least {MIN_CELLS} columns, got {got}")]
    MissingColumns { row: usize, got: usize },
    #[error("row {row}: empty alias cell")]
    EmptyAlias { row: usize },
}

/// Per-date attendance record: four pairwise-disjoint response sets.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub accepted: BTreeSet<String>,
    pub declined: BTreeSet<String>,
    pub tentative: BTreeSet<String>,
    pub no_response: BTreeSet<String>,
}

impl AttendanceRecord {
    /// Moves `alias` into exactly the set for `status`, removing it from any
    /// other set first so the disjointness invariant holds.
    pub fn place(&mut self, alias: &str, status: ResponseStatus) {
        self.remove(alias);
        match status {
            ResponseStatus::Accepted => self.accepted.insert(alias.to_string()),
            ResponseStatus::Declined => self.declined.insert(alias.to_string()),
            ResponseStatus::Tentative => self.tentative.insert(alias.to_string()),
            ResponseStatus::NoResponse => self.no_response.insert(alias.to_string()),
        };
    }

    /// Removes `alias` from every response set.
    pub fn remove(&mut self, alias: &str) {
        self.accepted.remove(alias);
        self.declined.remove(alias);
        self.tentative.remove(alias);
        self.no_response.remove(alias);
    }

    /// Every alias mentioned in the record, regardless of status.
    pub fn all(&self) -> BTreeSet<String> {
        let mut out = self.accepted.clone();
        out.extend(self.declined.iter().cloned());
        out.extend(self.tentative.iter().cloned());
        out.extend(self.no_response.iter().cloned());
        out
    }

    /// The attendance set the pairing engine works on. Declines are the only
    /// response that excuses an SE from the session.
    pub fn effective(&self) -> BTreeSet<String> {
        let mut out = self.accepted.clone();
        out.extend(self.tentative.iter().cloned());
        out.extend(self.no_response.iter().cloned());
        out
    }

    /// Folds a newer parse into this record. Every alias the new parse
    /// mentions is first removed from all four sets, then placed per its new
    /// status; aliases the new parse does not mention keep their old status.
    pub fn merge_latest(&mut self, newer: &AttendanceRecord) {
        for alias in newer.all() {
            self.remove(&alias);
        }
        self.accepted.extend(newer.accepted.iter().cloned());
        self.declined.extend(newer.declined.iter().cloned());
        self.tentative.extend(newer.tentative.iter().cloned());
        self.no_response.extend(newer.no_response.iter().cloned());
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.accepted.len(),
            self.declined.len(),
            self.tentative.len(),
            self.no_response.len(),
        )
    }
}

/// Result of parsing one roster: the classified record plus the display
/// names seen on the way, used later to provision unknown aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRoster {
    pub record: AttendanceRecord,
    pub display_names: BTreeMap<String, String>,
}

/// Parses an RSVP roster export.
///
/// The first row is a header and is skipped; a leading UTF-8 BOM is
/// tolerated; blank lines are ignored. Parenthesized suffixes in the name
/// column are promoted to their own cell (`"Doe, Jane (jdoe)"` becomes
/// `"Doe, Jane , jdoe"`), after which cell 1 is the alias and cell 3 the
/// response. A later row for the same alias wins.
pub fn parse_roster(text: &str) -> Result<ParsedRoster, RosterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut parsed = ParsedRoster::default();
    for (row, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let promoted = promote_parenthesized(line);
        let cells: Vec<&str> = promoted.split(',').map(str::trim).collect();
        if cells.len() < MIN_CELLS {
            return Err(RosterError::MissingColumns { row, got: cells.len() });
        }

        let alias = cells[1];
        if alias.is_empty() {
            return Err(RosterError::EmptyAlias { row });
        }

        parsed
            .record
            .place(alias, ResponseStatus::from_cell(cells[3]));
        if !cells[0].is_empty() {
            parsed
                .display_names
                .insert(alias.to_string(), cells[0].to_string());
        }
    }
    Ok(parsed)
}

/// Replaces every `"(X)"` with `", X"`, the same rewrite the roster export
/// needs before a plain comma split.
fn promote_parenthesized(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 2);
    let mut rest = line;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close_rel) => {
                let close = open + close_rel;
                out.push_str(&rest[..open]);
                out.push_str(", ");
                out.push_str(&rest[open + 1..close]);
                rest = &rest[close + 1..];
            },
            None => break,
        }
    }
    out.push_str(rest);
    out
}
