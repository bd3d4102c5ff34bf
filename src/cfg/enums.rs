// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Run mode for a pairing session.
///
/// `Live` persists new pairings to the history store and writes the match
/// CSV. `Test` runs the full selection but leaves every store untouched and
/// returns the `NA` sentinel instead of a filename.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    #[serde(rename = "Live", alias = "live", alias = "LIVE")]
    Live,
    #[serde(rename = "Test", alias = "test", alias = "TEST")]
    Test,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Live => "Live",
            RunMode::Test => "Test",
        })
    }
}

impl RunMode {
    pub fn is_test(self) -> bool {
        matches!(self, RunMode::Test)
    }
}

/// Response parsed out of an RSVP roster row.
///
/// Anything that is not an explicit accept/decline/tentative counts as no
/// response; those SEs are still expected to show up.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    #[serde(rename = "Accepted", alias = "accepted")]
    Accepted,
    #[serde(rename = "Declined", alias = "declined")]
    Declined,
    #[serde(rename = "Tentative", alias = "tentative")]
    Tentative,
    #[serde(rename = "None", alias = "none")]
    NoResponse,
}

impl ResponseStatus {
    /// Maps a raw roster cell to a status. Unknown values fall through to
    /// `NoResponse` rather than erroring; blank cells are the common case.
    pub fn from_cell(cell: &str) -> Self {
        match cell {
            "Accepted" => Self::Accepted,
            "Declined" => Self::Declined,
            "Tentative" => Self::Tentative,
            _ => Self::NoResponse,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseStatus::Accepted => "Accepted",
            ResponseStatus::Declined => "Declined",
            ResponseStatus::Tentative => "Tentative",
            ResponseStatus::NoResponse => "None",
        })
    }
}
