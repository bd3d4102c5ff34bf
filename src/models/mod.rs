//! Data model: SE directory records, roster parsing, attendance records.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// RSVP roster parsing and the per-date attendance record.
pub mod roster;
/// SE directory records and classification.
pub mod se;
