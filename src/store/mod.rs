//! Store contracts and their in-memory implementations.
//!
//! The pairing engine never talks to a concrete database; it is generic over
//! these traits, which makes it unit-testable with the in-memory stores and
//! lets embedders plug in their own persistence.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Per-date attendance record store.
pub mod attendance;
/// SE directory: metadata lookup, region table, unknown provisioning.
pub mod directory;
/// Per-SE pairing history.
pub mod history;
/// Bounded retry with exponential backoff, shared by every store call site.
pub mod retry;

use thiserror::Error;

/// Errors produced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A connectivity-class failure worth retrying.
    #[error("transient store failure: {0}")]
    Transient(String),
    /// Retries exhausted; the run must abort.
    #[error("{op} failed after {attempts} attempts: {last}")]
    Unavailable {
        op: String,
        attempts: u32,
        last: String,
    },
}
