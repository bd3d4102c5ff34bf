// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::BTreeSet;

use tracing::info;

/// Injects the configured session host when the attendance count is odd.
/// Set semantics make a second application a no-op. Returns whether the host
/// was added.
pub fn inject_host(attendees: &mut BTreeSet<String>, host: &str) -> bool {
    if attendees.len() % 2 != 0 {
        info!(host, "odd attendance, injecting session host");
        attendees.insert(host.to_string())
    } else {
        false
    }
}
