// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::future::Future;

use dashmap::DashMap;

use crate::{models::roster::AttendanceRecord, store::StoreError};

/// Per-session-date attendance records (the prematch document).
pub trait AttendanceStore: Send + Sync + 'static {
    /// Applies a freshly parsed roster to the record for `date_key` with
    /// latest-intake-wins semantics: every alias the parse mentions is moved
    /// to exactly its new status; unmentioned aliases are left alone.
    fn apply_intake(
        &self,
        date_key: &str,
        parsed: &AttendanceRecord,
    ) -> impl Future<Output = Result<AttendanceRecord, StoreError>> + Send;

    /// The stored record for a date, if any intake has run.
    fn record(
        &self,
        date_key: &str,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>, StoreError>> + Send;
}

/// In-memory [`AttendanceStore`].
#[derive(Debug, Default)]
pub struct MemoryAttendance {
    records: DashMap<String, AttendanceRecord>,
}

impl MemoryAttendance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttendanceStore for MemoryAttendance {
    async fn apply_intake(
        &self,
        date_key: &str,
        parsed: &AttendanceRecord,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut entry = self.records.entry(date_key.to_string()).or_default();
        entry.merge_latest(parsed);
        Ok(entry.clone())
    }

    async fn record(
        &self,
        date_key: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.records.get(date_key).map(|e| e.value().clone()))
    }
}
