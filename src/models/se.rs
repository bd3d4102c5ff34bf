// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Region index reserved for senior SE leadership (SSEM).
pub const SSEM_REGION: u16 = 0;

/// Region index reserved for VIP guests and auto-provisioned unknowns.
pub const VIP_REGION: u16 = 100;

/// Directory record for a single SE.
///
/// `alias` is the opaque stable identifier (a corporate login); `se_idx` is
/// the directory's own stable integer index, used only when provisioning new
/// records.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SeInfo {
    /// Stable directory index.
    pub se_idx: u32,
    /// Opaque alias identifying the SE.
    pub se: String,
    /// Human-readable display name.
    pub se_name: String,
    /// Region name; resolved to an index through the directory's region
    /// table.
    pub region: String,
    /// Mid-tier manager flag.
    #[serde(default)]
    pub sem: bool,
    /// Role designation ("SE", "SEM", "VIP", ...).
    #[serde(default)]
    pub op: String,
}

/// Classification of a selected SE, driving partner eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeClass {
    /// Region 100 guest.
    Vip,
    /// Senior leader (region 0).
    Ssem,
    /// Mid-tier manager (`sem` flag).
    Sem,
    /// Everyone else.
    Regular,
}

impl SeClass {
    /// Classifies an SE by region and current leadership sets. The order
    /// matters: VIP wins over SSEM wins over SEM.
    pub fn classify(
        alias: &str,
        region_index: u16,
        zero_set: &BTreeSet<String>,
        sem_set: &BTreeSet<String>,
    ) -> Self {
        if region_index == VIP_REGION {
            Self::Vip
        } else if zero_set.contains(alias) {
            Self::Ssem
        } else if sem_set.contains(alias) {
            Self::Sem
        } else {
            Self::Regular
        }
    }
}
