// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, io::ErrorKind, path::Path, sync::Arc};

use chrono::NaiveDate;
use rand::RngExt;
use tracing::{error, info, warn};

use crate::{
    engine::{Pair, PairingError},
    models::se::SeInfo,
    store::{
        history::HistoryStore,
        retry::{RetryPolicy, retry},
    },
    utils::{file_stamp, storage_key},
};

const CSV_HEADER: &str = "SE1_NAME,SE1_CCO,SE2_CCO,SE2_NAME";

/// Appends the session's pairs to the history store (both directions per
/// pair) and writes the match CSV. The CSV is emitted even when history
/// persistence fails, so the operator can reconcile by hand; that case
/// returns [`PairingError::PersistFailed`] after the file is on disk.
pub(crate) async fn persist_and_write<H: HistoryStore>(
    history: &Arc<H>,
    policy: &RetryPolicy,
    match_dir: &Path,
    date: NaiveDate,
    pairs: &[Pair],
    infos: &HashMap<String, SeInfo>,
) -> Result<String, PairingError> {
    let date_key = storage_key(date);
    let mut persist_failed = false;
    for pair in pairs {
        match retry(policy, "history.record_pair", || {
            history.record_pair(&date_key, &pair.first, &pair.second)
        })
        .await
        {
            Ok(()) => {},
            Err(e) => {
                error!(a = %pair.first, b = %pair.second, error = %e, "failed to persist pair");
                persist_failed = true;
            },
        }
    }

    let csv = render_csv(pairs, infos);
    let filename = write_with_fallback(match_dir, &file_stamp(date), &csv).await?;
    info!(filename = %filename, pairs = pairs.len(), "match file written");

    if persist_failed {
        return Err(PairingError::PersistFailed { csv_file: filename });
    }
    Ok(filename)
}

/// CSV body: one row per pair, display names from the resolved snapshot.
fn render_csv(pairs: &[Pair], infos: &HashMap<String, SeInfo>) -> String {
    let name_of = |alias: &str| {
        infos
            .get(alias)
            .map(|i| i.se_name.as_str())
            .unwrap_or("Unknown")
    };
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for pair in pairs {
        out.push_str(&format!(
            "{},{},{},{}\n",
            name_of(&pair.first),
            pair.first,
            pair.second,
            name_of(&pair.second),
        ));
    }
    out
}

/// Writes `<stamp>-matches.csv` into `match_dir`, retrying once with a
/// random `-PE<N>` suffix when the primary name is not writable.
async fn write_with_fallback(
    match_dir: &Path,
    stamp: &str,
    content: &str,
) -> Result<String, PairingError> {
    tokio::fs::create_dir_all(match_dir).await?;

    let primary = format!("{stamp}-matches.csv");
    match tokio::fs::write(match_dir.join(&primary), content).await {
        Ok(()) => Ok(primary),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let n: u32 = rand::rng().random_range(1..=100);
            let fallback = format!("{stamp}-matches-PE{n}.csv");
            warn!(primary = %primary, fallback = %fallback, "permission denied, retrying with suffix");
            tokio::fs::write(match_dir.join(&fallback), content).await?;
            Ok(fallback)
        },
        Err(e) => Err(e.into()),
    }
}
