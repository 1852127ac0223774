// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic persistence of the durable state subset: temp file + fsync +
//! rename (+ fsync parent where the filesystem permits), per §5's ordering
//! guarantees for the config/state files.

use crate::durable::DurableState;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `state` atomically to `path`: a sibling `.tmp` file is written
/// and fsynced, then renamed over the destination, then (best-effort) the
/// parent directory is fsynced so the rename itself is durable.
pub fn save(state: &DurableState, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Load the durable state from `path`. Returns the default (empty) state
/// if the file doesn't exist. A corrupt file is moved aside to `.bak` (so
/// the operator can inspect it) and the daemon starts fresh rather than
/// refusing to boot (§7: invariant failures are fatal to the operation,
/// not to the daemon).
pub fn load(path: &Path) -> Result<DurableState, PersistError> {
    if !path.exists() {
        return Ok(DurableState::default());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(state) => Ok(state),
        Err(e) => {
            let bak_path = path.with_extension("bak");
            warn!(error = %e, path = %path.display(), bak = %bak_path.display(), "corrupt state file, moving aside and starting fresh");
            let _ = fs::rename(path, &bak_path);
            Ok(DurableState::default())
        }
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
