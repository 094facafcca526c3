//! Write-to-temp-then-rename commits.
//!
//! The temporary file lives next to the target so the final rename never
//! crosses a filesystem boundary. Until the rename, the target path keeps
//! whatever it had before (usually nothing). A temporary that never gets
//! published is removed when it is dropped.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{Result, WorkerError};

const TEMP_PREFIX: &str = ".mr-tmp-";

pub fn commit(target: &Path, payload: &[u8]) -> Result<()> {
    commit_with(target, |w| w.write_all(payload))
}

/// Commits whatever `fill` writes. Nothing becomes visible at `target` unless
/// `fill` succeeds and the data has been synced.
pub fn commit_with<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let stage_err = |source| WorkerError::Stage {
        path: target.to_path_buf(),
        source,
    };

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(stage_err)?;

    write_and_sync(&tmp, fill).map_err(stage_err)?;

    tmp.persist(target).map_err(|e| WorkerError::Publish {
        path: target.to_path_buf(),
        source: e.error,
    })?;
    trace!("committed {:?}", target);
    Ok(())
}

fn write_and_sync<F>(tmp: &NamedTempFile, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let file = tmp.as_file();
    let mut writer = BufWriter::new(file);
    fill(&mut writer)?;
    writer.flush()?;
    drop(writer);
    file.sync_all()
}
