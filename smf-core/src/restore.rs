use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::build::block_matches;
use crate::download::{checkpoint, resume_or_new};
use crate::error::RestoreError;
use crate::fetch::{fetch_bytes, FetchConfig};
use crate::manifest::{BlockData, Info};

#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub blocks_stored: u64,
    pub blocks_skipped: u64,
    pub blocks_bad: u64,
    pub blocks_missing: u64,
    /// Whole-resource hash checked after the last block landed.
    pub hash_ok: Option<bool>,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RestoreError {
    let path = path.display().to_string();
    move |source| RestoreError::Io { path, source }
}

/// Materialise the resource described by `info` into `out`, resuming from the
/// state file at `state` when one exists.
pub fn restore(
    info: &Info,
    out: &Path,
    state: &Path,
    cfg: &FetchConfig,
) -> Result<RestoreReport, RestoreError> {
    info.validate()?;

    let mut meta = resume_or_new(state, info.clone());
    let mut f = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(out)
        .map_err(io_err(out))?;
    f.set_len(info.size).map_err(io_err(out))?;

    let mut report = RestoreReport {
        blocks_skipped: meta.downloaded,
        ..Default::default()
    };
    let pending: Vec<u64> = meta.pending_blocks().collect();
    for idx in pending {
        let Some(block) = info.block(idx) else {
            report.blocks_missing += 1;
            continue;
        };
        let bytes = match info.block_data(block) {
            BlockData::Inline(b) => b.to_vec(),
            BlockData::Uri(uri) if !uri.is_empty() => match fetch_bytes(uri, cfg) {
                Ok(b) => b,
                Err(e) => {
                    warn!(block = idx, error = %e, "block fetch failed");
                    report.blocks_bad += 1;
                    continue;
                }
            },
            BlockData::Uri(_) | BlockData::BadUri(_) => return Err(RestoreError::BadUri(idx)),
        };
        if bytes.len() as u64 != info.block_len(idx) || !block_matches(block, &bytes) {
            warn!(block = idx, "block failed verification");
            report.blocks_bad += 1;
            continue;
        }
        f.seek(SeekFrom::Start(info.block_offset(idx))).map_err(io_err(out))?;
        f.write_all(&bytes).map_err(io_err(out))?;
        meta.mark_complete(idx);
        report.blocks_stored += 1;
        debug!(block = idx, downloaded = meta.downloaded, total = meta.download_total, "block stored");
        checkpoint(state, &meta)?;
    }

    if meta.is_finished() {
        f.seek(SeekFrom::Start(0)).map_err(io_err(out))?;
        let mut h = blake3::Hasher::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = f.read(&mut buf).map_err(io_err(out))?;
            if n == 0 {
                break;
            }
            h.update(&buf[..n]);
        }
        let ok = info.hash.is_empty() || h.finalize().as_bytes()[..] == info.hash[..];
        report.hash_ok = Some(ok);
        info!(name = %info.name, stored = report.blocks_stored, hash_ok = ok, "restore complete");
    } else {
        checkpoint(state, &meta)?;
    }
    Ok(report)
}
