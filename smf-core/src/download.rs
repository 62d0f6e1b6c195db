//! Consumer-side download overlay and its local state file.
//!
//! The state file carries no header: it is the JSON encoding of
//! [`DownloadMeta`] XORed with a fixed key. It is never exchanged between
//! peers, so a file that fails to decode just means "start over".

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bitset::BitSet;
use crate::error::{CodecError, Result};
use crate::manifest::{DataBlock, Info, Status};
use crate::xor::{XorReader, XorWriter};

pub const STATE_KEY: u8 = 0x14;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadMeta {
    #[serde(flatten)]
    pub info: Info,
    pub index: BitSet,
    pub downloaded: u64,
    pub download_total: u64,
}

impl DownloadMeta {
    pub fn new(info: Info) -> Self {
        let download_total = info.block_count();
        let highest = info.highest_index().map(|i| i.saturating_add(1)).unwrap_or(0);
        let index = BitSet::new(download_total.max(highest) as usize);
        Self { info, index, downloaded: 0, download_total }
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn into_info(self) -> Info {
        self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn hash(&self) -> &[u8] {
        &self.info.hash
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn block_size(&self) -> u64 {
        self.info.block_size
    }

    pub fn status(&self) -> Status {
        self.info.status
    }

    pub fn blocks(&self) -> &[DataBlock] {
        &self.info.blocks
    }

    /// Record block `i` as stored. Returns false if it was already marked or
    /// lies outside the resource.
    pub fn mark_complete(&mut self, i: u64) -> bool {
        let Ok(i) = usize::try_from(i) else {
            return false;
        };
        if i >= self.index.len() {
            return false;
        }
        let changed = self.index.set(i);
        if changed {
            self.downloaded += 1;
        }
        changed
    }

    pub fn is_complete(&self, i: u64) -> bool {
        usize::try_from(i).is_ok_and(|i| self.index.get(i))
    }

    pub fn is_finished(&self) -> bool {
        self.downloaded >= self.download_total
    }

    pub fn pending_blocks(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.download_total).filter(move |&i| !self.is_complete(i))
    }

    /// Bit vector shape, counters and manifest geometry must all agree.
    pub fn check_consistency(&self) -> Result<()> {
        if !self.index.is_well_formed() {
            return Err(CodecError::CorruptPayload("malformed block index".into()));
        }
        if self.download_total != self.info.block_count() {
            return Err(CodecError::CorruptPayload(format!(
                "download_total={} but manifest has {} blocks",
                self.download_total,
                self.info.block_count()
            )));
        }
        let ones = self.index.count() as u64;
        if ones != self.downloaded {
            return Err(CodecError::CorruptPayload(format!(
                "downloaded={} but {} blocks marked",
                self.downloaded, ones
            )));
        }
        let needed = self
            .info
            .highest_index()
            .map(|i| i.saturating_add(1))
            .unwrap_or(0)
            .max(self.download_total);
        if (self.index.len() as u64) < needed {
            return Err(CodecError::CorruptPayload(format!(
                "index holds {} bits, {} needed",
                self.index.len(),
                needed
            )));
        }
        Ok(())
    }
}

pub fn encode_to_file(path: &Path, meta: &DownloadMeta) -> Result<()> {
    let f = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let mut w = XorWriter::new(STATE_KEY, BufWriter::new(f));
    serde_json::to_writer(&mut w, meta).map_err(CodecError::from_json)?;
    w.flush()?;
    Ok(())
}

pub fn decode_from_file(path: &Path) -> Result<DownloadMeta> {
    let f = File::open(path)?;
    let r = XorReader::new(STATE_KEY, BufReader::new(f));
    let meta: DownloadMeta = serde_json::from_reader(r).map_err(CodecError::from_json)?;
    meta.check_consistency()?;
    Ok(meta)
}

/// Pick up saved progress for `info`, or start fresh when there is none usable.
pub fn resume_or_new(path: &Path, info: Info) -> DownloadMeta {
    if !path.exists() {
        return DownloadMeta::new(info);
    }
    match decode_from_file(path) {
        Ok(meta)
            if meta.info.hash == info.hash
                && meta.info.size == info.size
                && meta.info.block_size == info.block_size
                && meta.download_total == info.block_count() =>
        {
            debug!(path = %path.display(), downloaded = meta.downloaded, "resuming download");
            meta
        }
        Ok(_) => {
            warn!(path = %path.display(), "state belongs to a different resource, starting over");
            DownloadMeta::new(info)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unusable download state, starting over");
            DownloadMeta::new(info)
        }
    }
}

/// Persist progress; once every block is stored the state file is removed.
pub fn checkpoint(path: &Path, meta: &DownloadMeta) -> Result<()> {
    if meta.is_finished() {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }
    encode_to_file(path, meta)
}
