use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// Lifecycle stage of a manifest, controlled by its producer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Create,
    Uploading,
    Finish,
    /// Sourced from this machine rather than a remote peer.
    Local,
}

/// Content-level encoding hint. Unrelated to the on-disk obfuscation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncodeType {
    #[default]
    None,
    Image,
}

/// What `DataBlock::data` holds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    Uri,
    Stream,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DataBlock {
    pub hash: Vec<u8>,
    pub index: u64,
    pub data: Vec<u8>,
}

/// Borrowed view of a block payload, resolved against the manifest's `DataType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockData<'a> {
    Inline(&'a [u8]),
    Uri(&'a str),
    /// `Uri` block whose data is not UTF-8.
    BadUri(&'a [u8]),
}

/// Descriptor of one resource split into fixed-size blocks.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub status: Status,
    pub hash: Vec<u8>,
    pub name: String,
    pub size: u64,
    pub block_size: u64,
    pub encode: EncodeType,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub blocks: Vec<DataBlock>,
}

impl Info {
    pub fn new(name: impl Into<String>, size: u64, block_size: u64) -> Self {
        Self { name: name.into(), size, block_size, ..Default::default() }
    }

    /// Attach `block`, replacing any existing entry with the same index.
    ///
    /// Indices stay unique no matter how often or in which order blocks arrive;
    /// the position of entries for other indices is left alone.
    pub fn append_block(&mut self, block: DataBlock) {
        if self.blocks.is_empty() {
            self.blocks = vec![block];
            return;
        }
        if let Some(slot) = self.blocks.iter_mut().find(|b| b.index == block.index) {
            *slot = block;
            return;
        }
        self.blocks.push(block);
    }

    pub fn block(&self, index: u64) -> Option<&DataBlock> {
        self.blocks.iter().find(|b| b.index == index)
    }

    /// Number of blocks implied by `size` and `block_size` (ceiling division).
    pub fn block_count(&self) -> u64 {
        if self.block_size == 0 {
            return 0;
        }
        self.size.div_ceil(self.block_size)
    }

    /// Saturates instead of wrapping for indices far past the end.
    pub fn block_offset(&self, index: u64) -> u64 {
        index.saturating_mul(self.block_size)
    }

    /// Byte length of block `index`; the final block carries the remainder.
    pub fn block_len(&self, index: u64) -> u64 {
        let off = self.block_offset(index);
        if off >= self.size {
            return 0;
        }
        (self.size - off).min(self.block_size)
    }

    pub fn block_data<'a>(&self, block: &'a DataBlock) -> BlockData<'a> {
        match self.data_type {
            DataType::Stream => BlockData::Inline(&block.data),
            DataType::Uri => match std::str::from_utf8(&block.data) {
                Ok(s) => BlockData::Uri(s),
                Err(_) => BlockData::BadUri(&block.data),
            },
        }
    }

    pub fn highest_index(&self) -> Option<u64> {
        self.blocks.iter().map(|b| b.index).max()
    }

    /// Indices in `0..block_count()` with no block entry yet.
    pub fn missing_blocks(&self) -> Vec<u64> {
        let mut have: Vec<u64> = self.blocks.iter().map(|b| b.index).collect();
        have.sort_unstable();
        (0..self.block_count()).filter(|i| have.binary_search(i).is_err()).collect()
    }

    pub fn begin_upload(&mut self) {
        if self.status == Status::Create {
            self.status = Status::Uploading;
        }
    }

    /// Seal the manifest once every block is known.
    pub fn finish(&mut self) -> Result<(), ManifestError> {
        self.validate()?;
        let missing = self.missing_blocks().len();
        if missing > 0 {
            return Err(ManifestError::Incomplete { missing });
        }
        self.status = Status::Finish;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.block_size == 0 {
            return Err(ManifestError::ZeroBlockSize);
        }
        let count = self.block_count();
        let mut seen: Vec<u64> = Vec::with_capacity(self.blocks.len());
        for b in &self.blocks {
            if b.index >= count {
                return Err(ManifestError::BlockOutOfRange { index: b.index, count });
            }
            seen.push(b.index);
        }
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(ManifestError::DuplicateIndex(w[0]));
        }
        Ok(())
    }
}
