use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{BuildError, ManifestError};
use crate::manifest::{DataBlock, DataType, EncodeType, Info};

pub const DEFAULT_BLOCK_SIZE: u64 = 1 << 20;

#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub block_size: u64,
    pub data_type: DataType,
    pub encode: EncodeType,
    /// Prefix for `Uri` blocks; each block points at `{uri_base}/{hash-hex}`.
    pub uri_base: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            data_type: DataType::Stream,
            encode: EncodeType::None,
            uri_base: None,
        }
    }
}

pub fn hash_block(bytes: &[u8]) -> Vec<u8> {
    blake3::hash(bytes).as_bytes().to_vec()
}

pub fn block_matches(block: &DataBlock, bytes: &[u8]) -> bool {
    block.hash == hash_block(bytes)
}

pub fn build_from_path(path: &Path, cfg: &BuildConfig) -> Result<Info, BuildError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let f = File::open(path)?;
    build_from_reader(name, BufReader::new(f), cfg)
}

/// Split `r` into `cfg.block_size` chunks, hash them and return a sealed manifest.
pub fn build_from_reader<R: Read>(
    name: impl Into<String>,
    mut r: R,
    cfg: &BuildConfig,
) -> Result<Info, BuildError> {
    if cfg.block_size == 0 {
        return Err(ManifestError::ZeroBlockSize.into());
    }
    let base = match (cfg.data_type, &cfg.uri_base) {
        (DataType::Uri, Some(b)) => Some(b.trim_end_matches('/').to_string()),
        (DataType::Uri, None) => return Err(ManifestError::MissingUriBase.into()),
        (DataType::Stream, _) => None,
    };

    let mut info = Info::new(name, 0, cfg.block_size);
    info.encode = cfg.encode;
    info.data_type = cfg.data_type;
    info.begin_upload();

    let mut whole = blake3::Hasher::new();
    let mut buf = vec![0u8; cfg.block_size as usize];
    let mut index = 0u64;
    loop {
        let n = read_full(&mut r, &mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        whole.update(chunk);
        let digest = blake3::hash(chunk);
        let data = match &base {
            Some(b) => format!("{}/{}", b, digest.to_hex()).into_bytes(),
            None => chunk.to_vec(),
        };
        info.append_block(DataBlock { hash: digest.as_bytes().to_vec(), index, data });
        info.size += n as u64;
        index += 1;
        if n < buf.len() {
            break;
        }
    }
    info.hash = whole.finalize().as_bytes().to_vec();
    info.finish()?;
    Ok(info)
}

// Fill `buf` unless the reader runs dry first.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
