//! Framed manifest codec.
//!
//! Layout: magic (4) + version (1) + key (1), all plaintext, followed by the
//! bincode-encoded [`Info`] XORed with `key`.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use rand::Rng;
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::fetch::{fetch_bytes, FetchConfig};
use crate::manifest::Info;
use crate::xor::{XorReader, XorWriter};

pub const MAGIC: &[u8; 4] = b"\x14SMF";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub key: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct DecodeLimits {
    pub max_payload_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_payload_bytes: 64 * 1024 * 1024 }
    }
}

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding().allow_trailing_bytes()
}

/// Pick a per-encode obfuscation key in `1..=254`.
pub fn random_key<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(1..=254)
}

/// Write header and obfuscated payload to `w` with a key drawn from `rng`.
pub fn encode_to_writer<W: Write, R: Rng>(
    mut w: W,
    info: &Info,
    rng: &mut R,
) -> Result<()> {
    let key = random_key(rng);
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(MAGIC);
    header[4] = VERSION;
    header[5] = key;
    w.write_all(&header)?;
    let mut xw = XorWriter::new(key, w);
    payload_options().serialize_into(&mut xw, info).map_err(|e| match *e {
        bincode::ErrorKind::Io(io) => CodecError::Io(io),
        other => CodecError::Encode(other.to_string()),
    })?;
    xw.flush()?;
    debug!(name = %info.name, blocks = info.blocks.len(), key, "manifest encoded");
    Ok(())
}

pub fn encode_to_file(path: &Path, info: &Info) -> Result<()> {
    encode_to_file_with_rng(path, info, &mut rand::thread_rng())
}

pub fn encode_to_file_with_rng<R: Rng>(path: &Path, info: &Info, rng: &mut R) -> Result<()> {
    let f = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let mut w = BufWriter::new(f);
    encode_to_writer(&mut w, info, rng)?;
    w.flush()?;
    Ok(())
}

/// Read and validate the 6-byte plaintext header.
pub fn read_header<R: Read>(r: &mut R) -> Result<Header> {
    let mut hdr = [0u8; HEADER_LEN];
    r.read_exact(&mut hdr).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => CodecError::ShortHeader,
        _ => CodecError::Io(e),
    })?;
    if &hdr[..4] != MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(&hdr[..4]);
        return Err(CodecError::UnrecognizedFormat { found });
    }
    let version = hdr[4];
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    Ok(Header { version, key: hdr[5] })
}

pub fn decode_from_reader<R: Read>(r: R) -> Result<Info> {
    decode_from_reader_with(r, &DecodeLimits::default())
}

pub fn decode_from_reader_with<R: Read>(mut r: R, limits: &DecodeLimits) -> Result<Info> {
    let header = read_header(&mut r)?;
    let xr = XorReader::new(header.key, r);
    let info: Info = payload_options()
        .with_limit(limits.max_payload_bytes)
        .deserialize_from(xr)
        .map_err(CodecError::from_bincode)?;
    debug!(name = %info.name, blocks = info.blocks.len(), version = header.version, "manifest decoded");
    Ok(info)
}

pub fn decode_from_file(path: &Path) -> Result<Info> {
    let f = File::open(path)?;
    decode_from_reader(BufReader::new(f))
}

pub fn decode_from_url(url: &str) -> Result<Info> {
    decode_from_url_with(url, &FetchConfig::default())
}

pub fn decode_from_url_with(url: &str, cfg: &FetchConfig) -> Result<Info> {
    let body = fetch_bytes(url, cfg)?;
    decode_from_reader(&body[..])
}

/// Decode from a local path or, for `http(s)://` sources, a remote URL.
pub fn decode_from_source(source: &str) -> Result<Info> {
    if source.starts_with("http://") || source.starts_with("https://") {
        decode_from_url(source)
    } else {
        decode_from_file(Path::new(source))
    }
}
