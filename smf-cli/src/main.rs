use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use smf_core::build::{block_matches, build_from_path, BuildConfig, DEFAULT_BLOCK_SIZE};
use smf_core::codec::{self, read_header};
use smf_core::download;
use smf_core::fetch::FetchConfig;
use smf_core::manifest::{BlockData, DataType, EncodeType, Info};
use smf_core::restore::restore;

#[derive(Parser)]
#[command(name="smf", version, about="smf: block manifests and resumable restores")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)] cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Split a file into blocks and write its manifest
    Create {
        input: PathBuf,
        #[arg(short, long)] output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)] block_size: u64,
        /// Store blocks as `<base>/<hash>` URIs instead of inline data
        #[arg(long)] uri_base: Option<String>,
        #[arg(long, default_value_t = false)] image: bool,
    },
    /// Print header, summary and block table of a manifest (path or URL)
    Inspect { source: String },
    /// Check a local file against a manifest
    Verify { manifest: String, file: PathBuf },
    /// Rebuild a file from a manifest, resuming from saved state
    Restore {
        manifest: String,
        output: PathBuf,
        #[arg(long)] state: Option<PathBuf>,
        #[arg(long, default_value_t = 30)] timeout_secs: u64,
    },
    /// Show progress stored in a download state file
    Status { state: PathBuf },
}

fn init_logging(verbose: u8) {
    let level = match verbose { 0 => "warn", 1 => "debug", _ => "trace" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Cmd::Create { input, output, block_size, uri_base, image } => create(&input, &output, block_size, uri_base, image)?,
        Cmd::Inspect { source } => inspect(&source)?,
        Cmd::Verify { manifest, file } => verify(&manifest, &file)?,
        Cmd::Restore { manifest, output, state, timeout_secs } => {
            let state = state.unwrap_or_else(|| state_path_for(&output));
            restore_cmd(&manifest, &output, &state, timeout_secs)?
        }
        Cmd::Status { state } => status(&state)?,
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len()*2);
    for &b in bytes { s.push(LUT[(b>>4) as usize] as char); s.push(LUT[(b&0xF) as usize] as char); }
    s
}

fn state_path_for(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".smfstate");
    output.with_file_name(name)
}

fn load(source: &str) -> Result<Info> {
    codec::decode_from_source(source).with_context(|| format!("decode manifest {}", source))
}

fn create(input: &Path, output: &Path, block_size: u64, uri_base: Option<String>, image: bool) -> Result<()> {
    let cfg = BuildConfig {
        block_size,
        data_type: if uri_base.is_some() { DataType::Uri } else { DataType::Stream },
        encode: if image { EncodeType::Image } else { EncodeType::None },
        uri_base,
    };
    let info = build_from_path(input, &cfg).with_context(|| format!("build manifest for {}", input.display()))?;
    codec::encode_to_file(output, &info).with_context(|| format!("write {}", output.display()))?;
    eprintln!("{}: {} bytes in {} block(s) of {} -> {}", info.name, info.size, info.blocks.len(), info.block_size, output.display());
    Ok(())
}

fn inspect(source: &str) -> Result<()> {
    if !source.starts_with("http://") && !source.starts_with("https://") {
        let mut f = File::open(source).with_context(|| format!("open {}", source))?;
        let h = read_header(&mut f)?;
        println!("version: {}  key: 0x{:02x}", h.version, h.key);
    }
    let info = load(source)?;
    println!("name: {}", info.name);
    println!("status: {:?}  encode: {:?}  type: {:?}", info.status, info.encode, info.data_type);
    println!("size: {}  block_size: {}  blocks: {}/{}", info.size, info.block_size, info.blocks.len(), info.block_count());
    println!("hash: {}", hex(&info.hash));
    let mut blocks: Vec<_> = info.blocks.iter().collect();
    blocks.sort_by_key(|b| b.index);
    for b in blocks {
        match info.block_data(b) {
            BlockData::Inline(d) => println!("  #{:<6} {} inline {} bytes", b.index, hex(&b.hash), d.len()),
            BlockData::Uri(u) => println!("  #{:<6} {} {}", b.index, hex(&b.hash), u),
            BlockData::BadUri(d) => println!("  #{:<6} {} invalid uri ({} bytes)", b.index, hex(&b.hash), d.len()),
        }
    }
    Ok(())
}

fn verify(manifest: &str, file: &Path) -> Result<()> {
    let info = load(manifest)?;
    info.validate().with_context(|| format!("invalid manifest {}", manifest))?;
    let mut f = BufReader::new(File::open(file).with_context(|| format!("open {}", file.display()))?);
    let actual = f.get_ref().metadata()?.len();
    let (mut ok, mut bad) = (0u64, 0u64);
    for b in &info.blocks {
        let (off, want) = (info.block_offset(b.index), info.block_len(b.index));
        // Never allocate more than the file can supply.
        if want > actual.saturating_sub(off) { bad += 1; continue; }
        let mut buf = vec![0u8; want as usize];
        f.seek(SeekFrom::Start(off))?;
        if f.read_exact(&mut buf).is_ok() && block_matches(b, &buf) { ok += 1; } else { bad += 1; }
    }
    let missing = info.missing_blocks().len();
    eprintln!("Blocks ok={}, bad={}, missing={}; size {}", ok, bad, missing, if actual == info.size {"OK"} else {"MISMATCH"});
    if bad == 0 && missing == 0 && actual == info.size { println!("OK"); } else { println!("BAD"); }
    Ok(())
}

fn restore_cmd(manifest: &str, output: &Path, state: &Path, timeout_secs: u64) -> Result<()> {
    let info = load(manifest)?;
    debug!(state = %state.display(), blocks = info.block_count(), "restoring");
    let cfg = FetchConfig::with_timeout(std::time::Duration::from_secs(timeout_secs));
    let rep = restore(&info, output, state, &cfg).with_context(|| format!("restore {}", output.display()))?;
    eprintln!("stored={} already={} bad={} missing={}", rep.blocks_stored, rep.blocks_skipped, rep.blocks_bad, rep.blocks_missing);
    match rep.hash_ok {
        Some(true) => { println!("OK"); Ok(()) }
        Some(false) => Err(anyhow!("restored {} does not match manifest hash", output.display())),
        None => { println!("INCOMPLETE (state saved to {})", state.display()); Ok(()) }
    }
}

fn status(state: &Path) -> Result<()> {
    let meta = download::decode_from_file(state).with_context(|| format!("read state {}", state.display()))?;
    let pct = if meta.download_total > 0 { 100.0 * meta.downloaded as f64 / meta.download_total as f64 } else { 100.0 };
    println!("{}: {}/{} blocks ({:.1}%)", meta.name(), meta.downloaded, meta.download_total, pct);
    let pending: Vec<String> = meta.pending_blocks().map(|i| i.to_string()).collect();
    if !pending.is_empty() { println!("pending: {}", pending.join(",")); }
    Ok(())
}
