use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use dat_core::{AssetStore, Compression, DatArchive, DatWriter};
use dat_records::{portal, DatFileType, DatManager, DatRecord};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "datmotion",
    about = "Pack, inspect, and query motion DAT containers",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a container from a directory of `<hex id>.bin` record files
    Pack {
        /// Directory holding one file per record, e.g. `09000001.bin`
        input: PathBuf,
        /// Destination container
        output: PathBuf,
        /// Record compression: none | zstd | lz4
        #[arg(short, long, default_value = "zstd")]
        compression: String,
        /// Zstd compression level (1–22, only used with --compression zstd)
        #[arg(long, default_value_t = 3)]
        zstd_level: i32,
    },
    /// Print header metadata and index statistics
    Inspect {
        #[arg(long, env = "DAT_FILE")]
        dat: PathBuf,
        /// Print per-record details
        #[arg(long)]
        entries: bool,
    },
    /// Decode one record by id and print it as JSON
    Dump {
        /// Asset id (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_id)]
        id: u32,
        #[arg(long, env = "DAT_FILE")]
        dat: PathBuf,
    },
    /// Resolve the duration of a motion from a motion table
    AnimLength {
        /// Motion table id
        #[arg(value_parser = parse_id)]
        table: u32,
        /// Requested motion command
        #[arg(value_parser = parse_id)]
        motion: u32,
        /// Stance (defaults to the table's default style)
        #[arg(long, value_parser = parse_id)]
        stance: Option<u32>,
        /// Current motion state (defaults to the stance's default motion)
        #[arg(long, value_parser = parse_id)]
        state: Option<u32>,
        #[arg(long, env = "DAT_FILE")]
        dat: PathBuf,
    },
    /// Measure cold and warm cached lookups over random record ids
    Bench {
        #[arg(long, env = "DAT_FILE")]
        dat: PathBuf,
        /// Number of random lookups
        #[arg(short, long, default_value_t = 1000)]
        count: u64,
        /// Fixed random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid id '{s}': {e}"))
}

/// Record files are named by their id in hex, with or without `0x`.
fn id_from_file_name(path: &Path) -> Option<u32> {
    if path.extension()? != "bin" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let hex = stem.strip_prefix("0x").unwrap_or(stem);
    u32::from_str_radix(hex, 16).ok()
}

fn compression_from_name(name: &str, zstd_level: i32) -> anyhow::Result<Compression> {
    match name {
        "none" | "passthrough" => Ok(Compression::None),
        "zstd" | "z" => Ok(Compression::Zstd { level: zstd_level }),
        "lz4" | "l" => Ok(Compression::Lz4),
        other => anyhow::bail!("unknown compression '{}'. Valid options: none, zstd, lz4", other),
    }
}

fn open_archive(path: &Path) -> anyhow::Result<DatArchive> {
    DatArchive::open(path).with_context(|| format!("opening container {:?}", path))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn type_name(id: u32) -> &'static str {
    DatFileType::from_id(id).map_or("unknown", |t| t.name())
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_pack(input: PathBuf, output: PathBuf, compression: &str, zstd_level: i32) -> anyhow::Result<()> {
    let compression = compression_from_name(compression, zstd_level)?;

    let mut files: Vec<(u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&input).with_context(|| format!("reading directory {:?}", input))? {
        let path = entry?.path();
        match id_from_file_name(&path) {
            Some(id) => files.push((id, path)),
            None => debug!(path = %path.display(), "skipping file without a hex id name"),
        }
    }
    files.sort_by_key(|(id, _)| *id);

    let mut writer = DatWriter::create(&output, compression)
        .with_context(|| format!("creating output file {:?}", output))?;
    let t0 = Instant::now();
    let mut raw_total = 0u64;
    for (id, path) in &files {
        let bytes = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;
        if let Err(e) = DatRecord::decode(*id, &bytes) {
            warn!(id = %format!("{id:#010x}"), error = %e, "record does not decode; packing anyway");
        }
        raw_total += bytes.len() as u64;
        writer.add(*id, &bytes)?;
    }
    let count = writer.finish()?;
    let elapsed = t0.elapsed();

    let stored = std::fs::metadata(&output)?.len();
    eprintln!("  compression : {}", compression.name());
    eprintln!("  records     : {}", count);
    eprintln!("  raw size    : {}", human_bytes(raw_total));
    eprintln!("  file size   : {}", human_bytes(stored));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(dat: PathBuf, show_entries: bool) -> anyhow::Result<()> {
    let archive = open_archive(&dat)?;
    let file_size = std::fs::metadata(&dat)?.len();

    let mut by_type: HashMap<&'static str, usize> = HashMap::new();
    for id in archive.asset_ids() {
        *by_type.entry(type_name(id)).or_default() += 1;
    }
    let mut by_type: Vec<_> = by_type.into_iter().collect();
    by_type.sort();

    println!("=== Motion DAT: {:?} ===", dat);
    println!();
    println!("  format version : {}", archive.header.version);
    println!(
        "  compression    : {} (id={})",
        archive.compression().name(),
        archive.header.compression_id
    );
    println!("  records        : {}", archive.entry_count());
    for (name, n) in &by_type {
        println!("    {:<13}: {}", name, n);
    }
    println!("  raw size       : {}", human_bytes(archive.raw_size()));
    println!("  stored         : {}", human_bytes(archive.stored_size()));
    println!("  file on disk   : {}", human_bytes(file_size));
    println!("  ratio          : {:.2}x", archive.ratio());
    println!("  flags          : 0x{:016x}", archive.header.flags);

    if show_entries {
        println!();
        println!(
            "  {:>10}  {:<13}  {:>12}  {:>12}  {:>12}  {:>16}",
            "id", "type", "offset", "stored", "raw", "checksum"
        );
        println!("  {}", "-".repeat(84));
        for e in archive.entries() {
            println!(
                "  {:#010x}  {:<13}  {:>12}  {:>12}  {:>12}  {:016x}",
                e.asset_id,
                type_name(e.asset_id),
                e.offset,
                human_bytes(e.compressed_len as u64),
                human_bytes(e.raw_len as u64),
                e.checksum
            );
        }
    }
    Ok(())
}

fn run_dump(id: u32, dat: PathBuf) -> anyhow::Result<()> {
    let archive = open_archive(&dat)?;
    let bytes = archive.fetch_bytes(id)?;
    let record = DatRecord::decode(id, &bytes).with_context(|| format!("decoding record {id:#010x}"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn run_anim_length(
    table_id: u32,
    motion: u32,
    stance: Option<u32>,
    state: Option<u32>,
    dat: PathBuf,
) -> anyhow::Result<()> {
    let archive = open_archive(&dat)?;
    if portal::init(DatManager::new(archive)).is_err() {
        anyhow::bail!("DAT portal already initialized");
    }
    let dats = portal::get().context("DAT portal not initialized")?;

    let length = match (state, stance) {
        (None, None) => dats.animation_length(table_id, motion)?,
        (None, Some(stance)) => dats.animation_length_in_style(table_id, stance, motion)?,
        (Some(state), stance) => {
            let stance = match stance {
                Some(stance) => stance,
                None => dats.get_motion_table(table_id)?.default_style,
            };
            dats.animation_length_from(table_id, state, stance, motion)?
        }
    };

    info!(
        table = %format!("{table_id:#010x}"),
        motion = %format!("{motion:#010x}"),
        length,
        "resolved"
    );
    if length == 0.0 {
        eprintln!("  no link for motion {:#010x}", motion);
    }
    println!("{length:.4}");
    Ok(())
}

fn run_bench(dat: PathBuf, count: u64, seed: u64) -> anyhow::Result<()> {
    let archive = open_archive(&dat)?;
    let ids: Vec<u32> = archive
        .asset_ids()
        .into_iter()
        .filter(|id| DatFileType::from_id(*id).is_some())
        .collect();
    if ids.is_empty() {
        anyhow::bail!("container has no decodable records");
    }
    let dats = DatManager::new(archive);

    // Simple LCG for reproducible random ids (no external dep)
    let picks: Vec<u32> = {
        let mut rng = seed;
        (0..count)
            .map(|_| {
                rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ids[((rng >> 33) % ids.len() as u64) as usize]
            })
            .collect()
    };

    eprintln!("benchmarking {} lookups across {} records...", count, ids.len());

    let mut cold_us: Vec<u64> = Vec::new();
    let mut warm_us: Vec<u64> = Vec::new();
    let mut failures = 0u64;
    let mut seen = std::collections::HashSet::new();
    let t0 = Instant::now();

    for &id in &picks {
        let t = Instant::now();
        let ok = match DatFileType::from_id(id) {
            Some(DatFileType::MotionTable) => dats.get_motion_table(id).is_ok(),
            Some(DatFileType::Animation) => dats.get_animation(id).is_ok(),
            Some(DatFileType::String) => dats.get_string(id).is_ok(),
            None => false,
        };
        let us = t.elapsed().as_micros() as u64;
        if !ok {
            failures += 1;
        }
        if seen.insert(id) {
            cold_us.push(us);
        } else {
            warm_us.push(us);
        }
    }
    let elapsed = t0.elapsed();

    println!();
    println!("=== Cached Lookup Benchmark ===");
    println!("  lookups     : {}", count);
    println!("  failures    : {}", failures);
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    for (label, mut latencies) in [("cold", cold_us), ("warm", warm_us)] {
        if latencies.is_empty() {
            continue;
        }
        latencies.sort_unstable();
        let pct = |p: f64| latencies[((latencies.len() as f64 * p) as usize).min(latencies.len() - 1)];
        println!("  {} ({} lookups):", label, latencies.len());
        println!("    min  : {} µs", latencies[0]);
        println!("    p50  : {} µs", pct(0.50));
        println!("    p95  : {} µs", pct(0.95));
        println!("    p99  : {} µs", pct(0.99));
        println!("    max  : {} µs", latencies[latencies.len() - 1]);
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Pack {
            input,
            output,
            compression,
            zstd_level,
        } => run_pack(input, output, &compression, zstd_level),
        Commands::Inspect { dat, entries } => run_inspect(dat, entries),
        Commands::Dump { id, dat } => run_dump(id, dat),
        Commands::AnimLength {
            table,
            motion,
            stance,
            state,
            dat,
        } => run_anim_length(table, motion, stance, state, dat),
        Commands::Bench { dat, count, seed } => run_bench(dat, count, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("0x09000001").unwrap(), 0x0900_0001);
        assert_eq!(parse_id("0X10"), Ok(16));
        assert_eq!(parse_id("42"), Ok(42));
        assert!(parse_id("0xZZ").is_err());
    }

    #[test]
    fn test_id_from_file_name() {
        assert_eq!(id_from_file_name(Path::new("dir/09000001.bin")), Some(0x0900_0001));
        assert_eq!(id_from_file_name(Path::new("0x31000002.bin")), Some(0x3100_0002));
        assert_eq!(id_from_file_name(Path::new("notes.txt")), None);
        assert_eq!(id_from_file_name(Path::new("table.bin")), None);
    }

    #[test]
    fn test_compression_from_name() {
        assert_eq!(compression_from_name("lz4", 3).unwrap(), Compression::Lz4);
        assert_eq!(
            compression_from_name("zstd", 9).unwrap(),
            Compression::Zstd { level: 9 }
        );
        assert!(compression_from_name("brotli", 3).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
