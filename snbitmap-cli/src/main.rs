use anyhow::{Context, Result};
use clap::Parser;
use snbitmap::SerialBitmap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod ranges;

use ranges::SerialRanges;

/// Capacity used when neither `--capacity` nor `--load` is given.
const DEFAULT_CAPACITY: u64 = 1000;

/// Record serial numbers in a bitmap and check that none are missing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of serial numbers to track (default 1000)
    #[arg(short, long, conflicts_with = "load")]
    capacity: Option<u64>,

    /// Load a saved bitmap image instead of creating an empty one
    #[arg(short, long)]
    load: Option<PathBuf>,

    /// Serial numbers to record, e.g. "0-1,5,7-9"
    #[arg(short, long)]
    record: Option<SerialRanges>,

    /// Record every serial number in 0..capacity
    #[arg(short, long)]
    all: bool,

    /// Serial numbers to look up, e.g. "0-2"
    #[arg(short, long)]
    query: Option<SerialRanges>,

    /// Maximum number of missing serial numbers to list
    #[arg(short = 'm', long, default_value_t = 10)]
    show_missing: usize,

    /// Write the bitmap image to this path before exiting
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_bitmap(args: &Args) -> Result<SerialBitmap> {
    match &args.load {
        Some(path) => {
            let image = fs::read(path)
                .with_context(|| format!("Failed to read bitmap image {}", path.display()))?;
            let bitmap = SerialBitmap::from_bytes(image)
                .with_context(|| format!("Invalid bitmap image {}", path.display()))?;
            info!(path = %path.display(), "loaded bitmap image");
            Ok(bitmap)
        }
        None => {
            let capacity = args.capacity.unwrap_or(DEFAULT_CAPACITY);
            SerialBitmap::create(capacity).context("Failed to create bitmap")
        }
    }
}

fn record(bitmap: &mut SerialBitmap, serials: &SerialRanges) -> Result<u64> {
    let mut duplicates = 0u64;

    for sn in serials.iter() {
        if bitmap
            .test_and_set(sn)
            .with_context(|| format!("Failed to record serial number {sn}"))?
        {
            debug!(sn, "duplicate serial number");
            duplicates += 1;
        }
    }

    Ok(duplicates)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut bitmap = open_bitmap(&args)?;
    let capacity = bitmap.capacity()?;
    println!("Bitmap capacity: {capacity}");

    if let Some(serials) = &args.record {
        let duplicates = record(&mut bitmap, serials)?;
        if duplicates > 0 {
            warn!(duplicates, "some serial numbers were already recorded");
        }
    }

    if args.all {
        for sn in 0..capacity {
            bitmap.set(sn)?;
        }
    }

    if let Some(serials) = &args.query {
        for sn in serials.iter() {
            let state = if bitmap.check(sn)? { "Set" } else { "Clear" };
            println!("Elem[{sn}]:\t{state}");
        }
    }

    let full = bitmap.is_full()?;
    println!("Recorded:\t{}/{capacity}", bitmap.count()?);
    println!("All_check:\t{}", if full { "Full" } else { "HasVacancy" });

    if !full && args.show_missing > 0 {
        let missing: Vec<String> = bitmap
            .vacancies()?
            .take(args.show_missing)
            .map(|sn| sn.to_string())
            .collect();
        println!("Missing:\t{}", missing.join(", "));
    }

    if let Some(path) = &args.save {
        fs::write(path, bitmap.as_bytes())
            .with_context(|| format!("Failed to write bitmap image {}", path.display()))?;
        info!(
            path = %path.display(),
            bytes = bitmap.as_bytes().len(),
            "saved bitmap image"
        );
    }

    bitmap.release();
    Ok(())
}
