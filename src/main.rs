//! `netkit-demo` — a thin binary exercising the library end to end.
//!
//! Not part of the crate's public contract. Installs a `tracing` subscriber
//! and dispatches to the library for zip inspection and (behind the
//! `netcap` feature) capture-device listing and live/offline packet
//! capture.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "netkit-demo", about = "Exercises capkit's syskit/netkit layers from the command line")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the entries of a zip archive.
    ZipList { path: PathBuf },
    /// Extract every entry of a zip archive into a directory.
    ZipExtract {
        archive: PathBuf,
        #[arg(default_value = ".")]
        out_dir: PathBuf,
    },
    /// List capture devices visible to libpcap.
    Devices,
    /// Capture packets from a live device or replay an offline file.
    Capture {
        /// Device name (mutually exclusive with `file`).
        #[arg(long)]
        device: Option<String>,
        /// Offline pcap file to replay (mutually exclusive with `device`).
        #[arg(long)]
        file: Option<PathBuf>,
        /// BPF filter expression.
        #[arg(long, default_value = "")]
        filter: String,
        /// Stop after this many packets.
        #[arg(long, default_value_t = 100)]
        count: u64,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "capkit=info",
        1 => "capkit=debug",
        _ => "capkit=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn zip_list(path: &PathBuf) -> Result<()> {
    let archive = capkit::RoZipped::open(path, 0).with_context(|| format!("opening {}", path.display()))?;
    println!("{} ({} items)", path.display(), archive.num_items());
    for i in 0..archive.num_items() {
        println!("  {:>10}  {}", archive.size(i), archive.item(i));
    }
    Ok(())
}

fn zip_extract(archive: &PathBuf, out_dir: &PathBuf) -> Result<()> {
    let zip = capkit::RoZipped::open(archive, 0).with_context(|| format!("opening {}", archive.display()))?;
    let ok = zip.extract_all(out_dir, false).context("extracting archive")?;
    if !ok {
        return Err(anyhow!("extraction did not complete"));
    }
    println!("extracted {} items into {}", zip.num_items(), out_dir.display());
    Ok(())
}

#[cfg(feature = "netcap")]
fn devices() -> Result<()> {
    for d in capkit::CapDevice::instances().context("listing capture devices")? {
        println!("{}  {}", d.name(), d.description().unwrap_or("-"));
    }
    Ok(())
}

#[cfg(not(feature = "netcap"))]
fn devices() -> Result<()> {
    Err(anyhow!("built without the `netcap` feature; rebuild with --features netcap"))
}

#[cfg(feature = "netcap")]
fn capture(device: Option<String>, file: Option<PathBuf>, filter: String, count: u64) -> Result<()> {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    let mut config = capkit::CapConfig::new();
    config.set_filter(filter);

    let mut cap = match (device, file) {
        (Some(name), None) => {
            let dev = capkit::CapDevice::find(&name)?;
            capkit::NetCap::open_live(&dev, config)?
        }
        (None, Some(path)) => {
            let f = capkit::CapFile::new(path);
            capkit::NetCap::open_offline(&f, config)?
        }
        _ => return Err(anyhow!("pass exactly one of --device or --file")),
    };

    let seen = Arc::new(AtomicU64::new(0));
    let seen_in_worker = seen.clone();
    cap.monitor(move |pkt| {
        let n = seen_in_worker.fetch_add(1, Ordering::Relaxed) + 1;
        let ip = pkt.ip();
        println!("#{n} if={} ttl={} proto={}", pkt.if_index(), ip.ttl(), ip.proto());
    });

    while seen.load(Ordering::Relaxed) < count && cap.is_ok() {
        std::thread::sleep(Duration::from_millis(50));
    }
    let stat = cap.stat();
    println!("captured {} bytes in {} packets", stat.bytes_captured, stat.pkts_captured);
    cap.stop_capture();
    Ok(())
}

#[cfg(not(feature = "netcap"))]
fn capture(_device: Option<String>, _file: Option<PathBuf>, _filter: String, _count: u64) -> Result<()> {
    Err(anyhow!("built without the `netcap` feature; rebuild with --features netcap"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::ZipList { path } => zip_list(&path),
        Command::ZipExtract { archive, out_dir } => zip_extract(&archive, &out_dir),
        Command::Devices => devices(),
        Command::Capture { device, file, filter, count } => capture(device, file, filter, count),
    }
}
