//! Live/offline packet capture engine.
//!
//! Requires the `netcap` feature (pulls in the optional `pcap` dependency).
//! A dedicated worker thread runs the capture loop; the three mutable
//! counters it touches are serialized through a [`std::sync::Mutex`]
//! (§10.5 decision) rather than a hand-rolled spin section, since Rust's
//! uncontended-mutex fast path is already as cheap as the thing it would
//! replace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::config::INVALID_TID;
use crate::error::CapError;
use crate::netkit::capconfig::CapConfig;
use crate::netkit::capdevice::CapDevice;
use crate::netkit::capfile::CapFile;
use crate::netkit::ether::RoEtherPkt;
use crate::netkit::ip::RoIpPkt;
use crate::syskit::handle::HandleAllocator;

/// Pseudo-interface-id registry. `repair()` re-resolves the OS-level device
/// (whose index may have changed) while this crate's own stable identifier
/// for the capture survives — the registry is what makes that identifier
/// stable across repairs instead of just being the OS index restated.
fn pseudo_if_registry() -> &'static Mutex<HandleAllocator> {
    static REGISTRY: OnceLock<Mutex<HandleAllocator>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HandleAllocator::new(4096)))
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    bytes_captured: u64,
    bytes_dropped: u64,
    pkts_captured: u64,
    last_cap_time: u64,
}

/// Point-in-time snapshot of a capture's counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stat {
    pub bytes_captured: u64,
    pub bytes_dropped: u64,
    pub pkts_captured: u64,
    pub pkts_dropped: u64,
    pub pkts_filtered: u64,
}

/// An IPv4 datagram observed during a capture, with the enclosing Ethernet
/// frame, the interface it arrived on, and the capture timestamp.
///
/// Holds an owned copy of the frame rather than a zero-copy view into the
/// pcap buffer: the buffer's lifetime ends when `next_packet` is called
/// again, which would otherwise tie every registered callback to a borrow
/// the worker loop can't express without unsafe. `ether()`/`ip()` parse
/// fresh views from the owned bytes on each call.
pub struct IpCap {
    ether_frame: Vec<u8>,
    if_index: u32,
    cap_time_us: u64,
}

impl IpCap {
    pub fn ether(&self) -> RoEtherPkt<'_> {
        RoEtherPkt::new(&self.ether_frame, false)
    }

    pub fn ip(&self) -> RoIpPkt<'_> {
        let hdr_len = self.ether().hdr_length();
        RoIpPkt::new(&self.ether_frame[hdr_len..], false)
    }

    pub fn if_index(&self) -> u32 {
        self.if_index
    }

    pub fn cap_time_us(&self) -> u64 {
        self.cap_time_us
    }
}

type PacketCallback = dyn FnMut(&IpCap) + Send;

enum Source {
    Live(CapDevice),
    Offline(CapFile),
}

/// A running (or stopped) packet capture.
pub struct NetCap {
    config: CapConfig,
    source: Source,
    pseudo_if: u32,
    ok: Arc<AtomicBool>,
    last_err: Arc<Mutex<String>>,
    counters: Arc<Mutex<Counters>>,
    stop: Arc<AtomicBool>,
    packet_cb: Arc<Mutex<Option<Box<PacketCallback>>>>,
    worker: Option<thread::JoinHandle<()>>,
    tid: u64,
}

fn direction_of(cap_ic_pkts: bool, cap_og_pkts: bool) -> Result<pcap::Direction, CapError> {
    match (cap_ic_pkts, cap_og_pkts) {
        (false, false) => Err(CapError::FilterCompile("capIcPkts and capOgPkts cannot both be false".into())),
        (false, true) => Ok(pcap::Direction::Out),
        (true, true) => Ok(pcap::Direction::InOut),
        (true, false) => Ok(pcap::Direction::In),
    }
}

fn now_micros() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros() as u64).unwrap_or(0)
}

impl NetCap {
    /// Open a live capture on `device`.
    pub fn open_live(device: &CapDevice, config: CapConfig) -> Result<Self, CapError> {
        let pcap_device = pcap::Device::list()
            .map_err(|e| CapError::Pcap(e.to_string()))?
            .into_iter()
            .find(|d| d.name == device.name())
            .ok_or(CapError::DeviceNotFound)?;

        let inactive = pcap::Capture::from_device(pcap_device)
            .map_err(|e| CapError::Pcap(e.to_string()))?
            .promisc(config.promiscuous())
            .snaplen(config.snap_length())
            .buffer_size(config.buf_size())
            .timeout(config.loop_timeout_ms());

        let mut active = inactive.open().map_err(|e| CapError::Pcap(e.to_string()))?;
        Self::check_ethernet(&active)?;

        if !config.filter().is_empty() {
            active.filter(config.filter(), true).map_err(|e| CapError::FilterCompile(e.to_string()))?;
        }
        let dir = direction_of(config.cap_ic_pkts(), config.cap_og_pkts())?;
        active.direction(dir).map_err(|e| CapError::FilterInstall(e.to_string()))?;

        info!(device = device.name(), "capture opened");
        Ok(Self::spawn(Source::Live(device.clone()), config, CaptureHandle::Live(active)))
    }

    /// Open an offline (replay) capture over a pcap file.
    pub fn open_offline(file: &CapFile, config: CapConfig) -> Result<Self, CapError> {
        let mut active = file.open()?;
        Self::check_ethernet_offline(&active)?;
        if !config.filter().is_empty() {
            active.filter(config.filter(), true).map_err(|e| CapError::FilterCompile(e.to_string()))?;
        }
        info!(file = %file.path().display(), "offline capture opened");
        Ok(Self::spawn(Source::Offline(file.clone()), config, CaptureHandle::Offline(active)))
    }

    fn check_ethernet(cap: &pcap::Capture<pcap::Active>) -> Result<(), CapError> {
        if cap.get_datalink() != pcap::Linktype::ETHERNET {
            return Err(CapError::NotEthernet);
        }
        Ok(())
    }

    fn check_ethernet_offline(cap: &pcap::Capture<pcap::Offline>) -> Result<(), CapError> {
        if cap.get_datalink() != pcap::Linktype::ETHERNET {
            return Err(CapError::NotEthernet);
        }
        Ok(())
    }

    fn spawn(source: Source, config: CapConfig, handle: CaptureHandle) -> Self {
        let ok = Arc::new(AtomicBool::new(true));
        let last_err = Arc::new(Mutex::new(String::new()));
        let counters = Arc::new(Mutex::new(Counters::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let packet_cb: Arc<Mutex<Option<Box<PacketCallback>>>> = Arc::new(Mutex::new(None));
        let pseudo_if = pseudo_if_registry().lock().unwrap().allocate();

        let stack_size = config.agent_stack_size();
        let mut builder = thread::Builder::new().name(format!("netcap-{pseudo_if}"));
        if stack_size != 0 {
            builder = builder.stack_size(stack_size);
        }

        let snap_length = config.snap_length();
        let is_offline = matches!(source, Source::Offline(_));

        let worker_ok = ok.clone();
        let worker_err = last_err.clone();
        let worker_counters = counters.clone();
        let worker_stop = stop.clone();
        let worker_cb = packet_cb.clone();

        let worker = builder
            .spawn(move || {
                run_capture_loop(handle, is_offline, snap_length, pseudo_if, worker_ok, worker_err, worker_counters, worker_stop, worker_cb);
            })
            .expect("spawning the capture worker thread");

        NetCap {
            config,
            source,
            pseudo_if,
            ok,
            last_err,
            counters,
            stop,
            packet_cb,
            worker: Some(worker),
            tid: pseudo_if as u64,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok.load(Ordering::Acquire)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.source, Source::Live(_))
    }

    pub fn config(&self) -> &CapConfig {
        &self.config
    }

    pub fn last_err(&self) -> String {
        self.last_err.lock().unwrap().clone()
    }

    pub fn if_index(&self) -> u32 {
        self.pseudo_if
    }

    /// This crate's own stable identifier for the worker, not the OS thread
    /// id; [`crate::config::INVALID_TID`] marks a never-started capture.
    pub fn tid(&self) -> u64 {
        if self.worker.is_some() {
            self.tid
        } else {
            INVALID_TID
        }
    }

    pub fn name(&self) -> String {
        match &self.source {
            Source::Live(d) => d.name().to_string(),
            Source::Offline(f) => f.name(),
        }
    }

    /// Register the packet callback. Replaces any previously registered one.
    pub fn monitor(&self, cb: impl FnMut(&IpCap) + Send + 'static) {
        *self.packet_cb.lock().unwrap() = Some(Box::new(cb));
    }

    /// A snapshot of the live-updated counters. `bytes_dropped` counts bytes
    /// discarded by offline snap-length truncation; kernel-level
    /// `pkts_dropped`/`pkts_filtered` are not wired up (always zero).
    pub fn stat(&self) -> Stat {
        let c = *self.counters.lock().unwrap();
        Stat {
            bytes_captured: c.bytes_captured,
            bytes_dropped: c.bytes_dropped,
            pkts_captured: c.pkts_captured,
            pkts_dropped: 0,
            pkts_filtered: 0,
        }
    }

    /// Cooperatively stop the worker and join it.
    pub fn stop_capture(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        debug!(if_index = self.pseudo_if, "capture worker joined");
    }

    /// Re-resolve the live device (its OS interface index may have changed)
    /// while keeping this capture's pseudo-interface-id stable. No-op for
    /// offline captures.
    pub fn repair(&mut self) -> Result<(), CapError> {
        let Source::Live(device) = &self.source else {
            return Ok(());
        };
        self.stop_capture();
        let config = self.config.clone();
        let repaired = Self::open_live(device, config)?;
        self.ok = repaired.ok;
        self.last_err = repaired.last_err;
        self.counters = repaired.counters;
        self.stop = repaired.stop;
        self.packet_cb = repaired.packet_cb;
        self.worker = repaired.worker;
        self.tid = repaired.tid;
        warn!(device = device.name(), "capture repaired");
        Ok(())
    }
}

impl Drop for NetCap {
    fn drop(&mut self) {
        self.stop_capture();
        pseudo_if_registry().lock().unwrap().free(self.pseudo_if);
    }
}

enum CaptureHandle {
    Live(pcap::Capture<pcap::Active>),
    Offline(pcap::Capture<pcap::Offline>),
}

#[allow(clippy::too_many_arguments)]
fn run_capture_loop(
    mut handle: CaptureHandle,
    is_offline: bool,
    snap_length: i32,
    if_index: u32,
    ok: Arc<AtomicBool>,
    last_err: Arc<Mutex<String>>,
    counters: Arc<Mutex<Counters>>,
    stop: Arc<AtomicBool>,
    packet_cb: Arc<Mutex<Option<Box<PacketCallback>>>>,
) {
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let next = match &mut handle {
            CaptureHandle::Live(c) => c.next_packet(),
            CaptureHandle::Offline(c) => c.next_packet(),
        };
        let packet = match next {
            Ok(p) => p,
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => {
                *last_err.lock().unwrap() = e.to_string();
                ok.store(false, Ordering::Release);
                break;
            }
        };

        let mut data = packet.data.to_vec();
        let mut dropped = 0u64;
        if is_offline && snap_length > 0 && data.len() > snap_length as usize {
            dropped = (data.len() - snap_length as usize) as u64;
            data.truncate(snap_length as usize);
        }

        {
            let mut c = counters.lock().unwrap();
            c.bytes_captured += data.len() as u64;
            c.bytes_dropped += dropped;
            c.pkts_captured += 1;
            c.last_cap_time = now_micros();
        }

        let ether = RoEtherPkt::new(&data, false);
        if !ether.is_ok() {
            continue;
        }
        let ip = RoIpPkt::from_ether(&ether, false);
        if !ip.is_ok() || ip.version() != 4 {
            continue;
        }

        let ip_cap = IpCap { ether_frame: data, if_index, cap_time_us: now_micros() };
        if let Some(cb) = packet_cb.lock().unwrap().as_mut() {
            cb(&ip_cap);
        }
    }

    debug!(if_index, "capture worker exiting");
}
