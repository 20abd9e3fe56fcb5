//! Digit trie, packed bit vector, multi-view memory-mapped files, a PKZip
//! reader/writer, and a pcap-backed packet capture engine.
//!
//! `syskit` holds the standalone data structures and file-backed containers;
//! `netkit` holds the read-only packet parsers and (behind the `netcap`
//! feature) the live/offline capture engine built on them.

pub mod config;
pub mod error;
pub mod netkit;
pub mod syskit;

// ─────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the most common entry points.
// ─────────────────────────────────────────────────────────────────────────

/// Packed bit vector over a fixed bit count.
pub use syskit::bitvec::BitVec;
/// Digit trie keyed by short digit sequences.
pub use syskit::trie::Trie;

/// Multi-view memory-mapped file.
pub use syskit::mmap::MappedFile;

/// BOM-aware single-view text mapping.
pub use syskit::bom::Bom;
pub use syskit::txtfile::MappedTxtFile;

/// PKZip archive reader and writer.
pub use syskit::zip::{RoZipped, Zipped};

/// 1-based round-robin slot allocator.
pub use syskit::handle::HandleAllocator;

/// 16-bit prime sieve.
pub use syskit::prime::Prime;

/// Read-only zero-copy packet parsers.
pub use netkit::ether::RoEtherPkt;
pub use netkit::icmp::RoIcmpPkt;
pub use netkit::ip::RoIpPkt;
pub use netkit::ipfrag::IpFrag;
pub use netkit::tcp::RoTcpPkt;
pub use netkit::udp::RoUdpPkt;

#[cfg(feature = "netcap")]
pub use netkit::capconfig::CapConfig;
#[cfg(feature = "netcap")]
pub use netkit::capdevice::CapDevice;
#[cfg(feature = "netcap")]
pub use netkit::capfile::CapFile;
#[cfg(feature = "netcap")]
pub use netkit::netcap::{IpCap, NetCap, Stat};
