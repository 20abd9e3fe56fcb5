//! Compile-time tunables.
//!
//! Named constants rather than a config-file parser, mirroring the source's
//! own lack of an external configuration format — `CapConfig` (netkit) is a
//! builder-style struct populated by the caller, not deserialized.

/// Trie small-node capacity. Nodes with 2..=4 children stay in the sorted
/// "small" representation; a 5th child morphs the node to the dense variant.
pub const TRIE_SMALL_MAX_CHILDREN: usize = 4;

/// Mapped-file view size meaning "single view over the whole file".
pub const MMAP_SINGLE_VIEW: u32 = 0;

/// Default capture snap length (bytes) when a caller does not set one.
pub const DEFAULT_CAP_LENGTH: i32 = 65535;

/// Default OS capture ring-buffer size (bytes).
pub const DEFAULT_BUF_SIZE: i32 = 1 << 20;

/// Default pcap read-loop timeout, milliseconds.
pub const DEFAULT_LOOP_TIMEOUT_MS: i32 = 1000;

/// Sentinel for "no thread id" / "not yet started", mirroring the source's
/// `Thread::INVALID_ID`.
pub const INVALID_TID: u64 = u64::MAX;
