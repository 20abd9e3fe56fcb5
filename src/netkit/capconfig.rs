//! Capture-device configurable characteristics.

use crate::config::{DEFAULT_BUF_SIZE, DEFAULT_CAP_LENGTH, DEFAULT_LOOP_TIMEOUT_MS};

/// Builder-style configuration for a [`crate::netkit::netcap::NetCap`]
/// capture. Not a deserialized config file — this stack's `config` module
/// convention is named constants with defaults, and `CapConfig` is the
/// runtime object callers mutate from those defaults before opening a
/// capture.
#[derive(Debug, Clone)]
pub struct CapConfig {
    name: String,
    snap_length: i32,
    buf_size: i32,
    loop_timeout_ms: i32,
    promiscuous: bool,
    cap_ic_pkts: bool,
    cap_og_pkts: bool,
    filter: String,
    agent_stack_size: usize,
}

impl Default for CapConfig {
    fn default() -> Self {
        CapConfig {
            name: String::new(),
            snap_length: DEFAULT_CAP_LENGTH,
            buf_size: DEFAULT_BUF_SIZE,
            loop_timeout_ms: DEFAULT_LOOP_TIMEOUT_MS,
            promiscuous: true,
            cap_ic_pkts: true,
            cap_og_pkts: true,
            filter: String::new(),
            agent_stack_size: 0,
        }
    }
}

impl CapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn snap_length(&self) -> i32 {
        self.snap_length
    }

    pub fn set_snap_length(&mut self, snap_length: i32) {
        self.snap_length = snap_length;
    }

    pub fn buf_size(&self) -> i32 {
        self.buf_size
    }

    pub fn set_buf_size(&mut self, buf_size: i32) {
        self.buf_size = buf_size;
    }

    pub fn loop_timeout_ms(&self) -> i32 {
        self.loop_timeout_ms
    }

    pub fn set_loop_timeout_ms(&mut self, ms: i32) {
        self.loop_timeout_ms = ms;
    }

    pub fn promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn set_promiscuous(&mut self, promiscuous: bool) {
        self.promiscuous = promiscuous;
    }

    pub fn cap_ic_pkts(&self) -> bool {
        self.cap_ic_pkts
    }

    pub fn cap_og_pkts(&self) -> bool {
        self.cap_og_pkts
    }

    /// Set which packet directions to capture. `(false, false)` is illegal
    /// (the engine has no "capture nothing" direction) and is rejected.
    pub fn set_direction(&mut self, cap_ic_pkts: bool, cap_og_pkts: bool) -> bool {
        if !cap_ic_pkts && !cap_og_pkts {
            return false;
        }
        self.cap_ic_pkts = cap_ic_pkts;
        self.cap_og_pkts = cap_og_pkts;
        true
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Worker thread stack size in bytes; `0` means the OS default.
    pub fn agent_stack_size(&self) -> usize {
        self.agent_stack_size
    }

    pub fn set_agent_stack_size(&mut self, bytes: usize) {
        self.agent_stack_size = bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_capture_both_directions() {
        let cfg = CapConfig::new();
        assert!(cfg.cap_ic_pkts());
        assert!(cfg.cap_og_pkts());
    }

    #[test]
    fn rejects_capturing_neither_direction() {
        let mut cfg = CapConfig::new();
        assert!(!cfg.set_direction(false, false));
        assert!(cfg.cap_ic_pkts());
    }
}
