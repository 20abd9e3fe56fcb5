//! Offline capture file — a `.pcap`/`.pcapng` path opened for replay instead
//! of a live device.

use std::path::{Path, PathBuf};

use crate::error::CapError;

/// Handle to an on-disk packet capture, opened lazily by
/// [`crate::netkit::netcap::NetCap`] via `pcap::Capture::from_file`.
#[derive(Debug, Clone)]
pub struct CapFile {
    path: PathBuf,
}

impl CapFile {
    /// Does not touch the filesystem; existence and format are checked when
    /// `NetCap` actually opens the capture.
    pub fn new(path: impl AsRef<Path>) -> Self {
        CapFile { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub(crate) fn open(&self) -> Result<pcap::Capture<pcap::Offline>, CapError> {
        pcap::Capture::from_file(&self.path).map_err(|e| CapError::Pcap(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_file_reports_absent() {
        let f = CapFile::new("/nonexistent/path/does-not-exist.pcap");
        assert!(!f.exists());
    }
}
