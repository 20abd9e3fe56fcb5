//! Crate-wide error enums.
//!
//! Each type here covers exactly the operations in its module that are
//! genuinely `Result`-shaped in Rust (resource acquisition: opening a file,
//! mapping it, compiling a filter). Everything modeled directly on the
//! original containers (`BitVec`, `Trie`, the packet parsers) keeps its
//! `isOk()` / boolean / `Option` surface instead — see the module docs.

use std::fmt;
use std::io;

/// Failures from [`crate::syskit::mmap::MappedFile`] construction and resizing.
#[derive(Debug)]
pub enum MappedFileError {
    Io(io::Error),
    ReadOnly,
    ResizeFailed,
}

impl fmt::Display for MappedFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedFileError::Io(e) => write!(f, "mapped file I/O error: {e}"),
            MappedFileError::ReadOnly => write!(f, "file is read-only"),
            MappedFileError::ResizeFailed => write!(f, "resize failed"),
        }
    }
}

impl std::error::Error for MappedFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MappedFileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MappedFileError {
    fn from(e: io::Error) -> Self {
        MappedFileError::Io(e)
    }
}

/// Failures from [`crate::syskit::zip`] archive open/extract/write operations.
#[derive(Debug)]
pub enum ZipError {
    BadArchive,
    ItemNotFound,
    Cancelled,
    Io(io::Error),
}

impl fmt::Display for ZipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZipError::BadArchive => write!(f, "not a valid zip archive"),
            ZipError::ItemNotFound => write!(f, "item not found in archive"),
            ZipError::Cancelled => write!(f, "extraction canceled"),
            ZipError::Io(e) => write!(f, "zip I/O error: {e}"),
        }
    }
}

impl std::error::Error for ZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ZipError {
    fn from(e: io::Error) -> Self {
        ZipError::Io(e)
    }
}

impl From<MappedFileError> for ZipError {
    fn from(e: MappedFileError) -> Self {
        match e {
            MappedFileError::Io(e) => ZipError::Io(e),
            MappedFileError::ReadOnly | MappedFileError::ResizeFailed => ZipError::BadArchive,
        }
    }
}

/// Failures from [`crate::netkit::netcap::NetCap`] construction and repair.
#[derive(Debug)]
pub enum CapError {
    DeviceNotFound,
    NotEthernet,
    FilterCompile(String),
    FilterInstall(String),
    Pcap(String),
}

impl fmt::Display for CapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapError::DeviceNotFound => write!(f, "capture device not found"),
            CapError::NotEthernet => write!(f, "device link type is not Ethernet"),
            CapError::FilterCompile(e) => write!(f, "filter compile failed: {e}"),
            CapError::FilterInstall(e) => write!(f, "filter install failed: {e}"),
            CapError::Pcap(e) => write!(f, "pcap error: {e}"),
        }
    }
}

impl std::error::Error for CapError {}
