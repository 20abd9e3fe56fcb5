//! Read-only and write-only PKZip archive access over [`crate::syskit::mmap::MappedFile`].

mod adapter;
mod format;
mod ro_zipped;
mod zipped;

pub use ro_zipped::{ExtractionProgressCb, RoZipped};
pub use zipped::Zipped;
