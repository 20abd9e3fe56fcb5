//! Multi-view memory-mapped file.
//!
//! A single OS file addressed as an ordered array of *views*. Each view
//! except possibly the last covers exactly `map_size` bytes; `map_size == 0`
//! means "one view over the whole file". When `map_size` is a power of two,
//! `map_size2` caches its log2 so offset-to-view lookup is a shift instead
//! of a division — mirrored from the source's `mapSize2_` field.
//!
//! The OS mapping primitive is [`memmap2`]; the view array, offset bookkeeping,
//! and cross-view byte operations below are not provided by `memmap2` itself
//! (it maps one contiguous region per `Mmap`/`MmapMut`) and are built here.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::error::MappedFileError;

static EMPTY_MARK: u8 = 0;

fn allocation_granularity() -> u32 {
    #[cfg(unix)]
    {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page > 0 {
            return page as u32;
        }
    }
    4096
}

fn round_up_to_granularity(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let g = allocation_granularity();
    ((n + g - 1) / g) * g
}

fn log2_if_power_of_two(n: u32) -> Option<u32> {
    if n != 0 && (n & (n - 1)) == 0 {
        Some(n.trailing_zeros())
    } else {
        None
    }
}

enum View {
    Ro(Mmap),
    Rw(MmapMut),
}

impl View {
    fn as_slice(&self) -> &[u8] {
        match self {
            View::Ro(m) => &m[..],
            View::Rw(m) => &m[..],
        }
    }

    fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            View::Ro(_) => None,
            View::Rw(m) => Some(&mut m[..]),
        }
    }
}

/// A read-only or read-write window onto an OS file, mapped as one or more
/// contiguous views.
pub struct MappedFile {
    path: PathBuf,
    file: File,
    read_only: bool,
    size: u64,
    map_size: u32,
    map_size2: Option<u32>,
    views: Vec<View>,
    offsets: Vec<u64>,
}

impl MappedFile {
    /// Open an existing file. `map_size == 0` means a single view over the
    /// whole file; otherwise it is rounded up to the OS allocation granularity.
    pub fn open(path: impl AsRef<Path>, read_only: bool, map_size: u32) -> Result<Self, MappedFileError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(!read_only).open(&path)?;
        let size = file.metadata()?.len();
        let map_size = if map_size == 0 { 0 } else { round_up_to_granularity(map_size) };
        let mut mf = MappedFile {
            path,
            file,
            read_only,
            size,
            map_size,
            map_size2: map_size.checked_sub(0).and_then(log2_if_power_of_two),
            views: Vec::new(),
            offsets: Vec::new(),
        };
        mf.remap_views()?;
        Ok(mf)
    }

    /// Create a new file of `size` bytes. `fail_if_exists` mirrors
    /// `O_EXCL` semantics.
    pub fn create(path: impl AsRef<Path>, size: u64, fail_if_exists: bool, map_size: u32) -> Result<Self, MappedFileError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .create_new(fail_if_exists)
            .truncate(!fail_if_exists)
            .open(&path)?;
        file.set_len(size)?;
        let map_size = if map_size == 0 { 0 } else { round_up_to_granularity(map_size) };
        let mut mf = MappedFile {
            path,
            file,
            read_only: false,
            size,
            map_size,
            map_size2: log2_if_power_of_two(map_size),
            views: Vec::new(),
            offsets: Vec::new(),
        };
        mf.remap_views()?;
        Ok(mf)
    }

    fn remap_views(&mut self) -> Result<(), MappedFileError> {
        self.views.clear();
        self.offsets.clear();
        if self.size == 0 {
            return Ok(());
        }
        let view_len = if self.map_size == 0 { self.size } else { self.map_size as u64 };
        let mut off = 0u64;
        while off < self.size {
            let len = (self.size - off).min(view_len);
            let view = if self.read_only {
                View::Ro(unsafe { MmapOptions::new().offset(off).len(len as usize).map(&self.file)? })
            } else {
                View::Rw(unsafe { MmapOptions::new().offset(off).len(len as usize).map_mut(&self.file)? })
            };
            self.offsets.push(off);
            self.views.push(view);
            off += len;
        }
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    pub fn num_maps(&self) -> u32 {
        self.views.len() as u32
    }

    /// Byte offset of view `index`. `0` if the file is empty.
    pub fn offset(&self, index: usize) -> u64 {
        self.offsets.get(index).copied().unwrap_or(0)
    }

    pub fn view(&self, index: usize) -> &[u8] {
        self.views.get(index).map(View::as_slice).unwrap_or(std::slice::from_ref(&EMPTY_MARK))
    }

    pub fn view_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.views.get_mut(index).and_then(View::as_mut_slice)
    }

    /// Map a file byte offset to `(view index, offset within view)`.
    fn locate(&self, offset: u64) -> Option<(usize, usize)> {
        if self.views.is_empty() || offset >= self.size {
            return None;
        }
        if self.views.len() == 1 {
            return Some((0, offset as usize));
        }
        let index = match self.map_size2 {
            Some(shift) => (offset >> shift) as usize,
            None => (offset / self.map_size as u64) as usize,
        };
        let index = index.min(self.views.len() - 1);
        Some((index, (offset - self.offsets[index]) as usize))
    }

    /// Read-only access to the byte at `offset`. Returns a pointer to a
    /// static "empty mark" sentinel byte when `offset` is past EOF.
    pub fn addr_of(&self, offset: u64) -> *const u8 {
        match self.locate(offset) {
            Some((vi, vo)) => &self.view(vi)[vo] as *const u8,
            None => &EMPTY_MARK as *const u8,
        }
    }

    /// Copy `byte_count` bytes starting at `offset` into `dst`.
    pub fn get_bytes(&self, dst: &mut [u8], offset: u64, byte_count: usize) {
        let mut remaining = byte_count;
        let mut file_off = offset;
        let mut dst_off = 0usize;
        while remaining > 0 {
            let Some((vi, vo)) = self.locate(file_off) else { break };
            let view = self.view(vi);
            let chunk = remaining.min(view.len() - vo);
            dst[dst_off..dst_off + chunk].copy_from_slice(&view[vo..vo + chunk]);
            remaining -= chunk;
            file_off += chunk as u64;
            dst_off += chunk;
        }
    }

    /// Copy `src` into the file at `offset`. Requires a read-write mapping.
    /// `allow_overlaps` uses memmove-style copying within a view, needed
    /// when `src` aliases a range of this same file (see [`MappedFile::copy_bytes`]).
    pub fn set_bytes(&mut self, offset: u64, src: &[u8], allow_overlaps: bool) -> bool {
        if self.read_only {
            return false;
        }
        let mut remaining = src.len();
        let mut file_off = offset;
        let mut src_off = 0usize;
        while remaining > 0 {
            let Some((vi, vo)) = self.locate(file_off) else { return false };
            let Some(view) = self.view_mut(vi) else { return false };
            let chunk = remaining.min(view.len() - vo);
            let s = &src[src_off..src_off + chunk];
            if allow_overlaps {
                // Within one view, this is equivalent to memmove: build a
                // temporary when source and destination ranges could alias.
                let tmp = s.to_vec();
                view[vo..vo + chunk].copy_from_slice(&tmp);
            } else {
                view[vo..vo + chunk].copy_from_slice(s);
            }
            remaining -= chunk;
            file_off += chunk as u64;
            src_off += chunk;
        }
        true
    }

    /// Copy `byte_count` bytes from `src` to `dst`, both offsets within this
    /// same file. Correct even when the two ranges overlap.
    pub fn copy_bytes(&mut self, dst: u64, src: u64, byte_count: usize) {
        if byte_count == 0 {
            return;
        }
        let mut buf = vec![0u8; byte_count];
        self.get_bytes(&mut buf, src, byte_count);
        self.set_bytes(dst, &buf, true);
    }

    /// Grow the file if it has fewer than `size` bytes. Returns whether
    /// growth occurred.
    pub fn grow(&mut self, size: u64) -> bool {
        if self.size >= size {
            return false;
        }
        self.resize(size)
    }

    /// Truncate the file if it has more than `size` bytes. Returns whether
    /// truncation occurred.
    pub fn truncate(&mut self, size: u64) -> bool {
        if self.size <= size {
            return false;
        }
        self.resize(size)
    }

    /// Unmap every view, resize the underlying file, and remap.
    /// Returns `false` for a read-only file (no-op).
    pub fn resize(&mut self, size: u64) -> bool {
        if self.read_only {
            return false;
        }
        self.views.clear();
        self.offsets.clear();
        if self.file.set_len(size).is_err() {
            return false;
        }
        self.size = size;
        self.remap_views().is_ok()
    }

    /// Discard the current mapping and load from a different path.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> bool {
        match MappedFile::open(path, self.read_only, self.map_size) {
            Ok(fresh) => {
                *self = fresh;
                true
            }
            Err(_) => false,
        }
    }

    /// Close and reopen under a new path/mode/view-size.
    pub fn remap(&mut self, path: impl AsRef<Path>, read_only: bool, map_size: u32) -> bool {
        match MappedFile::open(path, read_only, map_size) {
            Ok(fresh) => {
                *self = fresh;
                true
            }
            Err(_) => false,
        }
    }

    /// Write a copy of this file's contents to `path`.
    pub fn save_in(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::copy(&self.path, path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn view_layout_matches_size_and_view_size() {
        let data = vec![7u8; 10_000];
        let f = write_temp(&data);
        let mf = MappedFile::open(f.path(), true, 4096).unwrap();
        let expected_views = (10_000u64 + 4095) / 4096;
        assert_eq!(mf.num_maps() as u64, expected_views);
        assert_eq!(mf.offset(0), 0);
        if mf.num_maps() > 1 {
            assert_eq!(mf.offset(1) - mf.offset(0), 4096);
        }
    }

    #[test]
    fn get_bytes_after_set_bytes_round_trips() {
        let f = write_temp(&[0u8; 64]);
        let mut mf = MappedFile::open(f.path(), false, 0).unwrap();
        let payload = b"hello world, this is a test payload!";
        assert!(mf.set_bytes(10, payload, false));
        let mut out = vec![0u8; payload.len()];
        mf.get_bytes(&mut out, 10, payload.len());
        assert_eq!(&out, payload);
    }

    #[test]
    fn copy_bytes_handles_overlap() {
        let f = write_temp(b"0123456789ABCDEF");
        let mut mf = MappedFile::open(f.path(), false, 0).unwrap();
        mf.copy_bytes(2, 0, 8);
        let mut out = vec![0u8; 8];
        mf.get_bytes(&mut out, 2, 8);
        assert_eq!(&out, b"01234567");
    }

    #[test]
    fn resize_on_read_only_file_fails() {
        let f = write_temp(b"abc");
        let mut mf = MappedFile::open(f.path(), true, 0).unwrap();
        assert!(!mf.resize(10));
    }

    #[test]
    fn cross_view_get_bytes_spans_boundary() {
        let data: Vec<u8> = (0..200u16).map(|i| (i % 256) as u8).collect();
        let f = write_temp(&data);
        let mf = MappedFile::open(f.path(), true, 64).unwrap();
        let mut out = vec![0u8; 40];
        mf.get_bytes(&mut out, 50, 40);
        assert_eq!(&out[..], &data[50..90]);
    }
}
