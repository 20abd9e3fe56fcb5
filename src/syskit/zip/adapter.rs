//! Virtual-cursor I/O adapter binding a [`MappedFile`] to the six operations
//! (open/close/read/write/seek/tell/error) a zip engine needs. The source
//! wires these as raw C function pointers against `zlib`/`minizip`; here they
//! are plain methods, since this crate hand-rolls the zip container format
//! and only needs the underlying mapped file to look like a seekable stream.

use std::path::Path;

use crate::error::ZipError;
use crate::syskit::mmap::MappedFile;

pub enum Whence {
    Set,
    Cur,
    End,
}

pub(super) struct ZipIoAdapter {
    file: MappedFile,
    cursor: u64,
    true_size: u64,
}

impl ZipIoAdapter {
    pub fn open_ro(path: impl AsRef<Path>, map_size: u32) -> Result<Self, ZipError> {
        let file = MappedFile::open(path, true, map_size)?;
        let size = file.size();
        Ok(ZipIoAdapter { file, cursor: 0, true_size: size })
    }

    pub fn create_rw(path: impl AsRef<Path>, map_size: u32) -> Result<Self, ZipError> {
        let file = MappedFile::create(path, map_size.max(4096) as u64, false, map_size)?;
        Ok(ZipIoAdapter { file, cursor: 0, true_size: 0 })
    }

    pub fn tell(&self) -> u64 {
        self.cursor
    }

    pub fn size(&self) -> u64 {
        self.true_size
    }

    pub fn seek(&mut self, offset: i64, whence: Whence) -> bool {
        let base = match whence {
            Whence::Set => 0i64,
            Whence::Cur => self.cursor as i64,
            Whence::End => self.true_size as i64,
        };
        let target = base + offset;
        if target < 0 {
            return false;
        }
        self.cursor = target as u64;
        true
    }

    /// Copy up to `buf.len()` bytes from the virtual cursor, advancing it.
    /// Returns the number of bytes actually read (short at EOF).
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let avail = self.file.size().saturating_sub(self.cursor).min(buf.len() as u64) as usize;
        if avail == 0 {
            return 0;
        }
        self.file.get_bytes(&mut buf[..avail], self.cursor, avail);
        self.cursor += avail as u64;
        avail
    }

    /// Write `buf` at the virtual cursor, growing the backing file by
    /// doubling until it fits, then advance the cursor and `true_size`.
    pub fn write(&mut self, buf: &[u8]) -> bool {
        let needed_end = self.cursor + buf.len() as u64;
        if needed_end > self.file.size() {
            let mut new_size = self.file.size().max(4096);
            while new_size < needed_end {
                new_size *= 2;
            }
            if !self.file.grow(new_size) {
                return false;
            }
        }
        if !self.file.set_bytes(self.cursor, buf, false) {
            return false;
        }
        self.cursor += buf.len() as u64;
        self.true_size = self.true_size.max(self.cursor);
        true
    }

    /// Truncate the backing file to the logical (`true_size`) length written
    /// so far, discarding the doubling slack.
    pub fn close(mut self) -> bool {
        self.file.truncate(self.true_size) || self.file.size() == self.true_size
    }
}
