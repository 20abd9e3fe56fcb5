//! Read-only zipped archive.

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use filetime::{set_file_mtime, FileTime};
use flate2::read::DeflateDecoder;

use crate::error::ZipError;
use crate::syskit::mmap::MappedFile;
use crate::syskit::zip::adapter::{Whence, ZipIoAdapter};
use crate::syskit::zip::format;

/// A type signature invoked once per chunk read during extraction:
/// `(items_extracted, items_being_extracted, bytes_extracted, bytes_being_extracted)`.
/// Returning `false` cancels the in-progress extraction.
pub type ExtractionProgressCb = dyn FnMut(u32, u32, u64, u64) -> bool;

#[derive(Debug, Clone)]
struct ZipItem {
    name: String,
    comment: String,
    method: u16,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
    mod_date: u16,
    mod_time: u16,
}

/// A read-only view over a PKZip archive: the central directory is cached at
/// open time; member data is streamed out lazily on [`RoZipped::extract`] /
/// [`RoZipped::extract_all`].
pub struct RoZipped {
    path: PathBuf,
    items: Vec<ZipItem>,
    comment: String,
    map_size: u32,
    extraction_canceled: Cell<bool>,
    progress_cb: RefCell<Option<Box<ExtractionProgressCb>>>,
}

impl RoZipped {
    pub fn open(path: impl AsRef<Path>, map_size: u32) -> Result<Self, ZipError> {
        let path = path.as_ref().to_path_buf();
        let file = MappedFile::open(&path, true, map_size)?;
        let (items, comment) = Self::cache_items(&file)?;
        Ok(RoZipped {
            path,
            items,
            comment,
            map_size,
            extraction_canceled: Cell::new(false),
            progress_cb: RefCell::new(None),
        })
    }

    fn find_eocd(file: &MappedFile) -> Result<u64, ZipError> {
        let size = file.size();
        if size < format::EOCD_FIXED_LEN as u64 {
            return Err(ZipError::BadArchive);
        }
        let scan_len = (format::MAX_COMMENT_LEN + format::EOCD_FIXED_LEN).min(size as usize);
        let start = size - scan_len as u64;
        let mut buf = vec![0u8; scan_len];
        file.get_bytes(&mut buf, start, scan_len);
        for i in (0..=scan_len.saturating_sub(4)).rev() {
            if LittleEndian::read_u32(&buf[i..i + 4]) == format::END_OF_CENTRAL_DIR_SIG {
                return Ok(start + i as u64);
            }
        }
        Err(ZipError::BadArchive)
    }

    fn cache_items(file: &MappedFile) -> Result<(Vec<ZipItem>, String), ZipError> {
        let eocd_off = Self::find_eocd(file)?;
        let mut eocd = [0u8; format::EOCD_FIXED_LEN];
        file.get_bytes(&mut eocd, eocd_off, eocd.len());
        let total_entries = LittleEndian::read_u16(&eocd[10..12]) as usize;
        let cd_size = LittleEndian::read_u32(&eocd[12..16]) as u64;
        let cd_offset = LittleEndian::read_u32(&eocd[16..20]) as u64;
        let comment_len = LittleEndian::read_u16(&eocd[20..22]) as usize;
        let mut comment_buf = vec![0u8; comment_len];
        file.get_bytes(&mut comment_buf, eocd_off + format::EOCD_FIXED_LEN as u64, comment_len);
        let comment = String::from_utf8_lossy(&comment_buf).into_owned();

        let mut items = Vec::with_capacity(total_entries);
        let mut cur = cd_offset;
        let cd_end = cd_offset + cd_size;
        while cur < cd_end && items.len() < total_entries {
            let mut hdr = [0u8; 46];
            file.get_bytes(&mut hdr, cur, 46);
            if LittleEndian::read_u32(&hdr[0..4]) != format::CENTRAL_DIR_HEADER_SIG {
                return Err(ZipError::BadArchive);
            }
            let method = LittleEndian::read_u16(&hdr[10..12]);
            let mod_time = LittleEndian::read_u16(&hdr[12..14]);
            let mod_date = LittleEndian::read_u16(&hdr[14..16]);
            let compressed_size = LittleEndian::read_u32(&hdr[20..24]) as u64;
            let uncompressed_size = LittleEndian::read_u32(&hdr[24..28]) as u64;
            let name_len = LittleEndian::read_u16(&hdr[28..30]) as usize;
            let extra_len = LittleEndian::read_u16(&hdr[30..32]) as usize;
            let comment_len = LittleEndian::read_u16(&hdr[32..34]) as usize;
            let local_header_offset = LittleEndian::read_u32(&hdr[42..46]) as u64;

            let mut name_buf = vec![0u8; name_len];
            file.get_bytes(&mut name_buf, cur + 46, name_len);
            let name = format::normalize_name(&String::from_utf8_lossy(&name_buf));

            let mut comment_buf = vec![0u8; comment_len];
            file.get_bytes(&mut comment_buf, cur + 46 + name_len as u64 + extra_len as u64, comment_len);
            let comment = String::from_utf8_lossy(&comment_buf).into_owned();

            items.push(ZipItem {
                name,
                comment,
                method,
                compressed_size,
                uncompressed_size,
                local_header_offset,
                mod_date,
                mod_time,
            });
            cur += 46 + name_len as u64 + extra_len as u64 + comment_len as u64;
        }
        Ok((items, comment))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, index: usize) -> &str {
        &self.items[index].name
    }

    pub fn item_comment(&self, index: usize) -> &str {
        &self.items[index].comment
    }

    pub fn size(&self, index: usize) -> u64 {
        self.items[index].uncompressed_size
    }

    /// Register a callback invoked once per chunk during extraction. Pass
    /// `None` to clear it.
    pub fn monitor_extraction(&self, cb: Option<Box<ExtractionProgressCb>>) {
        *self.progress_cb.borrow_mut() = cb;
        self.extraction_canceled.set(false);
    }

    pub fn cancel_extraction(&self) -> bool {
        self.extraction_canceled.set(true);
        true
    }

    pub fn extraction_canceled(&self) -> bool {
        self.extraction_canceled.get()
    }

    fn find_index(&self, item: &str, flatten: bool) -> Option<usize> {
        self.items.iter().position(|it| {
            it.name == item || (flatten && Path::new(&it.name).file_name().map(|n| n.to_string_lossy() == item).unwrap_or(false))
        })
    }

    /// Extract a single named item under `out_dir`. With `flatten`, the
    /// item's directory components are dropped and it lands directly in
    /// `out_dir`.
    pub fn extract(&self, out_dir: impl AsRef<Path>, item: &str, flatten: bool) -> Result<bool, ZipError> {
        let Some(idx) = self.find_index(item, flatten) else {
            return Err(ZipError::ItemNotFound);
        };
        self.extraction_canceled.set(false);
        self.extract_one(out_dir.as_ref(), idx, flatten, 0, 1)
    }

    /// Extract every archive member under `out_dir`.
    pub fn extract_all(&self, out_dir: impl AsRef<Path>, flatten: bool) -> Result<bool, ZipError> {
        self.extraction_canceled.set(false);
        let total = self.items.len() as u32;
        for i in 0..self.items.len() {
            if self.extraction_canceled.get() {
                return Ok(false);
            }
            if !self.extract_one(out_dir.as_ref(), i, flatten, i as u32, total)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn extract_one(&self, out_dir: &Path, index: usize, flatten: bool, items_extracted: u32, items_being_extracted: u32) -> Result<bool, ZipError> {
        let it = &self.items[index];
        let target_rel = if flatten {
            Path::new(&it.name).file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(&it.name))
        } else {
            PathBuf::from(&it.name)
        };
        let target = out_dir.join(target_rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut adapter = ZipIoAdapter::open_ro(&self.path, self.map_size)?;
        let mut hdr = [0u8; 30];
        adapter.seek(it.local_header_offset as i64, Whence::Set);
        let n = adapter.read(&mut hdr);
        if n != hdr.len() || LittleEndian::read_u32(&hdr[0..4]) != format::LOCAL_FILE_HEADER_SIG {
            return Err(ZipError::BadArchive);
        }
        let name_len = LittleEndian::read_u16(&hdr[26..28]) as u64;
        let extra_len = LittleEndian::read_u16(&hdr[28..30]) as u64;
        let data_off = it.local_header_offset + 30 + name_len + extra_len;
        adapter.seek(data_off as i64, Whence::Set);

        let mut out_file = File::create(&target)?;

        let bytes_being_extracted = it.compressed_size;
        let reader = BoundedProgressReader {
            adapter: &mut adapter,
            remaining: it.compressed_size,
            bytes_extracted: 0,
            bytes_being_extracted,
            items_extracted,
            items_being_extracted,
            cb: &self.progress_cb,
            canceled: &self.extraction_canceled,
        };

        let ok = match it.method {
            format::METHOD_STORED => {
                let mut reader = reader;
                io::copy(&mut reader, &mut out_file).is_ok()
            }
            format::METHOD_DEFLATE => {
                let mut decoder = DeflateDecoder::new(reader);
                io::copy(&mut decoder, &mut out_file).is_ok()
            }
            _ => return Err(ZipError::BadArchive),
        };

        if self.extraction_canceled.get() {
            return Ok(false);
        }
        if !ok {
            return Err(ZipError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "zip extraction stream ended early")));
        }

        let mtime = FileTime::from_unix_time(dos_to_unix_time(it.mod_date, it.mod_time), 0);
        set_file_mtime(&target, mtime)?;
        Ok(true)
    }
}

struct BoundedProgressReader<'a> {
    adapter: &'a mut ZipIoAdapter,
    remaining: u64,
    bytes_extracted: u64,
    bytes_being_extracted: u64,
    items_extracted: u32,
    items_being_extracted: u32,
    cb: &'a RefCell<Option<Box<ExtractionProgressCb>>>,
    canceled: &'a Cell<bool>,
}

impl<'a> Read for BoundedProgressReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.canceled.get() || self.remaining == 0 {
            return Ok(0);
        }
        let cap = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.adapter.read(&mut buf[..cap]);
        self.remaining -= n as u64;
        self.bytes_extracted += n as u64;
        if let Some(cb) = self.cb.borrow_mut().as_mut() {
            let proceed = cb(self.items_extracted, self.items_being_extracted, self.bytes_extracted, self.bytes_being_extracted);
            if !proceed {
                self.canceled.set(true);
                return Ok(0);
            }
        }
        Ok(n)
    }
}

/// Days since the Unix epoch for a given civil `(year, month, day)`, the
/// encode-direction counterpart of `format::to_dos_datetime`'s
/// civil-from-days decode (Howard Hinnant's algorithm).
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Decode a zip local/central header's DOS date/time pair into Unix seconds
/// (UTC), the inverse of `format::to_dos_datetime`.
fn dos_to_unix_time(date: u16, time: u16) -> i64 {
    let day = ((date & 0x1f) as i64).max(1);
    let month = (((date >> 5) & 0xf) as i64).clamp(1, 12);
    let year = 1980 + ((date >> 9) & 0x7f) as i64;
    let second = ((time & 0x1f) as i64) * 2;
    let minute = ((time >> 5) & 0x3f) as i64;
    let hour = ((time >> 11) & 0x1f) as i64;

    days_from_civil(year, month, day) * 86_400 + hour * 3600 + minute * 60 + second
}
