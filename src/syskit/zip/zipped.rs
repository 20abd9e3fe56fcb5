//! Write-only zipped archive.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use byteorder::{ByteOrder, LittleEndian};
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::ZipError;
use crate::syskit::zip::adapter::ZipIoAdapter;
use crate::syskit::zip::format;

struct ZippedEntry {
    name: String,
    method: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    mod_date: u16,
    mod_time: u16,
    local_header_offset: u64,
}

/// A write-only archive under construction. Members are added with
/// [`Zipped::add_item`] / [`Zipped::add_directory`] and the central
/// directory is only written on [`Zipped::save`].
pub struct Zipped {
    adapter: ZipIoAdapter,
    entries: Vec<ZippedEntry>,
}

impl Zipped {
    pub fn create(path: impl AsRef<Path>, map_size: u32) -> Result<Self, ZipError> {
        Ok(Zipped { adapter: ZipIoAdapter::create_rw(path, map_size)?, entries: Vec::new() })
    }

    fn compress(data: &[u8], level: i32) -> (u16, Vec<u8>) {
        if data.is_empty() {
            return (format::METHOD_STORED, Vec::new());
        }
        let level = if level < 0 { Compression::default() } else { Compression::new((level as u32).min(9)) };
        let mut encoder = DeflateEncoder::new(Vec::new(), level);
        if encoder.write_all(data).is_err() {
            return (format::METHOD_STORED, data.to_vec());
        }
        let compressed = match encoder.finish() {
            Ok(bytes) if bytes.len() < data.len() => bytes,
            _ => return (format::METHOD_STORED, data.to_vec()),
        };
        (format::METHOD_DEFLATE, compressed)
    }

    /// Add a single file. The stored name is the file's basename,
    /// slash-normalized.
    pub fn add_item(&mut self, path: impl AsRef<Path>, compression_level: i32) -> Result<bool, ZipError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let modified = fs::metadata(path)?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.zip_item(&format::normalize_name(&name), &data, compression_level, modified)
    }

    /// Add every non-directory child of `in_dir`, one level deep.
    pub fn add_directory(&mut self, in_dir: impl AsRef<Path>, compression_level: i32) -> Result<bool, ZipError> {
        let mut all_ok = true;
        for entry in fs::read_dir(in_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            all_ok &= self.add_item(entry.path(), compression_level)?;
        }
        Ok(all_ok)
    }

    fn zip_item(&mut self, name: &str, data: &[u8], compression_level: i32, modified: SystemTime) -> Result<bool, ZipError> {
        let crc = format::crc32(data);
        let (method, payload) = Self::compress(data, compression_level);
        let (mod_date, mod_time) = format::to_dos_datetime(modified);
        let local_header_offset = self.adapter.tell();

        let mut header = [0u8; 30];
        LittleEndian::write_u32(&mut header[0..4], format::LOCAL_FILE_HEADER_SIG);
        LittleEndian::write_u16(&mut header[4..6], 20);
        LittleEndian::write_u16(&mut header[6..8], 0);
        LittleEndian::write_u16(&mut header[8..10], method);
        LittleEndian::write_u16(&mut header[10..12], mod_time);
        LittleEndian::write_u16(&mut header[12..14], mod_date);
        LittleEndian::write_u32(&mut header[14..18], crc);
        LittleEndian::write_u32(&mut header[18..22], payload.len() as u32);
        LittleEndian::write_u32(&mut header[22..26], data.len() as u32);
        LittleEndian::write_u16(&mut header[26..28], name.len() as u16);
        LittleEndian::write_u16(&mut header[28..30], 0);

        if !self.adapter.write(&header) || !self.adapter.write(name.as_bytes()) || !self.adapter.write(&payload) {
            return Ok(false);
        }

        self.entries.push(ZippedEntry {
            name: name.to_string(),
            method,
            crc32: crc,
            compressed_size: payload.len() as u64,
            uncompressed_size: data.len() as u64,
            mod_date,
            mod_time,
            local_header_offset,
        });
        Ok(true)
    }

    /// Write the central directory and end-of-central-directory record,
    /// stamped with `comment`, then close the archive.
    pub fn save(mut self, comment: &str) -> Result<bool, ZipError> {
        let cd_start = self.adapter.tell();
        for e in &self.entries {
            let mut header = [0u8; 46];
            LittleEndian::write_u32(&mut header[0..4], format::CENTRAL_DIR_HEADER_SIG);
            LittleEndian::write_u16(&mut header[4..6], 20);
            LittleEndian::write_u16(&mut header[6..8], 20);
            LittleEndian::write_u16(&mut header[8..10], 0);
            LittleEndian::write_u16(&mut header[10..12], e.method);
            LittleEndian::write_u16(&mut header[12..14], e.mod_time);
            LittleEndian::write_u16(&mut header[14..16], e.mod_date);
            LittleEndian::write_u32(&mut header[16..20], e.crc32);
            LittleEndian::write_u32(&mut header[20..24], e.compressed_size as u32);
            LittleEndian::write_u32(&mut header[24..28], e.uncompressed_size as u32);
            LittleEndian::write_u16(&mut header[28..30], e.name.len() as u16);
            LittleEndian::write_u16(&mut header[30..32], 0);
            LittleEndian::write_u16(&mut header[32..34], 0);
            LittleEndian::write_u16(&mut header[34..36], 0);
            LittleEndian::write_u16(&mut header[36..38], 0);
            LittleEndian::write_u32(&mut header[38..42], 0);
            LittleEndian::write_u32(&mut header[42..46], e.local_header_offset as u32);

            if !self.adapter.write(&header) || !self.adapter.write(e.name.as_bytes()) {
                return Ok(false);
            }
        }
        let cd_end = self.adapter.tell();

        let comment_bytes = comment.as_bytes();
        let mut eocd = [0u8; format::EOCD_FIXED_LEN];
        LittleEndian::write_u32(&mut eocd[0..4], format::END_OF_CENTRAL_DIR_SIG);
        LittleEndian::write_u16(&mut eocd[4..6], 0);
        LittleEndian::write_u16(&mut eocd[6..8], 0);
        LittleEndian::write_u16(&mut eocd[8..10], self.entries.len() as u16);
        LittleEndian::write_u16(&mut eocd[10..12], self.entries.len() as u16);
        LittleEndian::write_u32(&mut eocd[12..16], (cd_end - cd_start) as u32);
        LittleEndian::write_u32(&mut eocd[16..20], cd_start as u32);
        LittleEndian::write_u16(&mut eocd[20..22], comment_bytes.len() as u16);

        if !self.adapter.write(&eocd) || !self.adapter.write(comment_bytes) {
            return Ok(false);
        }
        Ok(self.adapter.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syskit::zip::ro_zipped::RoZipped;
    use std::io::Write as _;

    #[test]
    fn round_trips_single_item_through_ro_zipped() {
        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("KMLSample.kml");
        let mut src = fs::File::create(&src_path).unwrap();
        src.write_all(&b"<kml>payload payload payload payload</kml>".repeat(8)).unwrap();
        drop(src);

        let archive_path = dir.path().join("KMLSample.kmz");
        let mut zipped = Zipped::create(&archive_path, 0).unwrap();
        assert!(zipped.add_item(&src_path, -1).unwrap());
        assert!(zipped.save("KMLSample").unwrap());

        let reader = RoZipped::open(&archive_path, 0).unwrap();
        assert_eq!(reader.num_items(), 1);
        assert_eq!(reader.comment(), "KMLSample");
        assert_eq!(reader.item(0), "KMLSample.kml");

        let out_dir = dir.path().join("out");
        assert!(reader.extract(&out_dir, "KMLSample.kml", true).unwrap());
        let extracted = fs::read(out_dir.join("KMLSample.kml")).unwrap();
        let original = fs::read(&src_path).unwrap();
        assert_eq!(extracted, original);
    }

    #[test]
    fn extract_all_visits_every_member() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt"] {
            fs::write(dir.path().join(name), format!("contents of {name}")).unwrap();
        }
        let archive_path = dir.path().join("bundle.zip");
        let mut zipped = Zipped::create(&archive_path, 0).unwrap();
        assert!(zipped.add_directory(dir.path(), -1).unwrap());
        assert!(zipped.save("").unwrap());

        let reader = RoZipped::open(&archive_path, 0).unwrap();
        assert_eq!(reader.num_items(), 2);
        let out_dir = dir.path().join("out");
        assert!(reader.extract_all(&out_dir, true).unwrap());
        assert_eq!(fs::read_to_string(out_dir.join("a.txt")).unwrap(), "contents of a.txt");
        assert_eq!(fs::read_to_string(out_dir.join("b.txt")).unwrap(), "contents of b.txt");
    }

    #[test]
    fn cancel_extraction_stops_extract_all_early() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(dir.path().join(name), "x".repeat(4096)).unwrap();
        }
        let archive_path = dir.path().join("bundle.zip");
        let mut zipped = Zipped::create(&archive_path, 0).unwrap();
        assert!(zipped.add_directory(dir.path(), -1).unwrap());
        assert!(zipped.save("").unwrap());

        let reader = RoZipped::open(&archive_path, 0).unwrap();
        reader.monitor_extraction(Some(Box::new(|_, _, _, _| false)));
        let out_dir = dir.path().join("out");
        let completed = reader.extract_all(&out_dir, true).unwrap();
        assert!(!completed);
        assert!(reader.extraction_canceled());
    }
}
