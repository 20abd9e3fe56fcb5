//! Memory-mapped text file: a single-view [`MappedFile`] with optional
//! byte-order-marker skipping.

use std::path::Path;

use crate::error::MappedFileError;
use crate::syskit::bom::Bom;
use crate::syskit::mmap::MappedFile;

/// A text file mapped as exactly one view. `image()` exposes the contents
/// with any detected byte-order-marker stripped when `skip_bom` was set.
pub struct MappedTxtFile {
    file: MappedFile,
    bom: Bom,
    skip_bom: bool,
}

impl MappedTxtFile {
    /// Open an existing text file. When `skip_bom` is true, a leading
    /// byte-order-marker is detected and excluded from [`MappedTxtFile::image`];
    /// [`MappedTxtFile::bom`] still reports it.
    pub fn open(path: impl AsRef<Path>, read_only: bool, skip_bom: bool) -> Result<Self, MappedFileError> {
        let file = MappedFile::open(path, read_only, 0)?;
        let bom = Bom::detect(file.view(0));
        Ok(MappedTxtFile { file, bom, skip_bom })
    }

    /// Create a new text file of `size` bytes, writing `bom`'s marker at the
    /// start.
    pub fn create(path: impl AsRef<Path>, size: u64, fail_if_exists: bool, bom: Bom) -> Result<Self, MappedFileError> {
        let marker_len = bom.len() as u64;
        let mut file = MappedFile::create(path, size + marker_len, fail_if_exists, 0)?;
        if marker_len > 0 {
            let marker: &[u8] = match bom {
                Bom::Utf8 => &[0xef, 0xbb, 0xbf],
                Bom::Utf16Le => &[0xff, 0xfe],
                Bom::Utf16Be => &[0xfe, 0xff],
                Bom::Utf32Le => &[0xff, 0xfe, 0x00, 0x00],
                Bom::Utf32Be => &[0x00, 0x00, 0xfe, 0xff],
                Bom::None => &[],
            };
            file.set_bytes(0, marker, false);
        }
        Ok(MappedTxtFile { file, bom, skip_bom: true })
    }

    /// The leading byte-order-marker. Reports [`Bom::None`] when `skip_bom`
    /// was false at open time, even if one is physically present.
    pub fn bom(&self) -> Bom {
        if self.skip_bom {
            self.bom
        } else {
            Bom::None
        }
    }

    fn marker_offset(&self) -> usize {
        if self.skip_bom {
            self.bom.len()
        } else {
            0
        }
    }

    /// Raw file contents, excluding the byte-order-marker when `skip_bom`
    /// was set.
    pub fn image(&self) -> &[u8] {
        &self.file.view(0)[self.marker_offset()..]
    }

    pub fn image_size(&self) -> u64 {
        self.file.size() - self.marker_offset() as u64
    }

    pub fn raw_size(&self) -> u64 {
        self.file.size()
    }

    pub fn load_from(&mut self, path: impl AsRef<Path>) -> bool {
        let read_only = self.file.is_read_only();
        match MappedTxtFile::open(path, read_only, self.skip_bom) {
            Ok(fresh) => {
                *self = fresh;
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn image_excludes_utf8_bom_when_skipping() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xef, 0xbb, 0xbf]).unwrap();
        f.write_all(b"hello").unwrap();
        f.flush().unwrap();

        let txt = MappedTxtFile::open(f.path(), true, true).unwrap();
        assert_eq!(txt.bom(), Bom::Utf8);
        assert_eq!(txt.image(), b"hello");
    }

    #[test]
    fn bom_reported_as_none_when_not_skipping() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xef, 0xbb, 0xbf]).unwrap();
        f.write_all(b"hello").unwrap();
        f.flush().unwrap();

        let txt = MappedTxtFile::open(f.path(), true, false).unwrap();
        assert_eq!(txt.bom(), Bom::None);
        assert_eq!(txt.image(), &[0xef, 0xbb, 0xbf, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn plain_text_without_marker_round_trips() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"no marker here").unwrap();
        f.flush().unwrap();

        let txt = MappedTxtFile::open(f.path(), true, true).unwrap();
        assert_eq!(txt.bom(), Bom::None);
        assert_eq!(txt.image(), b"no marker here");
    }
}
