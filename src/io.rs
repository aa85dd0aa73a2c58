//! Line iteration over log files.
//!
//! Invalid UTF-8 sequences are dropped from each line rather than failing the
//! read, so a stray binary byte never aborts a scan and never splits the
//! characters around it. Genuine I/O errors are still surfaced per line.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::Mmap;

/// Threshold in bytes above which we attempt to use mmap for reading.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

pub type LineIter = Box<dyn Iterator<Item = io::Result<String>> + Send + 'static>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Iterate lines from any buffered reader, tolerating invalid UTF-8.
pub fn iter_lines_reader<R: BufRead + Send + 'static>(reader: R) -> LineIter {
    Box::new(ByteLines {
        reader,
        buf: Vec::new(),
    })
}

/// Iterate lines from a file path using a buffered reader (non-mmap).
pub fn iter_lines_bufread<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    Ok(iter_lines_reader(BufReader::new(file)))
}

/// Iterate lines from a file path using mmap. Scans for '\n' boundaries and
/// allocates one String per line.
pub fn iter_lines_mmap<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    // SAFETY: the map is read-only and dropped with the iterator; a log file
    // truncated underneath us is the usual mmap caveat.
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    Ok(Box::new(MmapLines { mmap, pos: 0 }))
}

struct ByteLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for ByteLines<R> {
    type Item = io::Result<String>;
    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
                Some(Ok(line_from_bytes(line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

struct MmapLines {
    mmap: Mmap,
    pos: usize,
}

impl Iterator for MmapLines {
    type Item = io::Result<String>;
    fn next(&mut self) -> Option<Self::Item> {
        let data: &[u8] = &self.mmap;
        if self.pos >= data.len() {
            return None;
        }
        let start = self.pos;
        if let Some(off) = memchr::memchr(b'\n', &data[self.pos..]) {
            let end = self.pos + off;
            self.pos = end + 1; // skip newline
            Some(Ok(line_from_bytes(&data[start..end])))
        } else {
            // Last line without trailing newline
            self.pos = data.len();
            Some(Ok(line_from_bytes(&data[start..])))
        }
    }
}

fn line_from_bytes(bytes: &[u8]) -> String {
    // Trim a trailing '\r' if present (handle Windows CRLF)
    let slice = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let mut line = String::with_capacity(slice.len());
    for chunk in slice.utf8_chunks() {
        line.push_str(chunk.valid());
    }
    line
}

/// Choose mmap or bufread and return an iterator over lines.
pub fn iter_lines_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<LineIter> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_dir() {
        bail!("{} is a directory", path.as_ref().display());
    }
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        iter_lines_mmap(path)
    } else {
        iter_lines_bufread(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::tempdir;

    fn collect(iter: LineIter) -> Vec<String> {
        iter.map(|l| l.unwrap()).collect()
    }

    #[test]
    fn invalid_utf8_is_dropped_not_fatal() {
        let bytes = b"ok 1.2.3.4\nbad \xff\xfe 10.0.0.1\r\nlast".to_vec();
        let lines = collect(iter_lines_reader(Cursor::new(bytes)));
        assert_eq!(lines, vec!["ok 1.2.3.4", "bad  10.0.0.1", "last"]);
    }

    #[test]
    fn bad_bytes_inside_an_address_are_removed() {
        let bytes = b"a 10.0.0\xff.1 b 8.8.8.8\xfe9 caf\xc3\xa9\n".to_vec();
        let lines = collect(iter_lines_reader(Cursor::new(bytes)));
        assert_eq!(lines, vec!["a 10.0.0.1 b 8.8.8.89 caf\u{e9}"]);
    }

    #[test]
    fn mmap_and_bufread_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"one\r\ntwo \x80\nthree\n").unwrap();
        let via_mmap = collect(iter_lines_auto(&path, 1).unwrap());
        let via_buf = collect(iter_lines_auto(&path, u64::MAX).unwrap());
        assert_eq!(via_mmap, via_buf);
        assert_eq!(via_buf, vec!["one", "two ", "three"]);
    }

    #[test]
    fn read_errors_surface_per_line() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk gone"))
            }
        }
        let mut iter = iter_lines_reader(BufReader::new(Broken));
        assert!(iter.next().unwrap().is_err());
    }

    #[test]
    fn missing_file_or_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(iter_lines_auto(dir.path().join("nope.log"), 0).is_err());
        assert!(iter_lines_auto(dir.path(), 0).is_err());
    }
}
