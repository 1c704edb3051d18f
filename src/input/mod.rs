//! Opening input streams.
//!
//! Inputs are files or standard input (`-`). Gzip-compressed input is
//! detected from its magic bytes and decompressed transparently, so
//! `feed.xml.gz` and `feed.xml` can be handled the same way.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use tracing::debug;

/// The path that stands for standard input.
pub const STDIN: &str = "-";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opens `path` for reading, or standard input for `-`, and applies
/// [`auto_decompress`].
///
/// # Errors
///
/// Returns the I/O error from opening the file or peeking at its first
/// bytes.
pub fn open(path: impl AsRef<Path>) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    if path.as_os_str() == STDIN {
        return auto_decompress(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)?;
    auto_decompress(Box::new(BufReader::new(file)))
}

/// Wraps `reader` in a gzip decoder if the stream starts with the gzip
/// magic bytes. Concatenated gzip members are read as one stream. Empty
/// input is returned unchanged.
///
/// # Errors
///
/// Returns the I/O error from peeking at the first bytes.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use xmlpluck::input::auto_decompress;
///
/// let mut plain = String::new();
/// auto_decompress(Box::new(&b"<a/>"[..])).unwrap().read_to_string(&mut plain).unwrap();
/// assert_eq!(plain, "<a/>");
/// ```
pub fn auto_decompress<'a>(mut reader: Box<dyn BufRead + 'a>) -> io::Result<Box<dyn BufRead + 'a>> {
    let head = reader.fill_buf()?;
    if head.starts_with(&GZIP_MAGIC) {
        debug!("gzip input detected");
        return Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))));
    }
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap_or_else(|e| panic!("{e}"));
        encoder.finish().unwrap_or_else(|e| panic!("{e}"))
    }

    fn read_all(reader: Box<dyn BufRead + '_>) -> String {
        let mut out = String::new();
        auto_decompress(reader)
            .and_then(|mut r| r.read_to_string(&mut out))
            .unwrap_or_else(|e| panic!("{e}"));
        out
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(read_all(Box::new(&b"<a>x</a>"[..])), "<a>x</a>");
    }

    #[test]
    fn test_empty_passthrough() {
        assert_eq!(read_all(Box::new(&b""[..])), "");
    }

    #[test]
    fn test_gzip_detected() {
        let data = gzip(b"<a>compressed</a>");
        assert_eq!(read_all(Box::new(data.as_slice())), "<a>compressed</a>");
    }

    #[test]
    fn test_concatenated_members() {
        let mut data = gzip(b"<a>");
        data.extend(gzip(b"</a>"));
        assert_eq!(read_all(Box::new(data.as_slice())), "<a></a>");
    }

    #[test]
    fn test_open_missing_file() {
        assert!(open("/nonexistent/feed.xml").is_err());
    }
}
