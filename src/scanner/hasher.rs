//! Streaming xxHash64 file hasher.
//!
//! # Overview
//!
//! The [`Hasher`] reads a file once through a small fixed-size buffer and
//! feeds every window to an xxHash64 state and, when similarity mode is on, a
//! [`WindowedSimhash`]. Whole files are never loaded into memory. Simhash
//! features are cut at fixed stream offsets, so neither fingerprint depends on
//! the buffer size.
//!
//! A [`Digest`] is only produced after the final read succeeds; any failure
//! along the way is returned as a [`HashError`] and no partial fingerprint
//! escapes.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.digest(Path::new("Cargo.toml")).unwrap();
//! println!("{}", dupescan::scanner::fingerprint_to_hex(digest.exact));
//! ```

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use xxhash_rust::xxh64::Xxh64;

use super::simhash::{Simhash, SimhashWidth, WindowedSimhash};
use super::HashError;

/// Default read buffer size (4 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Seed of the exact fingerprint.
pub const XXH64_SEED: u64 = 0;

/// Fingerprints computed for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    /// xxHash64 of the full content.
    pub exact: u64,
    /// Near-duplicate fingerprint, present only in similarity mode.
    pub similarity: Option<Simhash>,
}

/// Render an exact fingerprint as 16 lowercase hex digits.
#[must_use]
pub fn fingerprint_to_hex(fingerprint: u64) -> String {
    format!("{fingerprint:016x}")
}

/// Streaming digest engine.
///
/// A `Hasher` holds no per-file state, so one instance can be shared across
/// worker threads. Each call owns its buffer and accumulators.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    similarity: Option<SimhashWidth>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Hasher computing only the exact fingerprint with a 4 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            similarity: None,
        }
    }

    /// Also compute a similarity fingerprint of the given width.
    #[must_use]
    pub fn with_similarity(mut self, width: SimhashWidth) -> Self {
        self.similarity = Some(width);
        self
    }

    /// Override the read buffer size.
    ///
    /// A size of zero is bumped to one byte.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Read buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Similarity width, if similarity mode is on.
    #[must_use]
    pub fn similarity_width(&self) -> Option<SimhashWidth> {
        self.similarity
    }

    /// Digest the file at `path`.
    ///
    /// The file handle is dropped on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or any read fails.
    pub fn digest(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.digest_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Digest an arbitrary byte stream.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error other than `Interrupted`.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<Digest> {
        let mut exact = Xxh64::new(XXH64_SEED);
        let mut similarity = self.similarity.map(WindowedSimhash::new);
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let n = fill_buffer(&mut reader, &mut buffer)?;
            if n == 0 {
                break;
            }
            let chunk = &buffer[..n];
            exact.update(chunk);
            if let Some(stream) = similarity.as_mut() {
                stream.feed(chunk);
            }
            if n < buffer.len() {
                break;
            }
        }

        Ok(Digest {
            exact: exact.digest(),
            similarity: similarity.as_mut().map(WindowedSimhash::finish),
        })
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read.
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::simhash::{SimhashAccumulator, FEATURE_WINDOW};
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Reader that yields a few bytes per call, then fails.
    struct FlakyReader {
        remaining: usize,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("disk went away"));
            }
            let n = buf.len().min(3).min(self.remaining);
            buf[..n].fill(b'z');
            self.remaining -= n;
            Ok(n)
        }
    }

    /// Reader that returns one byte per call.
    struct TrickleReader<'a> {
        data: &'a [u8],
    }

    impl Read for TrickleReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[0];
            self.data = &self.data[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_exact_matches_one_shot_xxh64() {
        let data = b"hello";
        let digest = Hasher::new().digest_reader(Cursor::new(data)).unwrap();
        assert_eq!(digest.exact, xxhash_rust::xxh64::xxh64(data, 0));
        assert!(digest.similarity.is_none());
    }

    #[test]
    fn test_exact_independent_of_buffer_size() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let small = Hasher::new()
            .with_buffer_size(7)
            .digest_reader(Cursor::new(&data))
            .unwrap();
        let large = Hasher::new().digest_reader(Cursor::new(&data)).unwrap();
        assert_eq!(small.exact, large.exact);
    }

    #[test]
    fn test_empty_stream() {
        let digest = Hasher::new()
            .with_similarity(SimhashWidth::W64)
            .digest_reader(Cursor::new(Vec::<u8>::new()))
            .unwrap();
        assert_eq!(digest.exact, xxhash_rust::xxh64::xxh64(b"", 0));
        assert_eq!(digest.similarity.map(|s| s.bits), Some(0));
    }

    #[test]
    fn test_similarity_chunking_ignores_read_splits() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let hasher = Hasher::new().with_similarity(SimhashWidth::W64);

        let whole = hasher.digest_reader(Cursor::new(&data)).unwrap();
        let trickled = hasher.digest_reader(TrickleReader { data: &data }).unwrap();

        assert_eq!(whole, trickled);
    }

    #[test]
    fn test_similarity_uses_fixed_windows() {
        let data: Vec<u8> = (0..(DEFAULT_BUFFER_SIZE * 2 + 10) as u32)
            .map(|i| (i % 199) as u8)
            .collect();
        let digest = Hasher::new()
            .with_similarity(SimhashWidth::W32)
            .digest_reader(Cursor::new(&data))
            .unwrap();

        let mut acc = SimhashAccumulator::new(SimhashWidth::W32);
        for chunk in data.chunks(FEATURE_WINDOW) {
            acc.update(chunk);
        }
        assert_eq!(digest.similarity, Some(acc.finish()));
    }

    #[test]
    fn test_similarity_independent_of_buffer_size() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let odd = Hasher::new()
            .with_similarity(SimhashWidth::W64)
            .with_buffer_size(1000)
            .digest_reader(Cursor::new(&data))
            .unwrap();
        let default = Hasher::new()
            .with_similarity(SimhashWidth::W64)
            .digest_reader(Cursor::new(&data))
            .unwrap();
        assert_eq!(odd, default);
    }

    #[test]
    fn test_partial_read_yields_error() {
        let result = Hasher::new().digest_reader(FlakyReader { remaining: 10 });
        assert!(result.is_err());
    }

    #[test]
    fn test_digest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let digest = Hasher::new().digest(&path).unwrap();
        assert_eq!(digest.exact, xxhash_rust::xxh64::xxh64(b"hello", 0));
    }

    #[test]
    fn test_digest_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Hasher::new().digest(&dir.path().join("missing"));
        assert!(matches!(result, Err(HashError::NotFound(_))));
    }

    #[test]
    fn test_fingerprint_hex_is_zero_padded() {
        assert_eq!(fingerprint_to_hex(0xdead_beef), "00000000deadbeef");
    }

    #[test]
    fn test_zero_buffer_size_is_clamped() {
        assert_eq!(Hasher::new().with_buffer_size(0).buffer_size(), 1);
    }
}
