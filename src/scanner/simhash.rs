//! Simhash accumulator for near-duplicate fingerprints.
//!
//! # Overview
//!
//! A [`SimhashAccumulator`] keeps one signed counter per output bit. Every
//! chunk of streamed content is reduced to a feature hash, and each bit of
//! that hash votes on the matching counter: `+1` when set, `-1` when clear.
//! The final fingerprint sets bit `i` only when counter `i` is strictly
//! positive, so localized edits flip few bits while the exact fingerprint
//! changes completely.
//!
//! # Chunking
//!
//! The accumulator treats every [`update`](SimhashAccumulator::update) call as
//! one chunk. Streamed content goes through [`WindowedSimhash`], which cuts it
//! into consecutive [`FEATURE_WINDOW`]-byte windows by stream offset (the last
//! window may be shorter). A one-byte edit changes a single feature out of
//! `len / 64`, so only bits whose counters were close to zero can flip, and
//! the fingerprint does not depend on how the stream was read.
//!
//! # Example
//!
//! ```
//! use dupescan::scanner::{SimhashAccumulator, SimhashWidth};
//!
//! let mut acc = SimhashAccumulator::new(SimhashWidth::W64);
//! acc.update(b"hello ");
//! acc.update(b"world");
//! let first = acc.finish();
//!
//! // `finish` resets the counters, so the accumulator is ready for reuse.
//! acc.update(b"hello ");
//! acc.update(b"world");
//! assert_eq!(acc.finish(), first);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Seed of the multiplicative feature hash (`h = h * 33 + byte`).
pub const FEATURE_HASH_SEED: u64 = 5381;

/// Bytes of streamed content per simhash feature.
pub const FEATURE_WINDOW: usize = 64;

/// Bit width of a similarity fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SimhashWidth {
    /// 32-bit fingerprint.
    W32,
    /// 64-bit fingerprint.
    #[default]
    W64,
}

impl SimhashWidth {
    /// Number of bits in a fingerprint of this width.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    /// Mask selecting the low `bits()` bits of a `u64`.
    #[must_use]
    pub fn mask(self) -> u64 {
        match self {
            Self::W32 => u64::from(u32::MAX),
            Self::W64 => u64::MAX,
        }
    }
}

impl TryFrom<u32> for SimhashWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Self::W32),
            64 => Ok(Self::W64),
            other => Err(format!("unsupported simhash width {other} (expected 32 or 64)")),
        }
    }
}

impl From<SimhashWidth> for u32 {
    fn from(width: SimhashWidth) -> Self {
        width.bits()
    }
}

impl fmt::Display for SimhashWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// A fixed-width similarity fingerprint.
///
/// Only the low `width.bits()` bits of `bits` are ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Simhash {
    /// Fingerprint bits, right-aligned.
    pub bits: u64,
    /// Width the fingerprint was generated at.
    pub width: SimhashWidth,
}

impl Simhash {
    /// Create a fingerprint, masking `bits` to `width`.
    #[must_use]
    pub fn new(bits: u64, width: SimhashWidth) -> Self {
        Self {
            bits: bits & width.mask(),
            width,
        }
    }

    /// Fixed-width lowercase hexadecimal rendering (8 or 16 digits).
    #[must_use]
    pub fn to_hex(&self) -> String {
        match self.width {
            SimhashWidth::W32 => format!("{:08x}", self.bits),
            SimhashWidth::W64 => format!("{:016x}", self.bits),
        }
    }
}

impl fmt::Display for Simhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Feature hash of one chunk, evaluated at `width` with wrapping arithmetic.
#[must_use]
pub fn feature_hash(chunk: &[u8], width: SimhashWidth) -> u64 {
    let h = chunk.iter().fold(FEATURE_HASH_SEED, |h, &byte| {
        h.wrapping_mul(33).wrapping_add(u64::from(byte))
    });
    h & width.mask()
}

/// Bit-weighted voting accumulator producing a [`Simhash`].
#[derive(Debug, Clone)]
pub struct SimhashAccumulator {
    width: SimhashWidth,
    counters: [i64; 64],
    chunks: u64,
}

impl SimhashAccumulator {
    /// Create an accumulator with all counters at zero.
    #[must_use]
    pub fn new(width: SimhashWidth) -> Self {
        Self {
            width,
            counters: [0; 64],
            chunks: 0,
        }
    }

    /// Width of the fingerprints this accumulator produces.
    #[must_use]
    pub fn width(&self) -> SimhashWidth {
        self.width
    }

    /// Feed one chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        let h = feature_hash(chunk, self.width);
        let bits = self.width.bits() as usize;
        for (i, counter) in self.counters[..bits].iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *counter += 1;
            } else {
                *counter -= 1;
            }
        }
        self.chunks += 1;
    }

    /// True when no chunk has been fed since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    /// Compute the fingerprint without consuming the accumulated state.
    #[must_use]
    pub fn peek(&self) -> Simhash {
        let bits = self.width.bits() as usize;
        let mut value = 0u64;
        for (i, &counter) in self.counters[..bits].iter().enumerate() {
            if counter > 0 {
                value |= 1u64 << i;
            }
        }
        Simhash::new(value, self.width)
    }

    /// Extract the fingerprint and reset the accumulator.
    pub fn finish(&mut self) -> Simhash {
        let fingerprint = self.peek();
        self.reset();
        fingerprint
    }

    /// Restore every counter to zero.
    pub fn reset(&mut self) {
        self.counters = [0; 64];
        self.chunks = 0;
    }
}

/// Simhash over a byte stream cut into fixed [`FEATURE_WINDOW`] windows.
///
/// Window boundaries depend only on the offset in the stream, never on how
/// the stream is split across [`feed`](Self::feed) calls.
#[derive(Debug, Clone)]
pub struct WindowedSimhash {
    acc: SimhashAccumulator,
    tail: Vec<u8>,
}

impl WindowedSimhash {
    /// Create an empty stream fingerprinter.
    #[must_use]
    pub fn new(width: SimhashWidth) -> Self {
        Self {
            acc: SimhashAccumulator::new(width),
            tail: Vec::with_capacity(FEATURE_WINDOW),
        }
    }

    /// Append bytes to the stream.
    pub fn feed(&mut self, mut data: &[u8]) {
        if !self.tail.is_empty() {
            let take = (FEATURE_WINDOW - self.tail.len()).min(data.len());
            self.tail.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.tail.len() < FEATURE_WINDOW {
                return;
            }
            self.acc.update(&self.tail);
            self.tail.clear();
        }

        let mut windows = data.chunks_exact(FEATURE_WINDOW);
        for window in windows.by_ref() {
            self.acc.update(window);
        }
        self.tail.extend_from_slice(windows.remainder());
    }

    /// Flush the short final window, extract the fingerprint and reset.
    pub fn finish(&mut self) -> Simhash {
        if !self.tail.is_empty() {
            self.acc.update(&self.tail);
            self.tail.clear();
        }
        self.acc.finish()
    }
}
