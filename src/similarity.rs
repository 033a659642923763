//! Near-duplicate scoring over similarity fingerprints.
//!
//! Two fingerprints of the same width are scored as
//! `1 - popcount(a ^ b) / width`, a value in `[0, 1]` where `1` means every
//! bit agrees. A [`Threshold`] expressed as a percentage turns a score into a
//! [`Classification`].
//!
//! # Example
//!
//! ```
//! use dupescan::scanner::{Simhash, SimhashWidth};
//! use dupescan::similarity::{similarity, Classification, Threshold};
//!
//! let a = Simhash::new(0b1111, SimhashWidth::W32);
//! let b = Simhash::new(0b0111, SimhashWidth::W32);
//!
//! let score = similarity(a, b).unwrap();
//! assert!((score - 31.0 / 32.0).abs() < f64::EPSILON);
//!
//! let threshold = Threshold::new(90.0).unwrap();
//! assert_eq!(threshold.classify(score), Classification::Similar);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::scanner::{FileRecord, Simhash, SimhashWidth};

/// Errors raised while scoring fingerprints.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    /// The two fingerprints were generated at different widths.
    #[error("cannot compare a {left}-bit fingerprint with a {right}-bit fingerprint")]
    WidthMismatch {
        /// Width of the left operand
        left: SimhashWidth,
        /// Width of the right operand
        right: SimhashWidth,
    },

    /// Threshold outside `0..=100` or not a number.
    #[error("threshold must be a percentage between 0 and 100, got {0}")]
    ThresholdOutOfRange(f64),

    /// A record reached the comparator without a similarity fingerprint.
    #[error("no similarity fingerprint for {0}")]
    MissingFingerprint(PathBuf),
}

/// Normalized similarity of two fingerprints in `[0, 1]`.
///
/// # Errors
///
/// Returns [`CompareError::WidthMismatch`] when the widths differ.
pub fn similarity(a: Simhash, b: Simhash) -> Result<f64, CompareError> {
    if a.width != b.width {
        return Err(CompareError::WidthMismatch {
            left: a.width,
            right: b.width,
        });
    }
    let bits = a.width.bits();
    let distance = ((a.bits ^ b.bits) & a.width.mask()).count_ones();
    Ok(1.0 - f64::from(distance) / f64::from(bits))
}

/// Outcome of applying a threshold to a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Score at or above the threshold
    Similar,
    /// Score below the threshold
    Dissimilar,
}

/// Similarity threshold as a percentage.
///
/// Zero disables filtering: every pair classifies as similar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Threshold(f64);

impl Threshold {
    /// Validate a percentage in `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::ThresholdOutOfRange`] for NaN or values
    /// outside the range.
    pub fn new(percent: f64) -> Result<Self, CompareError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(CompareError::ThresholdOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    /// Threshold that reports every pair.
    #[must_use]
    pub fn disabled() -> Self {
        Self(0.0)
    }

    /// Percentage value.
    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }

    /// True when the threshold can reject a pair.
    #[must_use]
    pub fn is_filtering(self) -> bool {
        self.0 > 0.0
    }

    /// Classify a score in `[0, 1]`.
    #[must_use]
    pub fn classify(self, similarity: f64) -> Classification {
        if similarity * 100.0 >= self.0 {
            Classification::Similar
        } else {
            Classification::Dissimilar
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Score of one unordered pair of records.
///
/// `left` and `right` index into the record slice passed to
/// [`compare_pairs`], with `left < right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairComparison {
    /// Index of the earlier record
    pub left: usize,
    /// Index of the later record
    pub right: usize,
    /// Similarity in `[0, 1]`
    pub similarity: f64,
    /// Classification under the threshold in use
    pub classification: Classification,
}

impl PairComparison {
    /// Similarity as a percentage.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.similarity * 100.0
    }

    /// True when the pair met the threshold.
    #[must_use]
    pub fn is_similar(&self) -> bool {
        self.classification == Classification::Similar
    }
}

/// Score every unordered pair `i < j` of `records` in slice order.
///
/// # Errors
///
/// Fails on the first record without a similarity fingerprint or on a
/// width mismatch.
pub fn compare_pairs(
    records: &[FileRecord],
    threshold: Threshold,
) -> Result<Vec<PairComparison>, CompareError> {
    let fingerprints = records
        .iter()
        .map(|r| {
            r.similarity
                .ok_or_else(|| CompareError::MissingFingerprint(r.path.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = fingerprints.len();
    let mut pairs = Vec::with_capacity(n.saturating_mul(n.saturating_sub(1)) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let score = similarity(fingerprints[i], fingerprints[j])?;
            pairs.push(PairComparison {
                left: i,
                right: j,
                similarity: score,
                classification: threshold.classify(score),
            });
        }
    }

    log::debug!(
        "Compared {} pairs, {} similar at {}",
        pairs.len(),
        pairs.iter().filter(|p| p.is_similar()).count(),
        threshold
    );
    Ok(pairs)
}
