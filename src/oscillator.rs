//! Smoothed stochastic momentum oscillator (%K / %D).
//!
//! The raw stochastic value RSV measures where today's close sits inside the
//! trailing high-low range, scaled to 0..100. Both outputs are then smoothed
//! recursively with fixed 2/3 : 1/3 weights:
//!
//! ```text
//! K(i) = 2/3 * K(i-1) + 1/3 * RSV(i)
//! D(i) = 2/3 * D(i-1) + 1/3 * K(i)
//! ```
//!
//! The recursion is seeded at the neutral value 50, and bars without a full
//! lookback window emit the seed directly. Each value depends on its
//! predecessor, so the series is computed in a single left-to-right pass.

use crate::{Result, ScanError, OHLCV};

/// Default RSV lookback window in bars.
pub const DEFAULT_PERIOD: usize = 9;

/// Neutral seed for the smoothing recursion, also the fallback RSV for a
/// window with zero range (a completely flat stretch of bars).
pub const NEUTRAL: f64 = 50.0;

/// Computed %K / %D series, same length and alignment as the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

impl Oscillator {
    /// Compute the oscillator over `bars` with the given RSV lookback.
    ///
    /// Errors with [`ScanError::InsufficientHistory`] when fewer than
    /// `period` bars are supplied.
    pub fn compute<T: OHLCV>(bars: &[T], period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ScanError::InvalidValue("oscillator period must be > 0"));
        }
        if bars.len() < period {
            return Err(ScanError::InsufficientHistory {
                need: period,
                got: bars.len(),
            });
        }

        let mut k = Vec::with_capacity(bars.len());
        let mut d = Vec::with_capacity(bars.len());
        let mut prev_k = NEUTRAL;
        let mut prev_d = NEUTRAL;

        for i in 0..bars.len() {
            let rsv = if i + 1 < period {
                NEUTRAL
            } else {
                let window = &bars[i + 1 - period..=i];
                let hi = window.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
                let lo = window.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
                let range = hi - lo;
                if range <= f64::EPSILON {
                    NEUTRAL
                } else {
                    (bars[i].close() - lo) / range * 100.0
                }
            };

            prev_k = (2.0 * prev_k + rsv) / 3.0;
            prev_d = (2.0 * prev_d + prev_k) / 3.0;
            k.push(prev_k);
            d.push(prev_d);
        }

        Ok(Self { k, d })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.k.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    /// Trailing slice of the `n` most recent %K values, oldest first.
    /// Returns `None` if fewer than `n` values exist.
    pub fn trailing_k(&self, n: usize) -> Option<&[f64]> {
        let start = self.k.len().checked_sub(n)?;
        Some(&self.k[start..])
    }

    /// Trailing slice of the `n` most recent %D values, oldest first.
    pub fn trailing_d(&self, n: usize) -> Option<&[f64]> {
        let start = self.d.len().checked_sub(n)?;
        Some(&self.d[start..])
    }
}
