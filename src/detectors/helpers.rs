//! Shared trailing-window arithmetic for formation detectors.
//!
//! Windows are addressed in "bars ago" terms relative to the end of the
//! series: `from` bars ago through `to` bars ago inclusive, with
//! `from >= to` and `to == 0` meaning today. Every helper returns `None`
//! when the series is too short for the requested window, and [`ratio`]
//! returns `None` on a zero denominator so a degenerate division suppresses
//! a single predicate instead of producing NaN or a panic.

use crate::OHLCV;

/// Trailing sub-window from `from` bars ago through `to` bars ago inclusive.
#[inline]
pub fn window<T: OHLCV>(bars: &[T], from: usize, to: usize) -> Option<&[T]> {
    if to > from {
        return None;
    }
    let start = bars.len().checked_sub(from + 1)?;
    let end = bars.len() - to;
    Some(&bars[start..end])
}

/// Highest high over the trailing window.
pub fn highest_high<T: OHLCV>(bars: &[T], from: usize, to: usize) -> Option<f64> {
    let w = window(bars, from, to)?;
    Some(w.iter().map(|b| b.high()).fold(f64::MIN, f64::max))
}

/// Lowest low over the trailing window.
pub fn lowest_low<T: OHLCV>(bars: &[T], from: usize, to: usize) -> Option<f64> {
    let w = window(bars, from, to)?;
    Some(w.iter().map(|b| b.low()).fold(f64::MAX, f64::min))
}

/// Mean high over the trailing window.
pub fn mean_high<T: OHLCV>(bars: &[T], from: usize, to: usize) -> Option<f64> {
    let w = window(bars, from, to)?;
    Some(w.iter().map(|b| b.high()).sum::<f64>() / w.len() as f64)
}

/// Mean low over the trailing window.
pub fn mean_low<T: OHLCV>(bars: &[T], from: usize, to: usize) -> Option<f64> {
    let w = window(bars, from, to)?;
    Some(w.iter().map(|b| b.low()).sum::<f64>() / w.len() as f64)
}

/// Close `ago` bars ago (0 = today).
#[inline]
pub fn close_ago<T: OHLCV>(bars: &[T], ago: usize) -> Option<f64> {
    let idx = bars.len().checked_sub(ago + 1)?;
    Some(bars[idx].close())
}

/// Simple moving average of closes over the `period`-bar window ending
/// `end_ago` bars ago.
pub fn sma_close<T: OHLCV>(bars: &[T], end_ago: usize, period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let w = window(bars, end_ago + period - 1, end_ago)?;
    Some(w.iter().map(|b| b.close()).sum::<f64>() / w.len() as f64)
}

/// Sample standard deviation of closes over the `period`-bar window ending
/// `end_ago` bars ago. Requires `period >= 2`.
pub fn std_close<T: OHLCV>(bars: &[T], end_ago: usize, period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let w = window(bars, end_ago + period - 1, end_ago)?;
    let mean = w.iter().map(|b| b.close()).sum::<f64>() / w.len() as f64;
    let var = w
        .iter()
        .map(|b| {
            let d = b.close() - mean;
            d * d
        })
        .sum::<f64>()
        / (w.len() - 1) as f64;
    Some(var.sqrt())
}

/// Guarded division: `None` when the denominator is zero.
#[inline]
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den.abs() <= f64::EPSILON {
        None
    } else {
        Some(num / den)
    }
}
