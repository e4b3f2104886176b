//! Support/resistance reference levels.
//!
//! Independent of pattern matching: the 20-day ("short-term") and 60-day
//! ("swing") extremes give the renderer something to anchor on when no
//! formation fired. Swing levels are always emitted; a short-term level is
//! dropped when it sits within 2% of its swing counterpart, which would only
//! paint a near-duplicate line.

use serde::{Deserialize, Serialize};

use crate::detectors::helpers::{highest_high, lowest_low, ratio};
use crate::OHLCV;

/// Lookback horizon of a reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    /// 20-day extreme
    Short,
    /// 60-day extreme
    Swing,
}

/// Which side of price the level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Support,
    Resistance,
}

/// One horizontal reference line for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLevel {
    pub horizon: Horizon,
    pub side: Side,
    pub price: f64,
}

/// Bars in the short-term window.
pub const SHORT_WINDOW: usize = 20;
/// Bars in the swing window.
pub const SWING_WINDOW: usize = 60;
/// Minimum relative distance for a short-term level to be worth drawing.
pub const DISTINCT_PCT: f64 = 0.02;

/// Compute up to four reference levels from the series tail.
///
/// Returns an empty vector when fewer than [`SWING_WINDOW`] bars exist.
pub fn reference_levels<T: OHLCV>(bars: &[T]) -> Vec<ReferenceLevel> {
    let Some(swing_high) = highest_high(bars, SWING_WINDOW - 1, 0) else {
        return Vec::new();
    };
    let Some(swing_low) = lowest_low(bars, SWING_WINDOW - 1, 0) else {
        return Vec::new();
    };
    let Some(short_high) = highest_high(bars, SHORT_WINDOW - 1, 0) else {
        return Vec::new();
    };
    let Some(short_low) = lowest_low(bars, SHORT_WINDOW - 1, 0) else {
        return Vec::new();
    };

    let mut levels = Vec::with_capacity(4);

    let distinct = |short: f64, swing: f64| {
        ratio((short - swing).abs(), swing).is_some_and(|d| d > DISTINCT_PCT)
    };

    if distinct(short_high, swing_high) {
        levels.push(ReferenceLevel {
            horizon: Horizon::Short,
            side: Side::Resistance,
            price: short_high,
        });
    }
    if distinct(short_low, swing_low) {
        levels.push(ReferenceLevel {
            horizon: Horizon::Short,
            side: Side::Support,
            price: short_low,
        });
    }

    // Swing extremes are always worth drawing.
    levels.push(ReferenceLevel {
        horizon: Horizon::Swing,
        side: Side::Resistance,
        price: swing_high,
    });
    levels.push(ReferenceLevel {
        horizon: Horizon::Swing,
        side: Side::Support,
        price: swing_low,
    });

    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        h: f64,
        l: f64,
        c: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.c
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            0.0
        }
    }

    fn bar(h: f64, l: f64) -> Bar {
        Bar {
            h,
            l,
            c: (h + l) / 2.0,
        }
    }

    #[test]
    fn too_short_series_yields_nothing() {
        let bars: Vec<Bar> = (0..30).map(|_| bar(102.0, 98.0)).collect();
        assert!(reference_levels(&bars).is_empty());
    }

    #[test]
    fn flat_series_keeps_only_swing_levels() {
        let bars: Vec<Bar> = (0..80).map(|_| bar(102.0, 98.0)).collect();
        let levels = reference_levels(&bars);
        assert_eq!(levels.len(), 2);
        assert!(levels.iter().all(|l| l.horizon == Horizon::Swing));
        assert_eq!(levels[0].price, 102.0);
        assert_eq!(levels[1].price, 98.0);
    }

    #[test]
    fn distinct_short_extremes_are_included() {
        // Wide range 60 bars ago, tight range in the last 20.
        let mut bars: Vec<Bar> = (0..60).map(|_| bar(120.0, 80.0)).collect();
        bars.extend((0..20).map(|_| bar(102.0, 98.0)));
        let levels = reference_levels(&bars);
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0].horizon, Horizon::Short);
        assert_eq!(levels[0].side, Side::Resistance);
        assert_eq!(levels[0].price, 102.0);
        assert_eq!(levels[1].price, 98.0);
        assert_eq!(levels[2].price, 120.0);
        assert_eq!(levels[3].price, 80.0);
    }
}
