//! Structural zone detectors.
//!
//! Each detector reads fixed trailing windows of the price series and, on a
//! match, contributes the geometry the formation projects onto the chart: a
//! horizontal level, a price band, or a time-price rectangle. All predicates
//! are independent; none suppresses another.
//!
//! Catalogue: box breakout/consolidation, double bottom (W), double top (M),
//! head-and-shoulders bottom/top, triangle squeeze, cup-and-handle, rounding
//! bottom, bull flag.

use std::collections::HashMap;

use super::helpers::{
    close_ago, highest_high, lowest_low, mean_high, mean_low, ratio, sma_close, std_close,
};
use crate::{
    params::{get_factor, get_period, ParamMeta, ParameterizedDetector},
    Bias, Factor, Geometry, Oscillator, Period, Result, ScanError, Signal, SignalCategory,
    SignalDetector, SignalId, OHLCV,
};

impl_with_defaults!(
    BoxBreakoutDetector,
    BoxConsolidationDetector,
    DoubleBottomDetector,
    DoubleTopDetector,
    HeadShouldersBottomDetector,
    HeadShouldersTopDetector,
    TriangleSqueezeDetector,
    CupHandleDetector,
    RoundingBottomDetector,
    BullFlagDetector,
);

/// Shared box-range measurement: high, low and amplitude over the trailing
/// `lookback` bars excluding today. `None` when the series is too short or
/// the range floor is zero.
fn box_range<T: OHLCV>(bars: &[T], lookback: usize) -> Option<(f64, f64, f64)> {
    let hi = highest_high(bars, lookback, 1)?;
    let lo = lowest_low(bars, lookback, 1)?;
    let amplitude = ratio(hi - lo, lo)?;
    Some((hi, lo, amplitude))
}

// ============================================================
// BOX BREAKOUT
// ============================================================

/// Close pushes above a narrow trailing trading range.
#[derive(Debug, Clone)]
pub struct BoxBreakoutDetector {
    pub lookback: Period,
    pub max_amplitude: Factor,
}

impl Default for BoxBreakoutDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(60),
            max_amplitude: Factor::new_const(0.25),
        }
    }
}

impl SignalDetector for BoxBreakoutDetector {
    fn id(&self) -> SignalId {
        SignalId("BOX_BREAKOUT")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.lookback.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let (hi, lo, amplitude) = box_range(bars, self.lookback.get())?;
        let close = close_ago(bars, 0)?;
        if amplitude < self.max_amplitude.get() && close > hi {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bullish,
                geometry: Geometry::Zone {
                    high: hi,
                    low: lo,
                    span: self.lookback.get(),
                },
            })
        } else {
            None
        }
    }
}

const BOX_BREAKOUT_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "lookback",
        60.0,
        (20.0, 120.0, 20.0),
        "Trailing bars (excluding today) defining the box",
    ),
    ParamMeta::factor(
        "max_amplitude",
        0.25,
        (0.15, 0.5, 0.05),
        "Maximum (high-low)/low amplitude for the range to count as a box",
    ),
];

impl ParameterizedDetector for BoxBreakoutDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BOX_BREAKOUT_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 60)?,
            max_amplitude: get_factor(params, "max_amplitude", 0.25)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "BOX_BREAKOUT"
    }
}

// ============================================================
// BOX CONSOLIDATION
// ============================================================

/// Close holds inside a narrow trailing range, in its upper half.
#[derive(Debug, Clone)]
pub struct BoxConsolidationDetector {
    pub lookback: Period,
    pub max_amplitude: Factor,
}

impl Default for BoxConsolidationDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(60),
            max_amplitude: Factor::new_const(0.25),
        }
    }
}

impl SignalDetector for BoxConsolidationDetector {
    fn id(&self) -> SignalId {
        SignalId("BOX_CONSOLIDATION")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.lookback.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let (hi, lo, amplitude) = box_range(bars, self.lookback.get())?;
        let close = close_ago(bars, 0)?;
        let midpoint = (hi + lo) / 2.0;
        if amplitude < self.max_amplitude.get() && lo < close && close < hi && close > midpoint {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Neutral,
                geometry: Geometry::Zone {
                    high: hi,
                    low: lo,
                    span: self.lookback.get(),
                },
            })
        } else {
            None
        }
    }
}

const BOX_CONSOLIDATION_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "lookback",
        60.0,
        (20.0, 120.0, 20.0),
        "Trailing bars (excluding today) defining the box",
    ),
    ParamMeta::factor(
        "max_amplitude",
        0.25,
        (0.15, 0.5, 0.05),
        "Maximum (high-low)/low amplitude for the range to count as a box",
    ),
];

impl ParameterizedDetector for BoxConsolidationDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BOX_CONSOLIDATION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 60)?,
            max_amplitude: get_factor(params, "max_amplitude", 0.25)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "BOX_CONSOLIDATION"
    }
}

// ============================================================
// DOUBLE BOTTOM (W)
// ============================================================

/// Two lows at near-equal levels, with the close confirming the bounce off
/// the second one.
#[derive(Debug, Clone)]
pub struct DoubleBottomDetector {
    pub recent_window: Period,
    pub prior_from: Period,
    pub prior_to: Period,
    pub tolerance: Factor,
    pub confirm: Factor,
}

impl Default for DoubleBottomDetector {
    fn default() -> Self {
        Self {
            recent_window: Period::new_const(10),
            prior_from: Period::new_const(60),
            prior_to: Period::new_const(20),
            tolerance: Factor::new_const(0.03),
            confirm: Factor::new_const(1.02),
        }
    }
}

impl SignalDetector for DoubleBottomDetector {
    fn id(&self) -> SignalId {
        SignalId("DOUBLE_BOTTOM")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.prior_from.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let recent_low = lowest_low(bars, self.recent_window.get() - 1, 0)?;
        let prior_low = lowest_low(bars, self.prior_from.get(), self.prior_to.get())?;
        let r = ratio(recent_low, prior_low)?;
        let close = close_ago(bars, 0)?;

        let tol = self.tolerance.get();
        if r > 1.0 - tol && r < 1.0 + tol && close > recent_low * self.confirm.get() {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bullish,
                geometry: Geometry::Level { price: recent_low },
            })
        } else {
            None
        }
    }

    fn validate_config(&self) -> Result<()> {
        if self.prior_to.get() >= self.prior_from.get() {
            return Err(ScanError::InvalidConfig(
                "prior_to must be nearer than prior_from".into(),
            ));
        }
        Ok(())
    }
}

const DOUBLE_BOTTOM_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "recent_window",
        10.0,
        (5.0, 20.0, 5.0),
        "Trailing bars defining the second (recent) low",
    ),
    ParamMeta::period(
        "prior_from",
        60.0,
        (40.0, 90.0, 10.0),
        "Far edge of the first-low window, in bars ago",
    ),
    ParamMeta::period(
        "prior_to",
        20.0,
        (10.0, 40.0, 10.0),
        "Near edge of the first-low window, in bars ago",
    ),
    ParamMeta::factor(
        "tolerance",
        0.03,
        (0.03, 0.1, 0.01),
        "Allowed deviation between the two lows",
    ),
    ParamMeta::factor(
        "confirm",
        1.02,
        (1.02, 1.05, 0.01),
        "Close must exceed recent_low times this multiplier",
    ),
];

impl ParameterizedDetector for DoubleBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_BOTTOM_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            recent_window: get_period(params, "recent_window", 10)?,
            prior_from: get_period(params, "prior_from", 60)?,
            prior_to: get_period(params, "prior_to", 20)?,
            tolerance: get_factor(params, "tolerance", 0.03)?,
            confirm: get_factor(params, "confirm", 1.02)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "DOUBLE_BOTTOM"
    }
}

// ============================================================
// DOUBLE TOP (M)
// ============================================================

/// Two highs at near-equal levels, with the close already breaking the
/// trailing support shelf.
#[derive(Debug, Clone)]
pub struct DoubleTopDetector {
    pub recent_window: Period,
    pub prior_from: Period,
    pub prior_to: Period,
    pub tolerance: Factor,
    pub breakdown_window: Period,
}

impl Default for DoubleTopDetector {
    fn default() -> Self {
        Self {
            recent_window: Period::new_const(10),
            prior_from: Period::new_const(60),
            prior_to: Period::new_const(20),
            tolerance: Factor::new_const(0.03),
            breakdown_window: Period::new_const(20),
        }
    }
}

impl SignalDetector for DoubleTopDetector {
    fn id(&self) -> SignalId {
        SignalId("DOUBLE_TOP")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.prior_from.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let recent_high = highest_high(bars, self.recent_window.get() - 1, 0)?;
        let prior_high = highest_high(bars, self.prior_from.get(), self.prior_to.get())?;
        let r = ratio(recent_high, prior_high)?;
        // Shelf excludes today so a gap-down close can undercut it.
        let shelf = lowest_low(bars, self.breakdown_window.get(), 1)?;
        let close = close_ago(bars, 0)?;

        let tol = self.tolerance.get();
        if r > 1.0 - tol && r < 1.0 + tol && close < shelf {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bearish,
                geometry: Geometry::Level { price: recent_high },
            })
        } else {
            None
        }
    }

    fn validate_config(&self) -> Result<()> {
        if self.prior_to.get() >= self.prior_from.get() {
            return Err(ScanError::InvalidConfig(
                "prior_to must be nearer than prior_from".into(),
            ));
        }
        Ok(())
    }
}

const DOUBLE_TOP_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "recent_window",
        10.0,
        (5.0, 20.0, 5.0),
        "Trailing bars defining the second (recent) high",
    ),
    ParamMeta::period(
        "prior_from",
        60.0,
        (40.0, 90.0, 10.0),
        "Far edge of the first-high window, in bars ago",
    ),
    ParamMeta::period(
        "prior_to",
        20.0,
        (10.0, 40.0, 10.0),
        "Near edge of the first-high window, in bars ago",
    ),
    ParamMeta::factor(
        "tolerance",
        0.03,
        (0.03, 0.1, 0.01),
        "Allowed deviation between the two highs",
    ),
    ParamMeta::period(
        "breakdown_window",
        20.0,
        (10.0, 40.0, 10.0),
        "Close must undercut the lowest low of this many trailing bars",
    ),
];

impl ParameterizedDetector for DoubleTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_TOP_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            recent_window: get_period(params, "recent_window", 10)?,
            prior_from: get_period(params, "prior_from", 60)?,
            prior_to: get_period(params, "prior_to", 20)?,
            tolerance: get_factor(params, "tolerance", 0.03)?,
            breakdown_window: get_period(params, "breakdown_window", 20)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "DOUBLE_TOP"
    }
}

// ============================================================
// HEAD & SHOULDERS BOTTOM
// ============================================================

/// Trailing window split into three equal segments; the middle low (head)
/// undercuts both shoulders, which sit at near-equal depth.
#[derive(Debug, Clone)]
pub struct HeadShouldersBottomDetector {
    pub segment: Period,
    pub shoulder_tolerance: Factor,
}

impl Default for HeadShouldersBottomDetector {
    fn default() -> Self {
        Self {
            segment: Period::new_const(20),
            shoulder_tolerance: Factor::new_const(0.1),
        }
    }
}

impl SignalDetector for HeadShouldersBottomDetector {
    fn id(&self) -> SignalId {
        SignalId("HEAD_SHOULDERS_BOTTOM")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.segment.get() * 3
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let seg = self.segment.get();
        let left = lowest_low(bars, 3 * seg - 1, 2 * seg)?;
        let head = lowest_low(bars, 2 * seg - 1, seg)?;
        let right = lowest_low(bars, seg - 1, 0)?;

        if head >= left || head >= right {
            return None;
        }
        let symmetry = ratio(left, right)?;
        let tol = self.shoulder_tolerance.get();
        if symmetry <= 1.0 - tol || symmetry >= 1.0 + tol {
            return None;
        }

        Some(Signal {
            id: SignalDetector::id(self),
            category: SignalCategory::StructuralZone,
            bias: Bias::Bullish,
            geometry: Geometry::Level { price: head },
        })
    }
}

const HS_BOTTOM_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "segment",
        20.0,
        (10.0, 30.0, 5.0),
        "Bars per shoulder/head segment (window is three segments)",
    ),
    ParamMeta::factor(
        "shoulder_tolerance",
        0.1,
        (0.05, 0.2, 0.05),
        "Allowed deviation between left and right shoulder lows",
    ),
];

impl ParameterizedDetector for HeadShouldersBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HS_BOTTOM_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            segment: get_period(params, "segment", 20)?,
            shoulder_tolerance: get_factor(params, "shoulder_tolerance", 0.1)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "HEAD_SHOULDERS_BOTTOM"
    }
}

// ============================================================
// HEAD & SHOULDERS TOP
// ============================================================

/// Mirror formation: middle high (head) above both shoulder highs, with the
/// close already under the neckline (lowest low of the full window).
#[derive(Debug, Clone)]
pub struct HeadShouldersTopDetector {
    pub segment: Period,
}

impl Default for HeadShouldersTopDetector {
    fn default() -> Self {
        Self {
            segment: Period::new_const(20),
        }
    }
}

impl SignalDetector for HeadShouldersTopDetector {
    fn id(&self) -> SignalId {
        SignalId("HEAD_SHOULDERS_TOP")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.segment.get() * 3
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let seg = self.segment.get();
        let left = highest_high(bars, 3 * seg - 1, 2 * seg)?;
        let head = highest_high(bars, 2 * seg - 1, seg)?;
        let right = highest_high(bars, seg - 1, 0)?;
        // Neckline excludes today so the breaking close can undercut it.
        let neckline = lowest_low(bars, 3 * seg - 1, 1)?;
        let close = close_ago(bars, 0)?;

        if head > left && head > right && close < neckline {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bearish,
                geometry: Geometry::Level { price: head },
            })
        } else {
            None
        }
    }
}

const HS_TOP_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "segment",
    20.0,
    (10.0, 30.0, 5.0),
    "Bars per shoulder/head segment (window is three segments)",
)];

impl ParameterizedDetector for HeadShouldersTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HS_TOP_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            segment: get_period(params, "segment", 20)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "HEAD_SHOULDERS_TOP"
    }
}

// ============================================================
// TRIANGLE SQUEEZE
// ============================================================

/// Volatility squeeze: the moving-average envelope bandwidth has contracted
/// below a threshold at some point over the confirmation window.
#[derive(Debug, Clone)]
pub struct TriangleSqueezeDetector {
    pub period: Period,
    pub width: Factor,
    pub max_bandwidth: Factor,
    pub confirm_days: Period,
}

impl Default for TriangleSqueezeDetector {
    fn default() -> Self {
        Self {
            period: Period::new_const(20),
            width: Factor::new_const(2.0),
            max_bandwidth: Factor::new_const(0.05),
            confirm_days: Period::new_const(5),
        }
    }
}

impl SignalDetector for TriangleSqueezeDetector {
    fn id(&self) -> SignalId {
        SignalId("TRIANGLE_SQUEEZE")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.period.get() + self.confirm_days.get() - 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let period = self.period.get();
        let width = self.width.get();

        let mut min_bandwidth = f64::MAX;
        for ago in 0..self.confirm_days.get() {
            let ma = sma_close(bars, ago, period)?;
            let sd = std_close(bars, ago, period)?;
            // (upper - lower) / ma with upper/lower = ma +/- width*sd
            let bw = ratio(2.0 * width * sd, ma)?;
            min_bandwidth = min_bandwidth.min(bw);
        }

        if min_bandwidth < self.max_bandwidth.get() {
            let ma = sma_close(bars, 0, period)?;
            let sd = std_close(bars, 0, period)?;
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Neutral,
                geometry: Geometry::Band {
                    high: ma + width * sd,
                    low: ma - width * sd,
                },
            })
        } else {
            None
        }
    }
}

const SQUEEZE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "period",
        20.0,
        (20.0, 60.0, 20.0),
        "Moving-average window for the envelope",
    ),
    ParamMeta::factor(
        "width",
        2.0,
        (1.0, 3.0, 0.5),
        "Standard-deviation multiple defining the envelope half-width",
    ),
    ParamMeta::factor(
        "max_bandwidth",
        0.05,
        (0.05, 0.2, 0.05),
        "Bandwidth the envelope must contract below",
    ),
    ParamMeta::period(
        "confirm_days",
        5.0,
        (1.0, 10.0, 1.0),
        "Trailing sessions over which the minimum bandwidth is taken",
    ),
];

impl ParameterizedDetector for TriangleSqueezeDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SQUEEZE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 20)?,
            width: get_factor(params, "width", 2.0)?,
            max_bandwidth: get_factor(params, "max_bandwidth", 0.05)?,
            confirm_days: get_period(params, "confirm_days", 5)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "TRIANGLE_SQUEEZE"
    }
}

// ============================================================
// CUP & HANDLE
// ============================================================

/// Deep rounded base between two rims of comparable height, with the close
/// recovering toward the right rim.
#[derive(Debug, Clone)]
pub struct CupHandleDetector {
    pub left_window: Period,
    pub base_window: Period,
    pub handle_window: Period,
    pub depth: Factor,
    pub rim_tolerance: Factor,
    pub confirm: Factor,
}

impl Default for CupHandleDetector {
    fn default() -> Self {
        Self {
            left_window: Period::new_const(40),
            base_window: Period::new_const(60),
            handle_window: Period::new_const(20),
            depth: Factor::new_const(0.85),
            rim_tolerance: Factor::new_const(0.1),
            confirm: Factor::new_const(0.9),
        }
    }
}

impl SignalDetector for CupHandleDetector {
    fn id(&self) -> SignalId {
        SignalId("CUP_HANDLE")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.left_window.get() + self.base_window.get() + self.handle_window.get()
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let left = self.left_window.get();
        let base = self.base_window.get();
        let handle = self.handle_window.get();
        let total = left + base + handle;

        let left_rim = highest_high(bars, total - 1, base + handle)?;
        let bottom = lowest_low(bars, base + handle - 1, handle)?;
        let right_rim = highest_high(bars, handle - 1, 0)?;
        let rim_ratio = ratio(right_rim, left_rim)?;
        let close = close_ago(bars, 0)?;

        let tol = self.rim_tolerance.get();
        if bottom < left_rim * self.depth.get()
            && rim_ratio > 1.0 - tol
            && rim_ratio < 1.0 + tol
            && close > right_rim * self.confirm.get()
        {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bullish,
                geometry: Geometry::Level { price: left_rim },
            })
        } else {
            None
        }
    }
}

const CUP_HANDLE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "left_window",
        40.0,
        (20.0, 60.0, 10.0),
        "Bars forming the left rim",
    ),
    ParamMeta::period(
        "base_window",
        60.0,
        (40.0, 80.0, 10.0),
        "Bars forming the cup base",
    ),
    ParamMeta::period(
        "handle_window",
        20.0,
        (10.0, 30.0, 5.0),
        "Bars forming the right rim / handle",
    ),
    ParamMeta::factor(
        "depth",
        0.85,
        (0.7, 0.9, 0.05),
        "Base must undercut left_rim times this factor",
    ),
    ParamMeta::factor(
        "rim_tolerance",
        0.1,
        (0.05, 0.2, 0.05),
        "Allowed deviation between rim heights",
    ),
    ParamMeta::factor(
        "confirm",
        0.9,
        (0.85, 1.0, 0.05),
        "Close must exceed right_rim times this factor",
    ),
];

impl ParameterizedDetector for CupHandleDetector {
    fn param_meta() -> &'static [ParamMeta] {
        CUP_HANDLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            left_window: get_period(params, "left_window", 40)?,
            base_window: get_period(params, "base_window", 60)?,
            handle_window: get_period(params, "handle_window", 20)?,
            depth: get_factor(params, "depth", 0.85)?,
            rim_tolerance: get_factor(params, "rim_tolerance", 0.1)?,
            confirm: get_factor(params, "confirm", 0.9)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "CUP_HANDLE"
    }
}

// ============================================================
// ROUNDING BOTTOM
// ============================================================

/// Saucer: the mean low of the basin sits well below the mean high at the
/// onset, and the recovered rim has drifted back near the onset level.
#[derive(Debug, Clone)]
pub struct RoundingBottomDetector {
    pub basin_from: Period,
    pub basin_to: Period,
    pub onset_from: Period,
    pub onset_to: Period,
    pub rim_window: Period,
    pub depth: Factor,
    pub rim_tolerance: Factor,
}

impl Default for RoundingBottomDetector {
    fn default() -> Self {
        Self {
            basin_from: Period::new_const(80),
            basin_to: Period::new_const(40),
            onset_from: Period::new_const(120),
            onset_to: Period::new_const(100),
            rim_window: Period::new_const(20),
            depth: Factor::new_const(0.8),
            rim_tolerance: Factor::new_const(0.1),
        }
    }
}

impl SignalDetector for RoundingBottomDetector {
    fn id(&self) -> SignalId {
        SignalId("ROUNDING_BOTTOM")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.onset_from.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let basin_low = mean_low(bars, self.basin_from.get(), self.basin_to.get())?;
        let onset_high = mean_high(bars, self.onset_from.get(), self.onset_to.get())?;
        let rim_high = mean_high(bars, self.rim_window.get() - 1, 0)?;
        let drift = ratio((onset_high - rim_high).abs(), onset_high)?;

        if basin_low < onset_high * self.depth.get() && drift < self.rim_tolerance.get() {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bullish,
                geometry: Geometry::Level { price: basin_low },
            })
        } else {
            None
        }
    }

    fn validate_config(&self) -> Result<()> {
        if self.basin_to.get() >= self.basin_from.get()
            || self.onset_to.get() >= self.onset_from.get()
        {
            return Err(ScanError::InvalidConfig(
                "window near edges must be nearer than far edges".into(),
            ));
        }
        Ok(())
    }
}

const ROUNDING_BOTTOM_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "basin_from",
        80.0,
        (60.0, 100.0, 10.0),
        "Far edge of the basin window, in bars ago",
    ),
    ParamMeta::period(
        "basin_to",
        40.0,
        (20.0, 60.0, 10.0),
        "Near edge of the basin window, in bars ago",
    ),
    ParamMeta::period(
        "onset_from",
        120.0,
        (100.0, 140.0, 10.0),
        "Far edge of the onset window, in bars ago",
    ),
    ParamMeta::period(
        "onset_to",
        100.0,
        (80.0, 120.0, 10.0),
        "Near edge of the onset window, in bars ago",
    ),
    ParamMeta::period(
        "rim_window",
        20.0,
        (10.0, 30.0, 5.0),
        "Trailing bars averaged into the recovered rim",
    ),
    ParamMeta::factor(
        "depth",
        0.8,
        (0.7, 0.9, 0.05),
        "Basin mean low must undercut onset mean high times this factor",
    ),
    ParamMeta::factor(
        "rim_tolerance",
        0.1,
        (0.05, 0.2, 0.05),
        "Allowed drift between onset and recovered rim",
    ),
];

impl ParameterizedDetector for RoundingBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        ROUNDING_BOTTOM_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            basin_from: get_period(params, "basin_from", 80)?,
            basin_to: get_period(params, "basin_to", 40)?,
            onset_from: get_period(params, "onset_from", 120)?,
            onset_to: get_period(params, "onset_to", 100)?,
            rim_window: get_period(params, "rim_window", 20)?,
            depth: get_factor(params, "depth", 0.8)?,
            rim_tolerance: get_factor(params, "rim_tolerance", 0.1)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "ROUNDING_BOTTOM"
    }
}

// ============================================================
// BULL FLAG
// ============================================================

/// Sharp prior advance (the pole) followed by a shallow pullback. No chart
/// geometry, the formation is trend-relative rather than level-bound.
#[derive(Debug, Clone)]
pub struct BullFlagDetector {
    pub pole_end: Period,
    pub pole_start: Period,
    pub min_gain: Factor,
    pub flag_window: Period,
    pub max_pullback: Factor,
}

impl Default for BullFlagDetector {
    fn default() -> Self {
        Self {
            pole_end: Period::new_const(20),
            pole_start: Period::new_const(40),
            min_gain: Factor::new_const(0.15),
            flag_window: Period::new_const(10),
            max_pullback: Factor::new_const(0.05),
        }
    }
}

impl SignalDetector for BullFlagDetector {
    fn id(&self) -> SignalId {
        SignalId("BULL_FLAG")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::StructuralZone
    }

    fn min_bars(&self) -> usize {
        self.pole_start.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let pole_top = close_ago(bars, self.pole_end.get())?;
        let pole_base = close_ago(bars, self.pole_start.get())?;
        let gain = ratio(pole_top - pole_base, pole_base)?;

        let flag_high = highest_high(bars, self.flag_window.get() - 1, 0)?;
        let close = close_ago(bars, 0)?;
        let pullback = ratio(flag_high - close, flag_high)?;

        if gain > self.min_gain.get() && pullback < self.max_pullback.get() {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::StructuralZone,
                bias: Bias::Bullish,
                geometry: Geometry::None,
            })
        } else {
            None
        }
    }
}

const BULL_FLAG_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "pole_end",
        20.0,
        (10.0, 30.0, 5.0),
        "Bars ago at which the pole advance ends",
    ),
    ParamMeta::period(
        "pole_start",
        40.0,
        (30.0, 60.0, 10.0),
        "Bars ago at which the pole advance starts",
    ),
    ParamMeta::factor(
        "min_gain",
        0.15,
        (0.1, 0.3, 0.05),
        "Minimum close-to-close gain over the pole",
    ),
    ParamMeta::period(
        "flag_window",
        10.0,
        (5.0, 20.0, 5.0),
        "Trailing bars defining the flag high",
    ),
    ParamMeta::factor(
        "max_pullback",
        0.05,
        (0.03, 0.1, 0.01),
        "Maximum retracement from the flag high",
    ),
];

impl ParameterizedDetector for BullFlagDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BULL_FLAG_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            pole_end: get_period(params, "pole_end", 20)?,
            pole_start: get_period(params, "pole_start", 40)?,
            min_gain: get_factor(params, "min_gain", 0.15)?,
            flag_window: get_period(params, "flag_window", 10)?,
            max_pullback: get_factor(params, "max_pullback", 0.05)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "BULL_FLAG"
    }
}
