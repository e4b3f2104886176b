//! Single-candle reversal detectors.
//!
//! Both read only today's and yesterday's bars and mark a two-day zone over
//! the reversal. Conditions are deliberately simple, these are confirmation
//! signals rather than standalone formations.

use std::collections::HashMap;

use crate::{
    params::{get_factor, ParamMeta, ParameterizedDetector},
    Bias, Factor, Geometry, Oscillator, Result, Signal, SignalCategory, SignalDetector, SignalId,
    OHLCVExt, OHLCV,
};

impl_with_defaults!(BullishEngulfingDetector, HammerDetector);

// ============================================================
// BULLISH ENGULFING
// ============================================================

/// Today's bullish body fully contains yesterday's bearish body.
#[derive(Debug, Clone, Default)]
pub struct BullishEngulfingDetector;

impl SignalDetector for BullishEngulfingDetector {
    fn id(&self) -> SignalId {
        SignalId("BULLISH_ENGULFING")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::ReversalCandle
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let len = bars.len();
        let prev = bars.get(len.checked_sub(2)?)?;
        let curr = bars.last()?;

        if prev.is_bearish()
            && curr.is_bullish()
            && curr.close() > prev.open()
            && curr.open() < prev.close()
        {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::ReversalCandle,
                bias: Bias::Bullish,
                geometry: Geometry::Zone {
                    high: curr.high().max(prev.high()),
                    low: curr.low().min(prev.low()),
                    span: 2,
                },
            })
        } else {
            None
        }
    }
}

const BULLISH_ENGULFING_PARAMS: &[ParamMeta] = &[];

impl ParameterizedDetector for BullishEngulfingDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BULLISH_ENGULFING_PARAMS
    }

    fn with_params(_params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self)
    }

    fn signal_id_str() -> &'static str {
        "BULLISH_ENGULFING"
    }
}

// ============================================================
// HAMMER
// ============================================================

/// Long lower shadow relative to the body, closing above yesterday's close.
#[derive(Debug, Clone)]
pub struct HammerDetector {
    pub shadow_body_factor: Factor,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_body_factor: Factor::new_const(2.0),
        }
    }
}

impl SignalDetector for HammerDetector {
    fn id(&self) -> SignalId {
        SignalId("HAMMER")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::ReversalCandle
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _osc: &Oscillator) -> Option<Signal> {
        let len = bars.len();
        let prev = bars.get(len.checked_sub(2)?)?;
        let curr = bars.last()?;

        // Zero body: any positive lower shadow clears the threshold.
        let hammer_shape = curr.lower_shadow() > self.shadow_body_factor.get() * curr.body();
        if hammer_shape && curr.close() > prev.close() {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::ReversalCandle,
                bias: Bias::Bullish,
                geometry: Geometry::Zone {
                    high: curr.high().max(prev.high()),
                    low: curr.low().min(prev.low()),
                    span: 2,
                },
            })
        } else {
            None
        }
    }
}

const HAMMER_PARAMS: &[ParamMeta] = &[ParamMeta::factor(
    "shadow_body_factor",
    2.0,
    (1.5, 3.0, 0.5),
    "Lower shadow must exceed the body times this factor",
)];

impl ParameterizedDetector for HammerDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            shadow_body_factor: get_factor(params, "shadow_body_factor", 2.0)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "HAMMER"
    }
}
