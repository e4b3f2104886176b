//! Oscillator-saturation detectors.
//!
//! A saturation signal fires when %K has held an extreme reading for several
//! consecutive sessions, suggesting an overbought or oversold, trend-exhausted
//! condition. Both detectors read only the oscillator tail and emit no chart
//! geometry.

use std::collections::HashMap;

use crate::{
    params::{get_factor, get_period, ParamMeta, ParameterizedDetector},
    Bias, Factor, Geometry, Oscillator, Period, Result, Signal, SignalCategory, SignalDetector,
    SignalId, OHLCV,
};

impl_with_defaults!(KdHighSaturationDetector, KdLowSaturationDetector);

// ============================================================
// KD HIGH SATURATION
// ============================================================

/// %K above the overbought level for `run` consecutive sessions.
#[derive(Debug, Clone)]
pub struct KdHighSaturationDetector {
    pub level: Factor,
    pub run: Period,
}

impl Default for KdHighSaturationDetector {
    fn default() -> Self {
        Self {
            level: Factor::new_const(80.0),
            run: Period::new_const(3),
        }
    }
}

impl SignalDetector for KdHighSaturationDetector {
    fn id(&self) -> SignalId {
        SignalId("KD_HIGH_SATURATION")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MomentumSaturation
    }

    fn min_bars(&self) -> usize {
        self.run.get()
    }

    fn detect<T: OHLCV>(&self, _bars: &[T], osc: &Oscillator) -> Option<Signal> {
        let tail = osc.trailing_k(self.run.get())?;
        if tail.iter().all(|&k| k > self.level.get()) {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::MomentumSaturation,
                bias: Bias::Neutral,
                geometry: Geometry::None,
            })
        } else {
            None
        }
    }
}

const KD_HIGH_PARAMS: &[ParamMeta] = &[
    ParamMeta::factor(
        "level",
        80.0,
        (60.0, 95.0, 5.0),
        "Overbought %K level all trailing sessions must exceed",
    ),
    ParamMeta::period(
        "run",
        3.0,
        (2.0, 5.0, 1.0),
        "Consecutive sessions required above the level",
    ),
];

impl ParameterizedDetector for KdHighSaturationDetector {
    fn param_meta() -> &'static [ParamMeta] {
        KD_HIGH_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            level: get_factor(params, "level", 80.0)?,
            run: get_period(params, "run", 3)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "KD_HIGH_SATURATION"
    }
}

// ============================================================
// KD LOW SATURATION
// ============================================================

/// %K below the oversold level for `run` consecutive sessions.
#[derive(Debug, Clone)]
pub struct KdLowSaturationDetector {
    pub level: Factor,
    pub run: Period,
}

impl Default for KdLowSaturationDetector {
    fn default() -> Self {
        Self {
            level: Factor::new_const(20.0),
            run: Period::new_const(3),
        }
    }
}

impl SignalDetector for KdLowSaturationDetector {
    fn id(&self) -> SignalId {
        SignalId("KD_LOW_SATURATION")
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MomentumSaturation
    }

    fn min_bars(&self) -> usize {
        self.run.get()
    }

    fn detect<T: OHLCV>(&self, _bars: &[T], osc: &Oscillator) -> Option<Signal> {
        let tail = osc.trailing_k(self.run.get())?;
        if tail.iter().all(|&k| k < self.level.get()) {
            Some(Signal {
                id: SignalDetector::id(self),
                category: SignalCategory::MomentumSaturation,
                bias: Bias::Bearish,
                geometry: Geometry::None,
            })
        } else {
            None
        }
    }
}

const KD_LOW_PARAMS: &[ParamMeta] = &[
    ParamMeta::factor(
        "level",
        20.0,
        (5.0, 40.0, 5.0),
        "Oversold %K level all trailing sessions must stay under",
    ),
    ParamMeta::period(
        "run",
        3.0,
        (2.0, 5.0, 1.0),
        "Consecutive sessions required below the level",
    ),
];

impl ParameterizedDetector for KdLowSaturationDetector {
    fn param_meta() -> &'static [ParamMeta] {
        KD_LOW_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            level: get_factor(params, "level", 20.0)?,
            run: get_period(params, "run", 3)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "KD_LOW_SATURATION"
    }
}
