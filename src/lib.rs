//! # formscan - chart formation scanner
//!
//! Trailing-window chart-pattern detection for daily OHLCV price series.
//! Given at least [`MIN_HISTORY`] bars, the engine evaluates a fixed
//! catalogue of independent formation predicates (box ranges, double
//! top/bottom, head-and-shoulders, cup-and-handle, rounding bottom,
//! volatility squeeze, candle reversals) plus a stochastic-oscillator
//! saturation check, and returns every match together with the geometry it
//! projects onto a candlestick chart.
//!
//! ## Quick Start
//!
//! ```rust
//! use formscan::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! // Create engine with the default catalogue
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .build()
//!     .unwrap();
//!
//! // Scan a series with more than MIN_HISTORY bars
//! let bars: Vec<Bar> = vec![];
//! assert!(engine.scan(&bars).is_err()); // insufficient history
//! ```

pub mod detectors;
pub mod levels;
pub mod oscillator;
pub mod params;
pub mod provider;

pub use oscillator::Oscillator;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::*,
        // Reference levels
        levels::{reference_levels, Horizon, ReferenceLevel, Side},
        // Oscillator
        oscillator::Oscillator,
        // Parameters
        params::{get_factor, get_period, ParamMeta, ParamType, ParameterizedDetector},
        // Provider seam
        provider::{
            analyze, analyze_with_averages, AnalysisResult, AnalyzeError, IdentityResolver,
            Lookback, MarketDataProvider, MovingAverage, ProviderError, Quote, SymbolResolver,
        },
        // Parallel
        scan_parallel,
        // Engine
        Bias,
        BuiltinDetector,
        // Core traits
        DynSignalDetector,
        EngineBuilder,
        EngineConfig,
        Factor,
        Geometry,
        LevelsMode,
        OHLCVExt,
        Period,
        PriceBar,
        PriceSeries,
        Result,
        ScanEngine,
        // Errors
        ScanError,
        ScanFailure,
        ScanOutcome,
        ScanReport,
        Signal,
        SignalCategory,
        SignalDetector,
        SignalId,
        MIN_HISTORY,
        OHLCV,
    };
}

use chrono::NaiveDate;
use log::debug;

/// Longest lookback any catalogue detector uses; a scan requires strictly
/// more bars than this.
pub const MIN_HISTORY: usize = 120;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur during scanning
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient history: need {need} bars, got {got}")]
    InsufficientHistory { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Bars out of date order at index {index}")]
    NonMonotonicDates { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Multiplicative factor (threshold, tolerance, confirmation multiplier).
/// Finite and non-negative; may exceed 1.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Factor(f64);

impl Factor {
    /// Create a new Factor, validating the value is finite and >= 0
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ScanError::InvalidValue("Factor cannot be NaN or infinite"));
        }
        if value < 0.0 {
            return Err(ScanError::InvalidValue("Factor cannot be negative"));
        }
        Ok(Self(value))
    }

    /// Create a Factor from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Factor {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Factor {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Factor::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ScanError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Blanket impl for references to dyn OHLCV
impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn date(&self) -> Option<NaiveDate> {
        (*self).date()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(ScanError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(ScanError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(ScanError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().max(self.close()) > self.high() || self.open().min(self.close()) < self.low()
        {
            return Err(ScanError::InvalidBar {
                index: 0,
                reason: "open/close outside low..high",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// PRICE SERIES - validated daily bars
// ============================================================

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One trading day. Price fields are rounded to 2 decimal places at
/// construction so consecutive-close comparisons are not poisoned by
/// floating-point noise.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self> {
        let bar = Self {
            date,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume,
        };
        for v in [bar.open, bar.high, bar.low, bar.close] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ScanError::InvalidBar {
                    index: 0,
                    reason: "price must be positive and finite",
                });
            }
        }
        OHLCVExt::validate(&bar)?;
        Ok(bar)
    }
}

impl OHLCV for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume as f64
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

/// Ascending-by-date, duplicate-free sequence of [`PriceBar`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceSeries(Vec<PriceBar>);

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        for i in 1..bars.len() {
            if bars[i].date <= bars[i - 1].date {
                return Err(ScanError::NonMonotonicDates { index: i });
            }
        }
        Ok(Self(bars))
    }

    #[inline]
    pub fn as_slice(&self) -> &[PriceBar] {
        &self.0
    }
}

impl std::ops::Deref for PriceSeries {
    type Target = [PriceBar];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================
// SIGNAL - result of detection (Copy, no allocations)
// ============================================================

/// Unique identifier for a signal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(pub &'static str);

impl SignalId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns the bias this formation is classified with.
    ///
    /// Note the saturation pair follows the catalogue's severity table: only
    /// the *low* (oversold) saturation is a warning; the high side reads as
    /// trend strength, not an automatic sell.
    pub fn typical_bias(&self) -> Option<Bias> {
        match self.0 {
            "BOX_BREAKOUT" | "DOUBLE_BOTTOM" | "HEAD_SHOULDERS_BOTTOM" | "CUP_HANDLE"
            | "ROUNDING_BOTTOM" | "BULL_FLAG" | "BULLISH_ENGULFING" | "HAMMER" => {
                Some(Bias::Bullish)
            }
            "DOUBLE_TOP" | "HEAD_SHOULDERS_TOP" | "KD_LOW_SATURATION" => Some(Bias::Bearish),
            "KD_HIGH_SATURATION" | "BOX_CONSOLIDATION" | "TRIANGLE_SQUEEZE" => Some(Bias::Neutral),
            _ => None,
        }
    }

    /// Returns true if this signal is surfaced as a danger/warning
    pub fn is_warning(&self) -> bool {
        matches!(self.typical_bias(), Some(Bias::Bearish))
    }
}

impl serde::Serialize for SignalId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

/// Directional bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Bias {
    Bullish,
    Neutral,
    Bearish,
}

impl Bias {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Bias::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Bias::Bearish)
    }
}

/// Broad signal family
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SignalCategory {
    /// Sustained extreme oscillator reading
    MomentumSaturation,
    /// Multi-week price formation with level/band/zone geometry
    StructuralZone,
    /// One- or two-day candle shape
    ReversalCandle,
}

/// Chart annotation a signal contributes, discriminated explicitly rather
/// than by key presence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Geometry {
    /// Textual-only signal, nothing to draw
    None,
    /// Horizontal line at one price
    Level { price: f64 },
    /// Filled horizontal band between two prices
    Band { high: f64, low: f64 },
    /// Rectangle over the trailing `span` bars
    Zone { high: f64, low: f64, span: usize },
}

/// One detected formation - Copy, no allocations
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Signal {
    pub id: SignalId,
    pub category: SignalCategory,
    pub bias: Bias,
    pub geometry: Geometry,
}

// ============================================================
// SIGNAL DETECTOR TRAITS
// ============================================================

/// Generic signal detector trait - for concrete types
pub trait SignalDetector: Send + Sync {
    fn id(&self) -> SignalId;
    fn category(&self) -> SignalCategory;

    /// Fewest bars this predicate can evaluate against
    fn min_bars(&self) -> usize;

    /// Evaluate the predicate against the series tail. `None` means no
    /// match, including when a denominator degenerates to zero.
    fn detect<T: OHLCV>(&self, bars: &[T], osc: &Oscillator) -> Option<Signal>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Object-safe signal detector trait - for custom detectors
pub trait DynSignalDetector: Send + Sync {
    fn id(&self) -> SignalId;
    fn category(&self) -> SignalCategory;
    fn min_bars(&self) -> usize;
    fn detect(&self, bars: &[&dyn OHLCV], osc: &Oscillator) -> Option<Signal>;
    fn validate_config(&self) -> Result<()>;
}

impl<D: SignalDetector> DynSignalDetector for D {
    fn id(&self) -> SignalId {
        SignalDetector::id(self)
    }

    fn category(&self) -> SignalCategory {
        SignalDetector::category(self)
    }

    fn min_bars(&self) -> usize {
        SignalDetector::min_bars(self)
    }

    fn detect(&self, bars: &[&dyn OHLCV], osc: &Oscillator) -> Option<Signal> {
        SignalDetector::detect(self, bars, osc)
    }

    fn validate_config(&self) -> Result<()> {
        SignalDetector::validate_config(self)
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], osc: &Oscillator) -> Option<Signal> {
                match self {
                    $(Self::$variant(d) => SignalDetector::detect(d, bars, osc)),*
                }
            }

            #[inline]
            pub fn id(&self) -> SignalId {
                match self {
                    $(Self::$variant(d) => SignalDetector::id(d)),*
                }
            }

            #[inline]
            pub fn category(&self) -> SignalCategory {
                match self {
                    $(Self::$variant(d) => SignalDetector::category(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => SignalDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => SignalDetector::validate_config(d)),*
                }
            }
        }
    };
}

// Apply macro - full catalogue, in evaluation order
define_builtin_detectors! {
    // Momentum (2)
    KdHighSaturation(KdHighSaturationDetector),
    KdLowSaturation(KdLowSaturationDetector),

    // Structural zones (10)
    BoxBreakout(BoxBreakoutDetector),
    BoxConsolidation(BoxConsolidationDetector),
    DoubleBottom(DoubleBottomDetector),
    DoubleTop(DoubleTopDetector),
    HeadShouldersBottom(HeadShouldersBottomDetector),
    HeadShouldersTop(HeadShouldersTopDetector),
    TriangleSqueeze(TriangleSqueezeDetector),
    CupHandle(CupHandleDetector),
    RoundingBottom(RoundingBottomDetector),
    BullFlag(BullFlagDetector),

    // Reversal candles (2)
    BullishEngulfing(BullishEngulfingDetector),
    Hammer(HammerDetector),
}

// ============================================================
// SCAN ENGINE
// ============================================================

/// When the support/resistance fallback levels are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LevelsMode {
    /// Only when no structural formation fired
    #[default]
    Auto,
    Always,
    Never,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub validate_data: bool,
    pub signal_filter: Option<Vec<SignalId>>,
    pub levels: LevelsMode,
    pub oscillator_period: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_data: false,
            signal_filter: None,
            levels: LevelsMode::default(),
            oscillator_period: oscillator::DEFAULT_PERIOD,
        }
    }
}

/// One scan's output: matched formations plus (possibly empty) fallback
/// support/resistance levels.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScanOutcome {
    pub signals: Vec<Signal>,
    pub levels: Vec<levels::ReferenceLevel>,
}

/// Main formation-scanning engine
pub struct ScanEngine {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn DynSignalDetector>>,
    config: EngineConfig,
}

impl ScanEngine {
    /// Evaluate the whole catalogue against the series tail.
    ///
    /// The length gate is a hard precondition: fewer than `MIN_HISTORY + 1`
    /// bars aborts the run with zero signals rather than detecting against
    /// partial windows.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<ScanOutcome> {
        if bars.len() <= MIN_HISTORY {
            return Err(ScanError::InsufficientHistory {
                need: MIN_HISTORY + 1,
                got: bars.len(),
            });
        }
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let osc = Oscillator::compute(bars, self.config.oscillator_period)?;
        let mut signals = Vec::new();

        // Fast path: builtin detectors (enum dispatch, no vtable)
        for detector in &self.builtin {
            if bars.len() >= detector.min_bars() {
                if let Some(s) = detector.detect(bars, &osc) {
                    if self.should_include(&s) {
                        signals.push(s);
                    }
                }
            }
        }

        // Slow path: custom detectors (vtable)
        if !self.custom.is_empty() {
            let bar_refs: Vec<&dyn OHLCV> = bars.iter().map(|b| b as &dyn OHLCV).collect();
            for detector in &self.custom {
                if bars.len() >= detector.min_bars() {
                    if let Some(s) = detector.detect(&bar_refs, &osc) {
                        if self.should_include(&s) {
                            signals.push(s);
                        }
                    }
                }
            }
        }

        let levels = match self.config.levels {
            LevelsMode::Always => levels::reference_levels(bars),
            LevelsMode::Never => Vec::new(),
            LevelsMode::Auto => {
                let structural_hit = signals
                    .iter()
                    .any(|s| s.category == SignalCategory::StructuralZone);
                if structural_hit {
                    Vec::new()
                } else {
                    levels::reference_levels(bars)
                }
            }
        };

        debug!(
            "scan over {} bars: {} signals, {} reference levels",
            bars.len(),
            signals.len(),
            levels.len()
        );

        Ok(ScanOutcome { signals, levels })
    }

    fn should_include(&self, s: &Signal) -> bool {
        if let Some(ref filter) = self.config.signal_filter {
            if !filter.contains(&s.id) {
                return false;
            }
        }
        true
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                ScanError::InvalidBar { reason, .. } => ScanError::InvalidBar { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating ScanEngine instances
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn DynSignalDetector>>,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            builtin: Vec::new(),
            custom: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Add the whole catalogue with default thresholds, in evaluation order
    pub fn with_all_defaults(self) -> Self {
        self.with_momentum_defaults()
            .with_structure_defaults()
            .with_candle_defaults()
    }

    /// Add only the oscillator-saturation detectors (2)
    pub fn with_momentum_defaults(mut self) -> Self {
        self.builtin
            .extend(builtin_defaults![KdHighSaturation, KdLowSaturation]);
        self
    }

    /// Add only the structural-zone detectors (10)
    pub fn with_structure_defaults(mut self) -> Self {
        self.builtin.extend(builtin_defaults![
            BoxBreakout,
            BoxConsolidation,
            DoubleBottom,
            DoubleTop,
            HeadShouldersBottom,
            HeadShouldersTop,
            TriangleSqueeze,
            CupHandle,
            RoundingBottom,
            BullFlag,
        ]);
        self
    }

    /// Add only the candle-reversal detectors (2)
    pub fn with_candle_defaults(mut self) -> Self {
        self.builtin
            .extend(builtin_defaults![BullishEngulfing, Hammer]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Add a custom detector (slow path)
    pub fn add_custom<D: DynSignalDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    /// Enable/disable per-bar data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Filter to specific signals only
    pub fn only_signals(mut self, ids: impl IntoIterator<Item = SignalId>) -> Self {
        self.config.signal_filter = Some(ids.into_iter().collect());
        self
    }

    /// Choose when fallback support/resistance levels are emitted
    pub fn reference_levels(mut self, mode: LevelsMode) -> Self {
        self.config.levels = mode;
        self
    }

    /// Override the oscillator RSV lookback
    pub fn oscillator_period(mut self, period: usize) -> Self {
        self.config.oscillator_period = period;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<ScanEngine> {
        if self.config.oscillator_period == 0 {
            return Err(ScanError::InvalidConfig(
                "oscillator period must be > 0".into(),
            ));
        }
        let engine = ScanEngine {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanReport {
    pub symbol: String,
    pub outcome: ScanOutcome,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: ScanError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &ScanEngine,
    instruments: I,
) -> (Vec<ScanReport>, Vec<ScanFailure>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|outcome| ScanReport {
                    symbol: symbol.to_string(),
                    outcome,
                })
                .map_err(|error| ScanFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        v: f64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self {
                o,
                h,
                l,
                c,
                v: 1000.0,
            }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
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
            self.v
        }
    }

    fn make_flat_bars(n: usize) -> Vec<Bar> {
        (0..n).map(|_| Bar::new(100.0, 100.0, 100.0, 100.0)).collect()
    }

    fn make_sideways_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + (i % 5) as f64;
                Bar::new(c - 0.5, c + 1.0, c - 1.5, c)
            })
            .collect()
    }

    fn date(d: u64) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(d)
    }

    #[test]
    fn test_factor_validation() {
        assert!(Factor::new(0.0).is_ok());
        assert!(Factor::new(0.25).is_ok());
        assert!(Factor::new(1.02).is_ok());
        assert!(Factor::new(80.0).is_ok());
        assert!(Factor::new(-0.1).is_err());
        assert!(Factor::new(f64::NAN).is_err());
        assert!(Factor::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(120).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_shadow(), 5.0);
        assert_eq!(bar.lower_shadow(), 10.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn test_price_bar_rounds_to_cents() {
        let bar = PriceBar::new(date(0), 100.004, 101.006, 99.001, 100.996, 500).unwrap();
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 101.01);
        assert_eq!(bar.low, 99.0);
        assert_eq!(bar.close, 101.0);
    }

    #[test]
    fn test_price_bar_rejects_inconsistent_prices() {
        assert!(PriceBar::new(date(0), 100.0, 99.0, 101.0, 100.0, 0).is_err()); // high < low
        assert!(PriceBar::new(date(0), 100.0, 101.0, 99.0, 102.0, 0).is_err()); // close > high
        assert!(PriceBar::new(date(0), -1.0, 101.0, 99.0, 100.0, 0).is_err()); // negative price
    }

    #[test]
    fn test_price_series_requires_ascending_dates() {
        let a = PriceBar::new(date(0), 100.0, 101.0, 99.0, 100.0, 1).unwrap();
        let b = PriceBar::new(date(1), 100.0, 101.0, 99.0, 100.0, 1).unwrap();
        assert!(PriceSeries::new(vec![a, b]).is_ok());
        assert!(matches!(
            PriceSeries::new(vec![b, a]),
            Err(ScanError::NonMonotonicDates { index: 1 })
        ));
        assert!(PriceSeries::new(vec![a, a]).is_err()); // duplicate date
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_catalogue_counts() {
        assert_eq!(
            EngineBuilder::new()
                .with_momentum_defaults()
                .build()
                .unwrap()
                .builtin
                .len(),
            2
        );
        assert_eq!(
            EngineBuilder::new()
                .with_structure_defaults()
                .build()
                .unwrap()
                .builtin
                .len(),
            10
        );
        assert_eq!(
            EngineBuilder::new()
                .with_candle_defaults()
                .build()
                .unwrap()
                .builtin
                .len(),
            2
        );
        assert_eq!(
            EngineBuilder::new()
                .with_all_defaults()
                .build()
                .unwrap()
                .builtin
                .len(),
            14
        );
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let bad = DoubleBottomDetector {
            prior_from: Period::new_const(20),
            prior_to: Period::new_const(60),
            ..Default::default()
        };
        let result = EngineBuilder::new()
            .add(BuiltinDetector::DoubleBottom(bad))
            .build();
        assert!(result.is_err());
        assert!(EngineBuilder::new().oscillator_period(0).build().is_err());
    }

    #[test]
    fn test_insufficient_history_is_terminal() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = make_flat_bars(MIN_HISTORY);
        let err = engine.scan(&bars).unwrap_err();
        assert!(matches!(
            err,
            ScanError::InsufficientHistory { need: 121, got: 120 }
        ));
    }

    #[test]
    fn test_validate_data_rejects_bad_bar() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .validate_data(true)
            .build()
            .unwrap();
        let mut bars = make_sideways_bars(130);
        bars[42] = Bar::new(100.0, 90.0, 110.0, 100.0); // high < low
        let err = engine.scan(&bars).unwrap_err();
        assert!(matches!(err, ScanError::InvalidBar { index: 42, .. }));
    }

    #[test]
    fn test_signal_filter() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .only_signals([SignalId("DOUBLE_BOTTOM")])
            .build()
            .unwrap();
        let bars = make_flat_bars(130);
        // Flat series squeezes, but the filter drops it.
        let outcome = engine.scan(&bars).unwrap();
        assert!(outcome.signals.is_empty());
    }

    #[test]
    fn test_levels_modes() {
        let bars = make_flat_bars(130);

        let engine = EngineBuilder::new()
            .with_all_defaults()
            .reference_levels(LevelsMode::Never)
            .build()
            .unwrap();
        assert!(engine.scan(&bars).unwrap().levels.is_empty());

        let engine = EngineBuilder::new()
            .with_all_defaults()
            .reference_levels(LevelsMode::Always)
            .build()
            .unwrap();
        assert!(!engine.scan(&bars).unwrap().levels.is_empty());

        // Auto: flat series fires the squeeze (structural), so no fallback.
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let outcome = engine.scan(&bars).unwrap();
        assert!(outcome
            .signals
            .iter()
            .any(|s| s.id == SignalId("TRIANGLE_SQUEEZE")));
        assert!(outcome.levels.is_empty());
    }

    #[test]
    fn test_levels_auto_emits_without_structural_hit() {
        // Momentum-only engine never produces a structural signal.
        let engine = EngineBuilder::new().with_momentum_defaults().build().unwrap();
        let bars = make_sideways_bars(130);
        let outcome = engine.scan(&bars).unwrap();
        assert!(!outcome.levels.is_empty());
    }

    #[test]
    fn test_custom_detector_runs_after_builtins() {
        #[derive(Debug)]
        struct AlwaysFire;

        impl DynSignalDetector for AlwaysFire {
            fn id(&self) -> SignalId {
                SignalId("CUSTOM_ALWAYS")
            }

            fn category(&self) -> SignalCategory {
                SignalCategory::ReversalCandle
            }

            fn min_bars(&self) -> usize {
                1
            }

            fn detect(&self, _bars: &[&dyn OHLCV], _osc: &Oscillator) -> Option<Signal> {
                Some(Signal {
                    id: SignalId("CUSTOM_ALWAYS"),
                    category: SignalCategory::ReversalCandle,
                    bias: Bias::Neutral,
                    geometry: Geometry::None,
                })
            }

            fn validate_config(&self) -> Result<()> {
                Ok(())
            }
        }

        let engine = EngineBuilder::new()
            .with_all_defaults()
            .add_custom(AlwaysFire)
            .build()
            .unwrap();
        let bars = make_flat_bars(130);
        let outcome = engine.scan(&bars).unwrap();
        assert_eq!(
            outcome.signals.last().unwrap().id,
            SignalId("CUSTOM_ALWAYS")
        );
    }

    #[test]
    fn test_scan_parallel() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

        let flat = make_flat_bars(130);
        let short = make_flat_bars(50);

        let instruments: Vec<(&str, &[Bar])> = vec![("2330.TW", &flat), ("2317.TW", &short)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "2317.TW");
    }

    #[test]
    fn test_typical_bias_classification() {
        assert_eq!(
            SignalId("DOUBLE_TOP").typical_bias(),
            Some(Bias::Bearish)
        );
        assert!(SignalId("DOUBLE_TOP").is_warning());
        assert!(SignalId("KD_LOW_SATURATION").is_warning());
        assert!(!SignalId("KD_HIGH_SATURATION").is_warning());
        assert_eq!(
            SignalId("CUP_HANDLE").typical_bias(),
            Some(Bias::Bullish)
        );
        assert_eq!(SignalId("UNKNOWN").typical_bias(), None);
    }

    #[test]
    fn test_signal_serializes() {
        let signal = Signal {
            id: SignalId("BOX_BREAKOUT"),
            category: SignalCategory::StructuralZone,
            bias: Bias::Bullish,
            geometry: Geometry::Zone {
                high: 110.0,
                low: 100.0,
                span: 60,
            },
        };
        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("BOX_BREAKOUT"));
        assert!(json.contains("Zone"));
    }
}
