//! Data-provider seam and the analysis entry point.
//!
//! The scanner itself never fetches anything: a [`MarketDataProvider`] hands
//! it a validated [`PriceSeries`], a [`SymbolResolver`] best-effort maps a
//! ticker to a display name, and [`analyze`] glues fetch, scan and packaging
//! into one explicit call. Provider failures of any flavor (unknown symbol,
//! thin history, transient transport error) collapse into a single
//! unusable-input outcome; no partial detection is attempted.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::{levels::ReferenceLevel, PriceSeries, ScanEngine, ScanError, Signal, MIN_HISTORY};

/// Trailing span of daily bars requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    pub days: u32,
}

impl Lookback {
    pub const ONE_YEAR: Lookback = Lookback { days: 365 };
}

impl Default for Lookback {
    fn default() -> Self {
        Self::ONE_YEAR
    }
}

/// Errors a market-data provider can surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("insufficient history for {symbol}: {got} bars")]
    InsufficientHistory { symbol: String, got: usize },

    #[error("transient provider failure: {0}")]
    Transient(String),
}

/// Source of daily OHLCV history for a symbol.
pub trait MarketDataProvider {
    fn daily_history(
        &self,
        symbol: &str,
        lookback: Lookback,
    ) -> std::result::Result<PriceSeries, ProviderError>;
}

/// Best-effort ticker-to-name lookup. A miss is not an error.
pub trait SymbolResolver {
    fn display_name(&self, symbol: &str) -> Option<String>;
}

/// Resolver that never knows a name; callers fall back to the raw symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl SymbolResolver for IdentityResolver {
    fn display_name(&self, _symbol: &str) -> Option<String> {
        None
    }
}

/// Terminal outcomes of an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Provider failed or returned too little history; no detection ran.
    #[error("no usable data for {symbol}")]
    UnusableInput {
        symbol: String,
        #[source]
        source: Option<ProviderError>,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Latest-session quote block for the header panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub last_date: NaiveDate,
    pub last_close: f64,
    pub change: f64,
    /// `None` when the previous close is zero.
    pub pct_change: Option<f64>,
    pub last_volume: u64,
}

impl Quote {
    fn from_series(series: &PriceSeries) -> Option<Self> {
        let last = series.as_slice().last()?;
        let prev = series.as_slice().get(series.len().checked_sub(2)?)?;
        let change = last.close - prev.close;
        let pct_change = if prev.close.abs() <= f64::EPSILON {
            None
        } else {
            Some(change / prev.close * 100.0)
        };
        Some(Self {
            last_date: last.date,
            last_close: last.close,
            change,
            pct_change,
            last_volume: last.volume,
        })
    }
}

/// Simple moving average overlay for the renderer. Entries are `None` until
/// the window fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

impl MovingAverage {
    fn of_closes(series: &PriceSeries, period: usize) -> Self {
        let closes: Vec<f64> = series.as_slice().iter().map(|b| b.close).collect();
        let mut values = vec![None; closes.len()];
        if period > 0 {
            let mut sum = 0.0;
            for i in 0..closes.len() {
                sum += closes[i];
                if i + 1 > period {
                    sum -= closes[i - period];
                }
                if i + 1 >= period {
                    values[i] = Some(sum / period as f64);
                }
            }
        }
        Self { period, values }
    }
}

/// Trailing bars the renderer is expected to draw.
pub const CHART_WINDOW: usize = 120;

/// Moving-average overlays drawn by default.
pub const DEFAULT_MOVING_AVERAGES: &[usize] = &[20, 60];

/// Everything the renderer needs for one analysis run.
#[derive(Debug)]
pub struct AnalysisResult {
    pub symbol: String,
    pub display_name: String,
    pub quote: Option<Quote>,
    pub signals: Vec<Signal>,
    pub levels: Vec<ReferenceLevel>,
    pub series: PriceSeries,
    /// Trailing bar count the chart should span.
    pub window: usize,
    pub moving_averages: Vec<MovingAverage>,
}

/// Fetch, scan and package one symbol with the default chart overlays.
pub fn analyze<P, R>(
    provider: &P,
    resolver: &R,
    engine: &ScanEngine,
    symbol: &str,
) -> std::result::Result<AnalysisResult, AnalyzeError>
where
    P: MarketDataProvider,
    R: SymbolResolver,
{
    analyze_with_averages(provider, resolver, engine, symbol, DEFAULT_MOVING_AVERAGES)
}

/// [`analyze`] with an explicit moving-average subset (choose from 5/20/60).
pub fn analyze_with_averages<P, R>(
    provider: &P,
    resolver: &R,
    engine: &ScanEngine,
    symbol: &str,
    ma_periods: &[usize],
) -> std::result::Result<AnalysisResult, AnalyzeError>
where
    P: MarketDataProvider,
    R: SymbolResolver,
{
    let series = provider
        .daily_history(symbol, Lookback::ONE_YEAR)
        .map_err(|e| AnalyzeError::UnusableInput {
            symbol: symbol.to_string(),
            source: Some(e),
        })?;

    if series.len() <= MIN_HISTORY {
        return Err(AnalyzeError::UnusableInput {
            symbol: symbol.to_string(),
            source: None,
        });
    }

    let outcome = engine.scan(series.as_slice())?;
    debug!(
        "analyzed {symbol}: {} signals, {} reference levels",
        outcome.signals.len(),
        outcome.levels.len()
    );

    let display_name = resolver
        .display_name(symbol)
        .unwrap_or_else(|| symbol.to_string());
    let quote = Quote::from_series(&series);
    let moving_averages = ma_periods
        .iter()
        .map(|&p| MovingAverage::of_closes(&series, p))
        .collect();

    Ok(AnalysisResult {
        symbol: symbol.to_string(),
        display_name,
        quote,
        signals: outcome.signals,
        levels: outcome.levels,
        series,
        window: CHART_WINDOW,
        moving_averages,
    })
}
