//! Formation detectors
//!
//! Every detector is an independent, stateless predicate over trailing
//! slices of the price series (and, for the momentum pair, the oscillator).
//! All matching predicates fire simultaneously; nothing is suppressed.
//!
//! # Signal Categories
//!
//! - **Momentum (2)**: KD high/low saturation
//! - **Structural zones (10)**: box breakout/consolidation, double bottom/top,
//!   head-and-shoulders bottom/top, triangle squeeze, cup-and-handle,
//!   rounding bottom, bull flag
//! - **Reversal candles (2)**: bullish engulfing, hammer

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod candle;
pub mod momentum;
pub mod structure;

// Re-export all detectors for convenience
pub use candle::*;
pub use helpers::*;
pub use momentum::*;
pub use structure::*;
