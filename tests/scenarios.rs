//! Whole-engine scenario tests: the full default catalogue run against
//! series shaped like the market regimes the scanner is meant to read.

use formscan::prelude::*;
use proptest::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { o, h, l, c }
    }
}

impl OHLCV for TestBar {
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
        1000.0
    }
}

fn default_engine() -> ScanEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    EngineBuilder::new().with_all_defaults().build().unwrap()
}

fn make_flat(n: usize) -> Vec<TestBar> {
    (0..n).map(|_| TestBar::new(100.0, 100.0, 100.0, 100.0)).collect()
}

fn ids(outcome: &ScanOutcome) -> Vec<&'static str> {
    outcome.signals.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn dead_flat_year_reads_as_a_squeeze() {
    let engine = default_engine();
    let outcome = engine.scan(&make_flat(130)).unwrap();

    // Zero volatility is a degenerate squeeze; nothing else has a reason
    // to fire, and every zero-range denominator suppresses rather than errors.
    assert_eq!(ids(&outcome), vec!["TRIANGLE_SQUEEZE"]);
    // A structural formation fired, so the fallback levels stay quiet.
    assert!(outcome.levels.is_empty());
}

#[test]
fn consolidation_then_breakout_day() {
    // Months in a tight box around 100, then today closes well above it.
    let mut bars: Vec<TestBar> =
        (0..129).map(|_| TestBar::new(100.0, 101.0, 99.0, 100.0)).collect();
    bars.push(TestBar::new(101.0, 103.5, 100.5, 103.0));

    let engine = default_engine();
    let outcome = engine.scan(&bars).unwrap();
    let fired = ids(&outcome);

    assert!(fired.contains(&"BOX_BREAKOUT"));
    // Breakout and consolidation are mutually exclusive readings of the box.
    assert!(!fired.contains(&"BOX_CONSOLIDATION"));
    assert!(outcome.levels.is_empty());
}

#[test]
fn sustained_rally_saturates_the_oscillator() {
    let bars: Vec<TestBar> = (0..130)
        .map(|i| {
            let base = 100.0 + (i as f64) * 2.0;
            TestBar::new(base - 0.5, base + 1.5, base - 1.5, base + 1.0)
        })
        .collect();

    let engine = default_engine();
    let outcome = engine.scan(&bars).unwrap();
    let fired = ids(&outcome);

    assert!(fired.contains(&"KD_HIGH_SATURATION"));
    assert!(!fired.contains(&"KD_LOW_SATURATION"));
    assert!(!fired.contains(&"DOUBLE_TOP"));
}

#[test]
fn thin_history_never_reaches_detection() {
    let engine = default_engine();
    let err = engine.scan(&make_flat(100)).unwrap_err();
    assert!(matches!(
        err,
        ScanError::InsufficientHistory { need: 121, got: 100 }
    ));
}

#[test]
fn capitulation_low_prints_an_engulfing_candle() {
    // Grinding downtrend, then a wide bullish bar swallows yesterday's body.
    let mut bars: Vec<TestBar> = (0..128)
        .map(|i| {
            let base = 300.0 - (i as f64) * 1.0;
            TestBar::new(base + 1.0, base + 2.0, base - 1.0, base - 0.5)
        })
        .collect();
    bars.push(TestBar::new(172.0, 173.0, 165.0, 166.0));
    bars.push(TestBar::new(163.0, 180.0, 162.0, 179.0));

    let engine = default_engine();
    let outcome = engine.scan(&bars).unwrap();
    let engulfing = outcome
        .signals
        .iter()
        .find(|s| s.id == SignalId("BULLISH_ENGULFING"))
        .unwrap();
    assert_eq!(engulfing.bias, Bias::Bullish);
    assert!(matches!(engulfing.geometry, Geometry::Zone { span: 2, .. }));
}

#[test]
fn fallback_levels_appear_when_nothing_structural_fires() {
    // Wide swing range, tighter but still choppy recent range: no formation
    // fires (the chop keeps the envelope from squeezing), four levels appear.
    let mut bars: Vec<TestBar> =
        (0..110).map(|_| TestBar::new(100.0, 120.0, 80.0, 100.0)).collect();
    bars.extend((0..20).map(|i| {
        let c = if i % 2 == 0 { 98.0 } else { 104.0 };
        TestBar::new(101.0, 105.0, 97.0, c)
    }));

    let engine = default_engine();
    let outcome = engine.scan(&bars).unwrap();
    assert!(outcome
        .signals
        .iter()
        .all(|s| s.category != SignalCategory::StructuralZone));
    assert_eq!(outcome.levels.len(), 4);
    assert_eq!(outcome.levels[0].horizon, Horizon::Short);
    assert_eq!(outcome.levels[2].horizon, Horizon::Swing);
}

#[test]
fn outcome_serializes_for_downstream_consumers() {
    let engine = default_engine();
    let outcome = engine.scan(&make_flat(130)).unwrap();
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("TRIANGLE_SQUEEZE"));
    assert!(json.contains("Band"));
}

// ============================================================
// PROPERTIES
// ============================================================

/// Random-walk series: strictly positive prices, highs/lows bracketing
/// open and close.
fn random_walk(steps: Vec<(f64, f64)>) -> Vec<TestBar> {
    let mut price = 100.0;
    steps
        .into_iter()
        .map(|(drift, wick)| {
            let o = price;
            let c = (price * (1.0 + drift)).max(0.01);
            let h = o.max(c) * (1.0 + wick);
            let l = (o.min(c) * (1.0 - wick)).max(0.01);
            price = c;
            TestBar::new(o, h, l, c)
        })
        .collect()
}

proptest! {
    #[test]
    fn scan_never_panics_and_biases_match_catalogue(
        steps in proptest::collection::vec((-0.05f64..0.05, 0.0f64..0.03), 121..180)
    ) {
        let bars = random_walk(steps);
        let engine = default_engine();
        let outcome = engine.scan(&bars).unwrap();
        for signal in &outcome.signals {
            prop_assert_eq!(Some(signal.bias), signal.id.typical_bias());
        }
    }

    #[test]
    fn box_readings_are_mutually_exclusive(
        steps in proptest::collection::vec((-0.05f64..0.05, 0.0f64..0.03), 121..180)
    ) {
        let bars = random_walk(steps);
        let engine = default_engine();
        let outcome = engine.scan(&bars).unwrap();
        let fired = ids(&outcome);
        prop_assert!(
            !(fired.contains(&"BOX_BREAKOUT") && fired.contains(&"BOX_CONSOLIDATION"))
        );
    }

    #[test]
    fn oscillator_saturations_are_mutually_exclusive(
        steps in proptest::collection::vec((-0.05f64..0.05, 0.0f64..0.03), 121..180)
    ) {
        let bars = random_walk(steps);
        let engine = default_engine();
        let outcome = engine.scan(&bars).unwrap();
        let fired = ids(&outcome);
        prop_assert!(
            !(fired.contains(&"KD_HIGH_SATURATION") && fired.contains(&"KD_LOW_SATURATION"))
        );
    }
}
