//! Benchmarks for chart formation scanning.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use formscan::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
  o: f64,
  h: f64,
  l: f64,
  c: f64,
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

/// Generate realistic random bars
fn generate_bars(n: usize) -> Vec<TestBar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(TestBar { o, h, l, c });
    price = c;
  }

  bars
}

fn bench_single_detector(c: &mut Criterion) {
  let bars = generate_bars(250);

  let engine = EngineBuilder::new()
    .add(BuiltinDetector::BoxBreakout(BoxBreakoutDetector::with_defaults()))
    .build()
    .unwrap();

  c.bench_function("scan_box_breakout_250_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.scan(black_box(&bars)));
    })
  });
}

fn bench_full_catalogue(c: &mut Criterion) {
  let bars = generate_bars(250);

  let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

  c.bench_function("scan_full_catalogue_250_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.scan(black_box(&bars)));
    })
  });
}

fn bench_oscillator(c: &mut Criterion) {
  let bars = generate_bars(250);

  c.bench_function("oscillator_250_bars", |b| {
    b.iter(|| {
      let _ = black_box(Oscillator::compute(black_box(&bars), 9));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

  let mut group = c.benchmark_group("scaling");

  for size in [130, 250, 1000, 5000].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("scan", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(engine.scan(black_box(&bars)));
      })
    });
  }

  group.finish();
}

fn bench_parallel_scan(c: &mut Criterion) {
  let bars1 = generate_bars(250);
  let bars2 = generate_bars(250);
  let bars3 = generate_bars(250);
  let bars4 = generate_bars(250);

  let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

  let instruments: Vec<(&str, &[TestBar])> =
    vec![("SYM1", &bars1), ("SYM2", &bars2), ("SYM3", &bars3), ("SYM4", &bars4)];

  c.bench_function("parallel_scan_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(scan_parallel(black_box(&engine), black_box(instruments.clone())));
    })
  });
}

criterion_group!(
  benches,
  bench_single_detector,
  bench_full_catalogue,
  bench_oscillator,
  bench_scaling,
  bench_parallel_scan
);
criterion_main!(benches);
