//! `SignalComputer::compute` baselines over a range of cumulative frame
//! sizes.

use criterion::{criterion_group, criterion_main, Criterion};

use axiom_core::config::SignalConfig;
use axiom_core::model::{Frame, StepFeatures};
use axiom_engine::SignalComputer;

fn chained_frame(n: u64) -> Frame {
    (0..n).map(|i| (i, i + 1)).collect()
}

fn bench_signals(c: &mut Criterion) {
    for &size in &[10u64, 100, 1_000] {
        let prev = chained_frame(size);
        let cur = chained_frame(size + 1);
        c.bench_function(&format!("signal_compute_{size}_edges"), |b| {
            b.iter(|| {
                let mut config = SignalConfig::default();
                config.compute_spread = true;
                config.compute_locality = true;
                let mut computer = SignalComputer::new(config);
                computer.compute(&prev, None, &StepFeatures::default());
                computer.compute(&cur, Some(&prev), &StepFeatures::default());
            });
        });
    }
}

criterion_group!(benches, bench_signals);
criterion_main!(benches);
