//! `MonteCarloHead::per_step` baselines across sample-count settings.

use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::Map;

use axiom_core::config::MonteCarloConfig;
use axiom_core::traits::{Head, StepFrame};
use axiom_heads::MonteCarloHead;

fn chained_frame(n: u64) -> std::collections::BTreeSet<(u64, u64)> {
    (0..n).map(|i| (i, i + 1)).collect()
}

fn bench_monte_carlo(c: &mut Criterion) {
    for &samples in &[8usize, 32, 128] {
        let prev = chained_frame(50);
        let cur = chained_frame(51);
        let mut node_weights = HashMap::new();
        for &(u, v) in cur.iter() {
            node_weights.insert(u, 0.6);
            node_weights.insert(v, 0.6);
        }
        let frame = StepFrame {
            t: 0,
            step_id: 0,
            obs_edges: cur.clone(),
            cumulative_edges: cur,
            prev_cumulative: Some(prev),
            node_weights,
            step_features: Default::default(),
        };
        let config = MonteCarloConfig {
            num_samples: samples,
            edge_dropout: 0.1,
            weight_jitter: 0.1,
            seed: Some(7),
        };

        c.bench_function(&format!("monte_carlo_per_step_{samples}_samples"), |b| {
            let mut head = MonteCarloHead::new(config.clone());
            b.iter(|| {
                head.per_step(&frame, &Map::new());
            });
        });
    }
}

criterion_group!(benches, bench_monte_carlo);
criterion_main!(benches);
