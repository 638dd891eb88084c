use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    drain_bench::register_benchmarks,
    replay_bench::register_benchmarks
);
criterion_main!(benches);
