use criterion::{criterion_group, criterion_main};

mod modbus;

criterion_group!(
    benches,
    modbus::queue::bench_enqueue_drain,
    modbus::queue::bench_fill_and_drain,
    modbus::queue::bench_response_encode
);
criterion_main!(benches);
