// benches/layout_bench.rs
// ============================================================================
// Layout Benchmark
// ============================================================================

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use rom_maker::{bias_layout, hex, weight_layout, Tensor};

fn generate_weights(rows: usize, cols: usize) -> Tensor {
    let mut rng = rand::thread_rng();
    let data = (0..rows * cols).map(|_| rng.gen_range(-128..128)).collect();
    Tensor::new(vec![rows, cols], data).expect("valid shape")
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for width in [8u32, 32].iter() {
        group.bench_with_input(BenchmarkId::new("width", width), width, |b, &w| {
            b.iter(|| {
                for v in -512i64..512 {
                    black_box(hex::encode(v, w).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    // Capas por defecto: 784 -> 256 -> 128 -> 10
    for (rows, cols) in [(256usize, 784usize), (128, 256), (10, 128)].iter() {
        let weights = generate_weights(*rows, *cols);
        group.bench_with_input(
            BenchmarkId::new("weights", format!("{}x{}", rows, cols)),
            &weights,
            |b, w| b.iter(|| black_box(weight_layout(w, 4).unwrap())),
        );

        let bias: Vec<i64> = (0..*rows as i64).collect();
        group.bench_with_input(
            BenchmarkId::new("bias", rows),
            &bias,
            |b, bias| b.iter(|| black_box(bias_layout(bias, bias.len(), 4).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_layout);
criterion_main!(benches);
