//! Projection and training kernel benchmarks on noisy divergence matrices

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::DMatrix;
use rsdm::kernel::{gram_matrix, GaussianKernel, Projection};
use rsdm::{project_to_covariance, project_to_symmetric_psd};

/// Symmetric divergence-like matrix with a zero diagonal and some asymmetry noise
fn noisy_divergences(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            let base = ((i as f64) - (j as f64)).abs().sqrt() * 0.3;
            let noise = ((i * 31 + j * 17) as f64).sin() * 0.05;
            (base + noise).max(0.0)
        }
    })
}

fn bench_projections(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let kernel = GaussianKernel::new(0.5);

    for n in [32usize, 64, 128, 256] {
        let divergences = noisy_divergences(n);
        let raw = divergences.map(|d| (-d * d / 0.5).exp());

        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("symmetric_psd", n), &raw, |b, raw| {
            b.iter(|| {
                let mut m = raw.clone();
                project_to_symmetric_psd(black_box(&mut m)).ok();
                m
            })
        });

        group.bench_with_input(BenchmarkId::new("covariance", n), &raw, |b, raw| {
            b.iter(|| {
                let mut m = raw.clone();
                project_to_covariance(black_box(&mut m)).ok();
                m
            })
        });

        group.bench_with_input(BenchmarkId::new("gram_matrix", n), &divergences, |b, divs| {
            b.iter(|| black_box(gram_matrix(&kernel, black_box(divs), Projection::Psd)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_projections);
criterion_main!(benches);
