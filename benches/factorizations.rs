use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polymat::{Matrix, QrMethod, Vector};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn general(n: usize) -> Matrix<f64> {
    Matrix::dense_from_fn(n, n, |i, j| ((i * 7 + j * 13) % 11) as f64 - 5.0 + if i == j { n as f64 } else { 0.0 })
}

fn spd(n: usize) -> Matrix<f64> {
    Matrix::symmetric_from_fn(n, |i, j| ((i + 1) * (j + 1)) as f64 / (n * n) as f64 + if i == j { 10.0 } else { 0.0 })
}

fn banded_sparse(n: usize) -> Matrix<f64> {
    Matrix::sparse_from_fn(n, n, |i, j| match i.abs_diff(j) {
        0 => 4.0,
        1 | 7 => -1.0,
        _ => 0.0,
    })
}

const SIZES: [usize; 3] = [16, 64, 128];

// ---------------------------------------------------------------------------
// Factorizations
// ---------------------------------------------------------------------------

fn bench_lu(c: &mut Criterion) {
    let mut group = c.benchmark_group("lu");
    for &n in &SIZES {
        let a = general(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &a, |b, a| b.iter(|| black_box(a).lu().unwrap()));
    }
    group.finish();
}

fn bench_cholesky(c: &mut Criterion) {
    let mut group = c.benchmark_group("cholesky");
    for &n in &SIZES {
        let a = spd(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &a, |b, a| {
            b.iter(|| black_box(a).cholesky().unwrap())
        });
    }
    group.finish();
}

fn bench_qr(c: &mut Criterion) {
    let mut group = c.benchmark_group("qr_thin");
    for &n in &SIZES {
        let a = general(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &a, |b, a| {
            b.iter(|| black_box(a).qr(QrMethod::Thin).unwrap())
        });
    }
    group.finish();
}

fn bench_svd(c: &mut Criterion) {
    let mut group = c.benchmark_group("svd");
    group.sample_size(20);
    for &n in &SIZES {
        let a = general(n);
        group.bench_with_input(BenchmarkId::new("values", n), &a, |b, a| {
            b.iter(|| black_box(a).svd(false).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("vectors", n), &a, |b, a| {
            b.iter(|| black_box(a).svd(true).unwrap())
        });
    }
    group.finish();
}

fn bench_evd(c: &mut Criterion) {
    let mut group = c.benchmark_group("evd");
    group.sample_size(20);
    for &n in &SIZES {
        let sym = spd(n);
        let gen = general(n);
        group.bench_with_input(BenchmarkId::new("symmetric", n), &sym, |b, a| {
            b.iter(|| black_box(a).evd().unwrap())
        });
        group.bench_with_input(BenchmarkId::new("general", n), &gen, |b, a| {
            b.iter(|| black_box(a).evd().unwrap())
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

fn bench_matvec(c: &mut Criterion) {
    let mut group = c.benchmark_group("matvec");
    for &n in &[128usize, 512] {
        let sparse = banded_sparse(n);
        let dense = sparse.convert_to(polymat::StorageKind::Dense).unwrap();
        let x = Vector::dense_from_fn(n, |i| (i as f64).cos());
        group.bench_with_input(BenchmarkId::new("sparse", n), &sparse, |b, a| {
            b.iter(|| a.mul_vector(black_box(&x)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("dense", n), &dense, |b, a| {
            b.iter(|| a.mul_vector(black_box(&x)).unwrap())
        });
    }
    group.finish();
}

fn bench_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");
    for &n in &SIZES {
        let a = general(n);
        let d = Matrix::diagonal_from_slice(n, n, &vec![2.0; n]);
        group.bench_with_input(BenchmarkId::new("dense", n), &a, |b, a| {
            b.iter(|| black_box(a).matmul(a).unwrap())
        });
        // Dense x Symmetric misses every fast path.
        let s = spd(n);
        group.bench_with_input(BenchmarkId::new("dense_symmetric", n), &a, |b, a| {
            b.iter(|| black_box(a).matmul(&s).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("dense_diagonal", n), &a, |b, a| {
            b.iter(|| black_box(a).matmul(&d).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_lu,
    bench_cholesky,
    bench_qr,
    bench_svd,
    bench_evd,
    bench_matvec,
    bench_matmul
);
criterion_main!(benches);
