//! # Record Vault Benchmarks
//!
//! Hot paths on every request or upload:
//!
//! | Crate | Path | Called |
//! |-------|------|--------|
//! | rv-01 Path Sanitizer | `sanitize`, `resolve_and_validate` | every storage access |
//! | rv-02 Storage | `inspect` (signature, threats, entropy) | every upload |
//! | rv-05 Rate Limiter | `check_rate_limit` | every guarded request |
//! | rv-03 Backup | snapshot tree encode/decode | every backup and restore |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rv_01_path_sanitizer::{resolve_and_validate, sanitize};
use rv_02_storage::domain::content::inspect;
use rv_03_backup::TreeNode;
use rv_05_rate_limiter::{RateLimitConfig, RateLimiter};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// RV-01: Path Sanitizer
// ============================================================================

fn bench_path_sanitizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-01-path-sanitizer");

    for input in ["21BCE1234", "../../etc/passwd", "Main Stage (1) final.png"] {
        group.bench_with_input(BenchmarkId::new("sanitize", input), input, |b, input| {
            b.iter(|| black_box(sanitize(input)))
        });
    }

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("students/2021/21BCE1234")).unwrap();
    group.bench_function("resolve_existing", |b| {
        b.iter(|| black_box(resolve_and_validate(dir.path(), "students/2021/21BCE1234").is_ok()))
    });
    group.bench_function("resolve_missing_tail", |b| {
        b.iter(|| {
            black_box(resolve_and_validate(dir.path(), "students/2021/21BCE1234/photos/new.png").is_ok())
        })
    });
    group.bench_function("resolve_traversal", |b| {
        b.iter(|| black_box(resolve_and_validate(dir.path(), "../../etc/passwd").is_err()))
    });

    group.finish();
}

// ============================================================================
// RV-02: Upload Inspection
// ============================================================================

fn bench_upload_inspection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-02-inspection");

    for size in [16 * 1024, 1024 * 1024, 5 * 1024 * 1024] {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend((0..size).map(|i| (i * 31 % 251) as u8));
        group.throughput(Throughput::Bytes(png.len() as u64));
        group.bench_with_input(BenchmarkId::new("png", size), &png, |b, png| {
            b.iter(|| black_box(inspect("image/png", png, 7.5)))
        });
    }

    let csv: Vec<u8> = (0..20_000)
        .flat_map(|i| format!("21BCE{i:04},present\n").into_bytes())
        .collect();
    group.throughput(Throughput::Bytes(csv.len() as u64));
    group.bench_function("csv_text", |b| {
        b.iter(|| black_box(inspect("text/csv", &csv, 7.5)))
    });

    group.finish();
}

// ============================================================================
// RV-05: Rate Limiter
// ============================================================================

fn bench_rate_limiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-05-rate-limiter");
    let api = RateLimitConfig::api();

    let limiter = RateLimiter::default().with_cleanup_probability(0.0);
    group.bench_function("check_single_key", |b| {
        b.iter(|| black_box(limiter.check_rate_limit("203.0.113.7", "api", &api)))
    });

    let limiter = Arc::new(RateLimiter::default());
    let ips: Vec<String> = (0..10_000).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
    group.bench_function("check_10k_keys_with_sweep", |b| {
        let mut n = 0usize;
        b.iter(|| {
            n = (n + 1) % ips.len();
            black_box(limiter.check_rate_limit(&ips[n], "api", &api))
        })
    });

    group.finish();
}

// ============================================================================
// RV-03: Snapshot Tree Codec
// ============================================================================

fn sample_tree(students: usize) -> TreeNode {
    let mut batch = BTreeMap::new();
    for i in 0..students {
        let mut entity = BTreeMap::new();
        entity.insert(
            "metadata.json".to_string(),
            TreeNode::Json(serde_json::json!({"roll": i, "name": format!("student {i}")})),
        );
        entity.insert(
            "profile.png".to_string(),
            TreeNode::Binary {
                data: vec![0x42; 4096],
                original_path: format!("students/2021/{i}/profile.png"),
            },
        );
        batch.insert(format!("21BCE{i:04}"), TreeNode::Directory(entity));
    }
    let mut root = BTreeMap::new();
    root.insert("2021".to_string(), TreeNode::Directory(batch));
    TreeNode::Directory(root)
}

fn bench_snapshot_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-03-snapshot");

    for students in [100, 1_000] {
        let tree = sample_tree(students);
        let encoded = tree.to_json();
        group.throughput(Throughput::Elements(students as u64));
        group.bench_with_input(BenchmarkId::new("encode", students), &tree, |b, tree| {
            b.iter(|| black_box(tree.to_json()))
        });
        group.bench_with_input(BenchmarkId::new("decode", students), &encoded, |b, encoded| {
            b.iter(|| {
                let mut errors = Vec::new();
                black_box(TreeNode::directory_from_json(encoded, "students", &mut errors))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_path_sanitizer,
    bench_upload_inspection,
    bench_rate_limiter,
    bench_snapshot_codec,
);
criterion_main!(benches);
