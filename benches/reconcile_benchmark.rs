//! Performance benchmarks for pathscout
//!
//! **Benchmarks Included:**
//! - `initial_refresh`: full scan and hashing of 100, 1000 and 5000 files
//! - `incremental_update`: reconciling a single modified file in a populated index
//! - `glob_matching`: include/exclude matching of relative paths
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                          # Run all benchmarks
//! cargo bench -- initial_refresh       # Initial scan only
//! ```
//!
//! **Notes:**
//! - Workspaces are generated in a `TempDir`, ten files per directory
//! - Sample size is 10 (criterion minimum) for reasonable test duration

use std::fs;
use std::path::{Path, PathBuf};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathscout::discovery::{DigestPolicy, Discovery};
use pathscout::watcher::GlobPattern;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Create a workspace with `count` matching files and as many non-matching ones.
fn create_workspace(count: usize) -> TempDir {
    let tmpdir = TempDir::new().expect("failed to create temp dir");
    for i in 0..count {
        let dir = tmpdir.path().join(format!("dir_{}", i / 10));
        fs::create_dir_all(&dir).expect("failed to create dir");
        fs::write(dir.join(format!("file_{i}.rs")), format!("fn f{i}() {{}}\n"))
            .expect("failed to write file");
        fs::write(dir.join(format!("file_{i}.bin")), [0u8; 64]).expect("failed to write file");
    }
    tmpdir
}

fn discovery(root: &Path) -> Discovery<DigestPolicy> {
    Discovery::builder(
        DigestPolicy::default(),
        GlobPattern::include("**/*.rs").expect("valid glob"),
    )
    .roots([root.to_path_buf()])
    .build()
}

fn bench_initial_refresh(c: &mut Criterion) {
    let rt = Runtime::new().expect("failed to create runtime");
    let mut group = c.benchmark_group("initial_refresh");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    for count in &[100, 1000, 5000] {
        let workspace = create_workspace(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let d = discovery(workspace.path());
                let report = rt.block_on(d.initial_refresh()).expect("refresh failed");
                assert_eq!(report.added, count);
                black_box(report)
            });
        });
    }

    group.finish();
}

fn bench_incremental_update(c: &mut Criterion) {
    let rt = Runtime::new().expect("failed to create runtime");
    let workspace = create_workspace(1000);
    let d = discovery(workspace.path());
    rt.block_on(d.initial_refresh()).expect("refresh failed");

    let target: PathBuf = workspace.path().join("dir_50/file_500.rs");
    let mut group = c.benchmark_group("incremental_update");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    let mut n = 0u64;
    group.bench_function("single_file_modified", |b| {
        b.iter(|| {
            n += 1;
            fs::write(&target, format!("fn changed{n}() {{}}\n")).expect("failed to write");
            let report = rt
                .block_on(d.paths_changed([target.clone()]))
                .expect("reconcile failed");
            black_box(report)
        });
    });

    group.bench_function("directory_unchanged", |b| {
        let dir = workspace.path().join("dir_10");
        b.iter(|| {
            let report = rt
                .block_on(d.paths_changed([dir.clone()]))
                .expect("reconcile failed");
            black_box(report)
        });
    });

    group.finish();
}

fn bench_glob_matching(c: &mut Criterion) {
    let pattern = GlobPattern::new("**/*.rs", &["**/generated/**".to_string()])
        .expect("valid glob");
    let paths: Vec<PathBuf> = (0..1000)
        .map(|i| PathBuf::from(format!("src/module_{}/generated/file_{i}.rs", i % 7)))
        .chain((0..1000).map(|i| PathBuf::from(format!("src/module_{}/file_{i}.rs", i % 7))))
        .collect();

    c.bench_function("glob_matching_2000_paths", |b| {
        b.iter(|| {
            let matched = paths.iter().filter(|p| pattern.matches(p)).count();
            black_box(matched)
        });
    });
}

criterion_group!(
    benches,
    bench_initial_refresh,
    bench_incremental_update,
    bench_glob_matching
);
criterion_main!(benches);
