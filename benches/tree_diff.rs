//! Benchmarks for manifest construction and tree diffing
//!
//! Performance-critical paths:
//! - `build_manifest`: concurrent walk and BLAKE3 hashing of an install tree
//! - `diff`: comparing two manifests of the same shape

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::path::Path;
use updraft::tree::node::file_node;
use updraft::tree::{build_manifest, diff, Children, ExclusionRules, HashNode, Manifest};

/// Synthetic tree: `dirs` directories of `files_per_dir` entries each.
fn synthetic_manifest(dirs: usize, files_per_dir: usize, salt: u8) -> Manifest {
    let mut entries = Children::new();
    for d in 0..dirs {
        let mut children = Children::new();
        for f in 0..files_per_dir {
            // Every tenth file differs between salts
            let byte = if f % 10 == 0 { salt } else { 0 };
            children.insert(format!("file_{f}.js"), file_node([byte; 32]));
        }
        entries.insert(format!("dir_{d}"), HashNode::Directory(children));
    }
    Manifest::new(entries)
}

fn write_fixture(root: &Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("dir_{d}"));
        fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            fs::write(dir.join(format!("file_{f}.js")), format!("// {d}/{f}\n").repeat(64)).unwrap();
        }
    }
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_diff/diff");

    for (dirs, files) in [(10usize, 10usize), (50, 50), (100, 200)] {
        let master = synthetic_manifest(dirs, files, 1);
        let local = synthetic_manifest(dirs, files, 2);
        group.throughput(Throughput::Elements((dirs * files) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", dirs * files)),
            &(master, local),
            |b, (master, local)| b.iter(|| diff(black_box(master), black_box(local))),
        );
    }

    group.finish();
}

fn bench_build_manifest(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_diff/build_manifest");
    group.sample_size(20);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for (dirs, files) in [(5usize, 20usize), (20, 50)] {
        let temp_dir = tempfile::tempdir().unwrap();
        write_fixture(temp_dir.path(), dirs, files);
        let rules = ExclusionRules::default();

        group.throughput(Throughput::Elements((dirs * files) as u64));
        group.bench_function(format!("{}_files", dirs * files), |b| {
            b.iter(|| runtime.block_on(build_manifest(black_box(temp_dir.path()), &rules)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_build_manifest);
criterion_main!(benches);
