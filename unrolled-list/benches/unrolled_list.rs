//! Benchmarks for UnrolledList against LinkedList and VecDeque.

use std::collections::{LinkedList, VecDeque};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use unrolled_list::UnrolledList;

const SIZES: [usize; 3] = [64, 1024, 16384];

// ============================================================================
// Growth
// ============================================================================

fn bench_push_back(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_back");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("unrolled/16", size), &size, |b, &size| {
            b.iter(|| {
                let mut list: UnrolledList<u64, 16> = UnrolledList::new();
                for i in 0..size as u64 {
                    list.push_back(black_box(i));
                }
                list
            });
        });

        group.bench_with_input(BenchmarkId::new("linked_list", size), &size, |b, &size| {
            b.iter(|| {
                let mut list = LinkedList::new();
                for i in 0..size as u64 {
                    list.push_back(black_box(i));
                }
                list
            });
        });

        group.bench_with_input(BenchmarkId::new("vec_deque", size), &size, |b, &size| {
            b.iter(|| {
                let mut list = VecDeque::new();
                for i in 0..size as u64 {
                    list.push_back(black_box(i));
                }
                list
            });
        });
    }

    group.finish();
}

fn bench_push_front(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_front");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("unrolled/16", size), &size, |b, &size| {
            b.iter(|| {
                let mut list: UnrolledList<u64, 16> = UnrolledList::new();
                for i in 0..size as u64 {
                    list.push_front(black_box(i));
                }
                list
            });
        });

        group.bench_with_input(BenchmarkId::new("linked_list", size), &size, |b, &size| {
            b.iter(|| {
                let mut list = LinkedList::new();
                for i in 0..size as u64 {
                    list.push_front(black_box(i));
                }
                list
            });
        });
    }

    group.finish();
}

// ============================================================================
// Traversal
// ============================================================================

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let unrolled: UnrolledList<u64, 16> = (0..size as u64).collect();
        group.bench_with_input(BenchmarkId::new("unrolled/16", size), &unrolled, |b, list| {
            b.iter(|| list.iter().sum::<u64>());
        });

        let linked: LinkedList<u64> = (0..size as u64).collect();
        group.bench_with_input(BenchmarkId::new("linked_list", size), &linked, |b, list| {
            b.iter(|| list.iter().sum::<u64>());
        });

        let deque: VecDeque<u64> = (0..size as u64).collect();
        group.bench_with_input(BenchmarkId::new("vec_deque", size), &deque, |b, list| {
            b.iter(|| list.iter().sum::<u64>());
        });
    }

    group.finish();
}

// ============================================================================
// Middle edits
// ============================================================================

fn bench_insert_middle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_insert_remove_middle");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("unrolled/16", size), &size, |b, &size| {
            let mut list: UnrolledList<u64, 16> = (0..size as u64).collect();
            let mut cursor = list.cursor_mut_at(size / 2);
            b.iter(|| {
                cursor.insert_before(black_box(7));
                cursor.move_prev();
                black_box(cursor.remove_current())
            });
        });

        group.bench_with_input(BenchmarkId::new("vec_deque", size), &size, |b, &size| {
            let mut list: VecDeque<u64> = (0..size as u64).collect();
            b.iter(|| {
                list.insert(size / 2, black_box(7));
                black_box(list.remove(size / 2))
            });
        });
    }

    group.finish();
}

fn bench_node_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_by_index/capacity");
    const SIZE: usize = 4096;

    macro_rules! capacity {
        ($n:literal) => {
            group.bench_function(BenchmarkId::from_parameter($n), |b| {
                let mut list: UnrolledList<u64, $n> = (0..SIZE as u64).collect();
                let mut i = 0usize;
                b.iter(|| {
                    i = (i + 2_654_435_761) % SIZE;
                    list.insert(i, black_box(1));
                    black_box(list.remove(i))
                });
            });
        };
    }

    capacity!(4);
    capacity!(10);
    capacity!(32);
    capacity!(128);

    group.finish();
}

criterion_group!(
    benches,
    bench_push_back,
    bench_push_front,
    bench_iterate,
    bench_insert_middle,
    bench_node_capacity,
);
criterion_main!(benches);
