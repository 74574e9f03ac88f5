//! Insert/lookup sweeps across the associative family

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tessera::{HashMap, TreeMap, TreeSet};

fn bench_tree_map(c: &mut Criterion) {
    c.bench_function("tree_map_insert_1k_random", |b| {
        b.iter(|| {
            let mut map = TreeMap::new();
            for i in 0..1000u32 {
                let key = i.wrapping_mul(2654435761) % 4096;
                map.insert(black_box(key), i).unwrap();
            }
            black_box(map.len())
        })
    });

    c.bench_function("tree_map_hint_insert_1k_sorted", |b| {
        b.iter(|| {
            let mut map = TreeMap::new();
            for i in 0..1000u32 {
                let end = map.end();
                map.insert_hint(end, black_box(i), i).unwrap();
            }
            black_box(map.hint_hits())
        })
    });

    let map: TreeMap<u32, u32> = (0..1000).map(|i| (i, i)).collect();
    c.bench_function("tree_map_get_1k", |b| {
        b.iter(|| {
            let mut hits = 0;
            for i in 0..1000u32 {
                if map.get(black_box(&i)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_hash_map(c: &mut Criterion) {
    c.bench_function("hash_map_insert_1k", |b| {
        b.iter(|| {
            let mut map = HashMap::new();
            for i in 0..1000u32 {
                map.insert(black_box(i), i).unwrap();
            }
            black_box(map.len())
        })
    });

    let map: HashMap<u32, u32> = (0..1000).map(|i| (i, i)).collect();
    c.bench_function("hash_map_get_1k", |b| {
        b.iter(|| {
            let mut hits = 0;
            for i in 0..1000u32 {
                if map.get(black_box(&i)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_tree_set_bounds(c: &mut Criterion) {
    let set: TreeSet<u32> = (0..4096).step_by(2).collect();
    c.bench_function("tree_set_lower_bound_1k", |b| {
        b.iter(|| {
            let mut found = 0;
            for i in 0..1000u32 {
                if !set.lower_bound(black_box(&i)).is_end() {
                    found += 1;
                }
            }
            black_box(found)
        })
    });
}

criterion_group!(benches, bench_tree_map, bench_hash_map, bench_tree_set_bounds);
criterion_main!(benches);
