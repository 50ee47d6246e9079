use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hivelru::{Lru, ShardedLru};
use std::time::Duration;

const NO_TTL: Duration = Duration::ZERO;

fn bench_lru_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_1kb_hot", |b| {
        let mut cache: Lru<Vec<u8>> = Lru::new(0);
        let data = vec![b'x'; 1024];

        let keys: Vec<String> = (0..100).map(|i| format!("key-{}", i)).collect();
        for key in &keys {
            cache.add(key, data.clone(), NO_TTL);
        }

        let mut counter = 0;
        b.iter(|| {
            black_box(cache.get(&keys[counter % 100]));
            counter += 1;
        });
    });

    group.finish();
}

fn bench_lru_add_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_add");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("add_1kb_with_eviction", |b| {
        // Budget fits ~16 entries, so steady-state inserts evict.
        let mut cache: Lru<Vec<u8>> = Lru::new(16 * 1024);
        let data = vec![b'x'; 1024];

        let keys: Vec<String> = (0..1000).map(|i| format!("key-{}", i)).collect();
        let mut counter = 0;
        b.iter(|| {
            black_box(cache.add(&keys[counter % 1000], data.clone(), NO_TTL));
            counter += 1;
        });
    });

    group.finish();
}

fn bench_sharded_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharded_get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_1kb_hot_8_shards", |b| {
        let cache: ShardedLru<Vec<u8>> = ShardedLru::new(0, 8);
        let data = vec![b'x'; 1024];

        let keys: Vec<String> = (0..100).map(|i| format!("key-{}", i)).collect();
        for key in &keys {
            cache.add(key, data.clone(), NO_TTL);
        }

        let mut counter = 0;
        b.iter(|| {
            black_box(cache.get(&keys[counter % 100]));
            counter += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_lru_get, bench_lru_add_churn, bench_sharded_get);
criterion_main!(benches);
