use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use pedis::{Registry, Store, Value};

fn bench_exec_set_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("exec");
    group.bench_function("set_get_1k", |b| {
        b.iter_batched(
            || (Store::new(), Registry::with_defaults()),
            |(store, registry)| {
                let set = registry.lookup(b"SET").unwrap();
                let get = registry.lookup(b"GET").unwrap();
                for i in 0..1000u32 {
                    let k = Value::bulk(format!("k{}", i).into_bytes());
                    let v = Value::bulk(format!("v{}", i).into_bytes());
                    let _ = set.invoke(&store, &[k.clone(), v]);
                    let _ = get.invoke(&store, &[k]);
                }
                black_box(&store);
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_exec_set_get);
criterion_main!(benches);
