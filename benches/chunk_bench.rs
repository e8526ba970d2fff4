use archon_ecs::chunk::Chunk;
use archon_ecs::schema::ComponentId;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_push_row_until_full(c: &mut Criterion) {
    c.bench_function("chunk_push_row_until_full", |b| {
        b.iter(|| {
            let mut chunk = Chunk::new(&[(ComponentId(0), 16)], &[]);
            while !chunk.is_full() {
                let row = chunk.push_row(black_box(0)).unwrap();
                black_box(row);
            }
        })
    });
}

fn bench_swap_remove_middle(c: &mut Criterion) {
    c.bench_function("chunk_swap_remove_middle", |b| {
        b.iter(|| {
            let mut chunk = Chunk::new(&[(ComponentId(0), 16)], &[]);
            for slot in 0..256u32 {
                chunk.push_row(slot).unwrap();
            }
            black_box(chunk.swap_remove(black_box(10)));
        })
    });
}

fn bench_component_column_scan(c: &mut Criterion) {
    let mut chunk = Chunk::new(&[(ComponentId(0), 8)], &[]);
    for slot in 0..256u32 {
        chunk.push_row(slot).unwrap();
    }

    c.bench_function("chunk_component_column_scan", |b| {
        b.iter(|| {
            let column = chunk.component_column(ComponentId(0));
            black_box(column.len());
        })
    });
}

criterion_group!(
    benches,
    bench_push_row_until_full,
    bench_swap_remove_middle,
    bench_component_column_scan
);
criterion_main!(benches);
