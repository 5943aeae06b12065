//! Benchmarks over the WAL write and recovery path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use monodb_wal::{HandlerTable, RecordType, WalConfig, WalContext, WalLocation};
use tempfile::TempDir;

fn open_wal(segment_size: u64) -> (TempDir, WalContext) {
    let dir = TempDir::new().unwrap();
    let config = WalConfig::new(dir.path()).with_segment_size(segment_size);
    let ctx = WalContext::init(config).unwrap();
    (dir, ctx)
}

fn write_record(ctx: &mut WalContext, payload: &[u8]) -> WalLocation {
    let mut slot = ctx
        .begin_record(RecordType::Insert, 1, payload.len() as u16)
        .unwrap();
    slot.payload_mut().copy_from_slice(payload);
    slot.end_record().unwrap()
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_append");

    for size in [16usize, 256, 4096] {
        let (_dir, mut ctx) = open_wal(64 * 1024 * 1024);
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("payload_bytes", size), &payload, |b, payload| {
            b.iter(|| black_box(write_record(&mut ctx, payload)));
        });
    }

    group.finish();
}

fn bench_append_and_checkpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_checkpoint");
    let (_dir, mut ctx) = open_wal(64 * 1024 * 1024);
    let payload = vec![b'x'; 64];

    group.bench_function("write_then_checkpoint", |b| {
        b.iter(|| {
            write_record(&mut ctx, &payload);
            black_box(ctx.checkpoint().unwrap());
        });
    });

    group.finish();
}

fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_recovery");

    for record_count in [100u32, 1_000, 10_000] {
        let dir = TempDir::new().unwrap();
        {
            let config = WalConfig::new(dir.path()).with_segment_size(64 * 1024 * 1024);
            let mut ctx = WalContext::init(config).unwrap();
            let payload = vec![b'x'; 64];
            for _ in 0..record_count {
                write_record(&mut ctx, &payload);
            }
            let commit = ctx.begin_record(RecordType::XactCommit, 1, 0).unwrap();
            commit.end_record().unwrap();
            ctx.shutdown();
        }

        group.throughput(Throughput::Elements(record_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(record_count),
            &record_count,
            |b, _| {
                b.iter(|| {
                    let config = WalConfig::new(dir.path()).with_segment_size(64 * 1024 * 1024);
                    let mut ctx = WalContext::init(config).unwrap();
                    let handlers: HandlerTable<()> = HandlerTable::new();
                    black_box(ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_append_and_checkpoint, bench_recovery);
criterion_main!(benches);
