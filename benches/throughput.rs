use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use escrow_market::seed;
use escrow_market::{
    run, Config, Direction, MemoryStorage, SortKey, TransactionQuery, TransactionStatus,
};
use tokio::runtime::Runtime;

const TABLE_SIZE: u32 = 100_000;

struct NoopWriter;

impl io::Write for NoopWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Just return the length of input without actually writing
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn large_table() -> Vec<escrow_market::Transaction> {
    let now = Utc::now();
    let template = seed::transactions(now);
    (0..TABLE_SIZE)
        .map(|i| {
            let mut tx = template[(i % 2) as usize].clone();
            tx.id = i + 1;
            tx.buyer_name = format!("Buyer {}", i % 997);
            tx.status = TransactionStatus::ALL[(i % 7) as usize];
            tx.created_at = now - chrono::Duration::seconds(i64::from(i * 37 % 86_400));
            tx
        })
        .collect()
}

fn query_transactions(c: &mut Criterion) {
    let table = large_table();
    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(u64::from(TABLE_SIZE)));

    group.bench_function("newest_first_100K", |b| {
        let query = TransactionQuery::default();
        b.iter(|| query.apply(&table).len());
    });

    group.bench_function("search_and_sort_by_amount_100K", |b| {
        let query = TransactionQuery::default()
            .search("buyer 42")
            .sort_by(SortKey::Amount, Direction::Desc);
        b.iter(|| query.apply(&table).len());
    });

    group.finish();
}

fn walkthrough(c: &mut Criterion) {
    let mut group = c.benchmark_group("walkthrough");
    group.measurement_time(Duration::from_secs(10));

    let config = Config {
        capture_delay: Duration::ZERO,
        login_latency: Duration::ZERO,
        ..Config::default()
    };
    group.bench_function("in_memory_purchase", |b| {
        let rt = Runtime::new().unwrap();
        b.to_async(rt).iter(|| async {
            run(Arc::new(MemoryStorage::new()), &config, NoopWriter)
                .await
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, query_transactions, walkthrough);
criterion_main!(benches);
