use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use journal_core::{ContentHash, JournalEntry, JournalRecord};
use journal_sync::{reconcile, LocalSnapshot};

fn hash(i: u64) -> ContentHash {
    ContentHash::digest(&i.to_be_bytes())
}

/// Remote lists `m` entries. Local holds half of them, a quarter at a
/// different time, plus `m` records of its own inside the window.
fn scenario(m: u64) -> (Vec<JournalEntry>, LocalSnapshot) {
    let remote: Vec<JournalEntry> = (0..m)
        .map(|i| JournalEntry::new(i * 2, true, hash(i)))
        .collect();

    let shared = (0..m / 2).map(|i| {
        let ts = if i % 2 == 0 { i * 2 } else { i * 2 + 1 };
        JournalRecord::new(ts, hash(i))
    });
    let own = (0..m).map(|i| JournalRecord::new(i * 2 + 1, hash(m + i)));

    (remote, LocalSnapshot::from_records(shared.chain(own)))
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    for m in [10u64, 100, 1000] {
        let (remote, local) = scenario(m);
        let window = Some((0, m * 2));
        group.bench_with_input(BenchmarkId::from_parameter(m), &m, |b, _| {
            b.iter(|| reconcile(black_box(&remote), black_box(&local), window))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
