//! Cost of one committed schedule mutation at realistic table sizes.
//!
//! Run with: cargo bench -p cadence-store

use cadence_core::ScheduledSession;
use cadence_store::{MutationContext, ScheduleStore};
use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use uuid::Uuid;

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Days::new(offset)
}

fn seeded_store(dir: &std::path::Path, n: u64) -> ScheduleStore {
    let store = ScheduleStore::open(&dir.join("scheduled_sessions.json"), 5000).unwrap();
    let owner = Uuid::new_v4();
    let plan: Vec<ScheduledSession> = (0..n)
        .map(|i| ScheduledSession::planned(Uuid::new_v4(), owner, day(i % 60), 7.0))
        .collect();
    store.replace_planned(plan, MutationContext::Normal).unwrap();
    store
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_add");
    for n in [100u64, 1000, 4000] {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path(), n);
        let owner = Uuid::new_v4();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let s = ScheduledSession::planned(Uuid::new_v4(), owner, day(3), 7.0);
                store.add(s, MutationContext::Normal).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add);
criterion_main!(benches);
