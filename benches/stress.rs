use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, NaiveTime};
use ulid::Ulid;

use seatd::engine::{Engine, EngineError};
use seatd::layout::default_floor_plan;
use seatd::model::*;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn seating(slot: u32) -> (NaiveDate, NaiveTime) {
    let date = base_date() + Days::new(u64::from(slot / 12));
    let time = NaiveTime::from_hms_opt((slot % 12) * 2, 0, 0).unwrap();
    (date, time)
}

async fn setup() -> (Arc<Engine>, Vec<DiningTable>) {
    let engine = Arc::new(Engine::in_memory());
    let loaded = engine.load_floor_plan(default_floor_plan()).await.unwrap();
    let tables = engine.list_tables().await.unwrap();
    println!("  loaded {loaded} tables");
    (engine, tables)
}

/// Back-to-back two-hour seatings on one table.
async fn phase1_sequential(engine: &Engine, table: &DiningTable) {
    let n = 2_000;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();

    for slot in 0..n {
        let (date, time) = seating(slot);
        let t = Instant::now();
        engine
            .create_reservation(table.id, date, time, 1)
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create_reservation", &mut latencies);
}

/// Many tasks race for the same seatings across every table. Each
/// (table, seating) pair must be admitted exactly once.
async fn phase2_contended(engine: Arc<Engine>, tables: &[DiningTable]) {
    let n_tasks = 32;
    let n_slots = 100;
    let first_slot = 10_000;

    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..n_tasks {
        let engine = engine.clone();
        let ids: Vec<Ulid> = tables.iter().map(|t| t.id).collect();
        handles.push(tokio::spawn(async move {
            let mut admitted = 0usize;
            let mut taken = 0usize;
            for slot in first_slot..first_slot + n_slots {
                let (date, time) = seating(slot);
                for id in &ids {
                    match engine.create_reservation(*id, date, time, 1).await {
                        Ok(_) => admitted += 1,
                        Err(EngineError::SlotTaken(_)) => taken += 1,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }
            (admitted, taken)
        }));
    }

    let mut admitted = 0;
    let mut taken = 0;
    for h in handles {
        let (a, t) = h.await.unwrap();
        admitted += a;
        taken += t;
    }

    let elapsed = start.elapsed();
    let total = admitted + taken;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_slots} seatings x {} tables = {total} attempts in {:.2}s = {ops:.0} ops/sec",
        tables.len(),
        elapsed.as_secs_f64()
    );

    let expected = tables.len() * n_slots as usize;
    println!("  admitted {admitted} (expected {expected}), rejected {taken}");
    assert_eq!(admitted, expected, "double booking detected");
}

/// Availability and recommendation latency while writers keep booking.
async fn phase3_read_under_load(engine: Arc<Engine>, tables: &[DiningTable]) {
    let writer_engine = engine.clone();
    let ids: Vec<Ulid> = tables.iter().map(|t| t.id).collect();
    let writer = tokio::spawn(async move {
        for slot in 20_000..21_000 {
            let (date, time) = seating(slot);
            for id in &ids {
                let _ = writer_engine.create_reservation(*id, date, time, 2).await;
            }
        }
    });

    let features = BTreeSet::from([Feature::Window]);
    let mut avail_latencies = Vec::new();
    let mut rec_latencies = Vec::new();

    for slot in 20_000..20_500 {
        let (date, time) = seating(slot);

        let t = Instant::now();
        let avail = engine.availability(date, time, 2, None).await.unwrap();
        avail_latencies.push(t.elapsed());
        assert_eq!(avail.len(), tables.len());

        let t = Instant::now();
        let rec = engine
            .recommend(date, time, 2, Some(Zone::Terrace), &features)
            .await
            .unwrap();
        rec_latencies.push(t.elapsed());
        assert!(rec.top_three.len() <= 3);
    }

    writer.await.unwrap();
    print_latency("availability", &mut avail_latencies);
    print_latency("recommend", &mut rec_latencies);
}

#[tokio::main]
async fn main() {
    println!("=== seatd stress benchmark ===\n");

    println!("[setup]");
    let (engine, tables) = setup().await;

    println!("\n[phase 1] sequential admissions");
    phase1_sequential(&engine, &tables[0]).await;

    println!("\n[phase 2] contended admissions");
    phase2_contended(engine.clone(), &tables).await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load(engine, &tables).await;

    println!("\n=== benchmark complete ===");
}
