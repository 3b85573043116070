use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ulid::Ulid;

use hallbook::catalog::{Hall, StaticCatalog};
use hallbook::clock::SystemClock;
use hallbook::engine::{Engine, SubmitOutcome};
use hallbook::model::{Category, Ms, ReservationRequest, Span, Status};
use hallbook::notify::NotifyHub;
use hallbook::principal::Principal;

const HOUR: i64 = 3_600_000; // 1 hour in ms
const HALLS: usize = 10;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn hall(i: usize) -> String {
    format!("hall-{i}")
}

fn open_engine() -> Arc<Engine> {
    let dir = std::env::temp_dir().join(format!("hallbook_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let catalog = StaticCatalog::new((0..HALLS).map(|i| Hall::new(hall(i), hall(i), 500)));
    Arc::new(
        Engine::new(
            dir.join("reservations.wal"),
            Arc::new(catalog),
            Arc::new(SystemClock),
            Arc::new(NotifyHub::new()),
        )
        .unwrap(),
    )
}

/// First whole day comfortably in the future, so no window is in the past.
fn base_ms(engine: &Engine) -> Ms {
    let day = 86_400_000;
    (engine.now_ms() / day + 2) * day
}

fn request(hall_idx: usize, start: Ms, category: Category) -> ReservationRequest {
    ReservationRequest::new(hall(hall_idx), "bench", start, start + HOUR, category)
        .with_attendance(40)
}

async fn phase1_sequential(engine: &Engine) {
    let coordinator = Principal::coordinator("bench-seq");
    let base = base_ms(engine);
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        let outcome = engine
            .submit(&coordinator, request(0, base + (i as i64) * HOUR, Category::Student))
            .await
            .unwrap();
        assert!(outcome.accepted().is_some());
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} submissions in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("submit latency", &mut latencies);
}

async fn phase2_concurrent(engine: &Arc<Engine>) {
    let n_tasks = 10;
    let n_per_task = 200;
    let base = base_ms(engine) + 10_000 * HOUR;

    let start = Instant::now();
    let mut handles = Vec::new();

    for i in 0..n_tasks {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let coordinator = Principal::coordinator(format!("bench-{i}"));
            for j in 0..n_per_task {
                let s = base + (j as i64) * HOUR;
                engine
                    .submit(&coordinator, request(1 + i % (HALLS - 1), s, Category::Departmental))
                    .await
                    .unwrap();
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} submissions = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

/// Every task fights for the same few slots; exactly one winner per slot.
async fn phase3_contended_slots(engine: &Arc<Engine>) {
    let n_tasks = 50;
    let slots = 20;
    let base = base_ms(engine) + 20_000 * HOUR;
    let accepted = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..n_tasks {
        let engine = engine.clone();
        let accepted = accepted.clone();
        handles.push(tokio::spawn(async move {
            let coordinator = Principal::coordinator(format!("rival-{i}"));
            let mut latencies = Vec::with_capacity(slots);
            for s in 0..slots {
                let t = Instant::now();
                let outcome = engine
                    .submit(&coordinator, request(0, base + s as i64 * HOUR, Category::Student))
                    .await
                    .unwrap();
                latencies.push(t.elapsed());
                if let SubmitOutcome::Accepted(_) = outcome {
                    accepted.fetch_add(1, Ordering::Relaxed);
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in handles {
        all_latencies.extend(h.await.unwrap());
    }

    let won = accepted.load(Ordering::Relaxed);
    println!(
        "  {n_tasks} tasks racing for {slots} slots: {won} accepted in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    assert_eq!(won, slots, "double booking under contention");
    print_latency("contended submit (incl. alternatives)", &mut all_latencies);
}

async fn phase4_decisions_under_load(engine: &Arc<Engine>) {
    let admin = Principal::admin("bench-admin");
    let pending: Vec<_> = engine
        .reservations_for(&hall(1).into(), &[Status::Pending])
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();

    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        let stop = stop.clone();
        readers.push(tokio::spawn(async move {
            let window = Span::new(base_ms(&engine), base_ms(&engine) + 100 * HOUR);
            let mut reads = 0usize;
            while !stop.load(Ordering::Relaxed) {
                let _ = engine.find_conflict(&hall(1).into(), window, &Status::LIVE, None).await;
                reads += 1;
                tokio::task::yield_now().await;
            }
            reads
        }));
    }

    let mut latencies = Vec::with_capacity(pending.len());
    for id in pending {
        let t = Instant::now();
        engine.approve(&admin, id, None).await.unwrap();
        latencies.push(t.elapsed());
    }

    stop.store(true, Ordering::Relaxed);
    let mut reads = 0;
    for h in readers {
        reads += h.await.unwrap();
    }
    println!("  {reads} concurrent conflict checks");
    print_latency("approve latency", &mut latencies);
}

async fn phase5_compaction(engine: &Engine) {
    let appended = engine.wal_appends_since_compact().await;
    let t = Instant::now();
    engine.compact_wal().await.unwrap();
    println!(
        "  compacted {appended} records in {:.2}ms",
        t.elapsed().as_secs_f64() * 1000.0
    );
}

#[tokio::main]
async fn main() {
    println!("=== hallbook stress benchmark ===\n");
    let engine = open_engine();

    println!("[phase 1] sequential submit throughput");
    phase1_sequential(&engine).await;

    println!("\n[phase 2] concurrent submit throughput");
    phase2_concurrent(&engine).await;

    println!("\n[phase 3] contended slots");
    phase3_contended_slots(&engine).await;

    println!("\n[phase 4] approvals under read load");
    phase4_decisions_under_load(&engine).await;

    println!("\n[phase 5] compaction");
    phase5_compaction(&engine).await;

    println!("\n=== done ===");
}
