//! Criterion benches for the message path and the metric queries.
//!
//! Measures:
//! - add / delete / modify / trade message handling
//! - k-level metric queries against a populated book
//! - a full grid tick (eviction + 13 signals)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use signal_lob::{Book, Engine, Message, AddOrder, Side};

const NS: u64 = 1_000_000_000;
const T0_SEC: u64 = 1_700_000_000;

/// A book with `levels` levels per side and `per_level` orders each.
fn populated_book(levels: i32, per_level: u32) -> (Book, u64) {
    let mut book = Book::new();
    let mut next_id = 0u64;
    for level in 0..levels {
        for _ in 0..per_level {
            book.add_order(next_id, 9_999 - level, 100, Side::Buy);
            next_id += 1;
            book.add_order(next_id, 10_001 + level, 100, Side::Sell);
            next_id += 1;
        }
    }
    (book, next_id)
}

fn bench_add_order(c: &mut Criterion) {
    let (mut book, mut next_id) = populated_book(50, 10);
    book.warm_up();

    c.bench_function("add_order", |b| {
        b.iter(|| {
            next_id += 1;
            book.add_order(black_box(next_id), 9_950, 100, Side::Buy);
        })
    });
}

fn bench_add_delete_cycle(c: &mut Criterion) {
    let (mut book, mut next_id) = populated_book(50, 10);
    book.warm_up();

    c.bench_function("add_delete_cycle", |b| {
        b.iter(|| {
            next_id += 1;
            book.add_order(black_box(next_id), 9_950, 100, Side::Buy);
            book.delete_order(black_box(next_id), Side::Buy);
        })
    });
}

fn bench_modify_qty_non_extremal(c: &mut Criterion) {
    // Qty-only modify away from the BBO must skip the refresh
    let (mut book, _) = populated_book(50, 10);
    let mut qty = 100u32;

    c.bench_function("modify_qty_non_extremal", |b| {
        b.iter(|| {
            qty = if qty == 100 { 150 } else { 100 };
            // Order 500 rests at bid level 25, well away from the extremum
            book.modify_order(black_box(500), 9_999 - 25, qty, Side::Buy);
        })
    });
}

fn bench_process_trade(c: &mut Criterion) {
    let (mut book, _) = populated_book(50, 10);
    let mut ts = T0_SEC * NS;

    c.bench_function("process_trade_miss", |b| {
        b.iter(|| {
            ts += 1_000_000;
            // Unknown id: window recording plus the index probe
            book.process_trade(black_box(u64::MAX), 1, 10_000, 5, Side::Buy, ts);
        })
    });
}

fn bench_metrics(c: &mut Criterion) {
    let (book, _) = populated_book(50, 10);

    let mut group = c.benchmark_group("metrics");
    for k in [1usize, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("imbalance", k), &k, |b, &k| {
            b.iter(|| black_box(book.imbalance(k)))
        });
        group.bench_with_input(BenchmarkId::new("book_pressure", k), &k, |b, &k| {
            b.iter(|| black_box(book.book_pressure(k)))
        });
    }
    group.bench_function("bbo", |b| b.iter(|| black_box(book.bbo())));
    group.bench_function("macro_price", |b| b.iter(|| black_box(book.macro_price())));
    group.finish();
}

fn bench_grid_tick(c: &mut Criterion) {
    let mut engine = Engine::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for i in 0..2_000u64 {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = match side {
            Side::Buy => rng.gen_range(9_900..10_000),
            Side::Sell => rng.gen_range(10_000..10_100),
        };
        engine.apply(Message::Add(AddOrder {
            order_id: i,
            price,
            qty: rng.gen_range(1..500),
            side,
        }));
    }
    for i in 0..5_000u64 {
        engine.book.process_trade(
            u64::MAX,
            i,
            rng.gen_range(9_900..10_100),
            rng.gen_range(1..100),
            Side::Buy,
            (T0_SEC + i % 600) * NS,
        );
    }

    c.bench_function("grid_tick", |b| {
        b.iter(|| black_box(engine.grid_tick(20231114222322)))
    });
}

criterion_group!(
    benches,
    bench_add_order,
    bench_add_delete_cycle,
    bench_modify_qty_non_extremal,
    bench_process_trade,
    bench_metrics,
    bench_grid_tick
);
criterion_main!(benches);
