//! Stress tests - push the engine through extreme conditions:
//! large books, high contention at a single level, rapid order churn,
//! extreme prices and heavy trade-window traffic.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use signal_lob::{Book, Side};

const NS: u64 = 1_000_000_000;
const T0_SEC: u64 = 1_700_000_000;

#[test]
fn test_large_book_population() {
    let mut book = Book::with_capacity(1 << 17, 1 << 12, 1 << 16);
    book.warm_up();

    const ORDERS: u64 = 100_000;
    for i in 0..ORDERS {
        // Non-overlapping bands: bids 8000-8990, asks 10000-10990
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, 8_000 + ((i % 100) * 10) as i32)
        } else {
            (Side::Sell, 10_000 + ((i % 100) * 10) as i32)
        };
        book.add_order(i, price, 100, side);
    }

    assert_eq!(book.order_count(), ORDERS as usize);
    assert_eq!(book.bid_levels(), 100);
    assert_eq!(book.ask_levels(), 100);
    assert_eq!(book.bbo().bid_price, 8_990);
    assert_eq!(book.bbo().ask_price, 10_000);

    // Every order still deletes cleanly
    for i in 0..ORDERS {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        book.delete_order(i, side);
    }
    assert!(book.is_empty());
    assert_eq!(book.bid_levels(), 0);
    assert_eq!(book.ask_levels(), 0);
}

#[test]
fn test_single_level_contention() {
    let mut book = Book::new();
    const N: u64 = 10_000;
    for i in 0..N {
        book.add_order(i, 10_000, (i % 100 + 1) as u32, Side::Buy);
    }
    assert_eq!(book.bid_levels(), 1);
    let expected: u64 = (0..N).map(|i| i % 100 + 1).sum();
    assert_eq!(book.bbo().bid_qty as u64, expected);
    assert_eq!(book.order_rank(0), N as usize);

    // Remove every other order from the middle of the queue
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut ids: Vec<u64> = (0..N).collect();
    ids.shuffle(&mut rng);
    for &id in ids.iter().take((N / 2) as usize) {
        book.delete_order(id, Side::Buy);
    }

    let remaining: u64 = ids
        .iter()
        .skip((N / 2) as usize)
        .map(|&i| i % 100 + 1)
        .sum();
    assert_eq!(book.bbo().bid_qty as u64, remaining);
    assert_eq!(book.order_count(), (N / 2) as usize);
    assert_eq!(book.bid_levels(), 1);
}

#[test]
fn test_rapid_churn_reuses_arena_slots() {
    let mut book = Book::new();
    // Far more adds than arena capacity at any instant; the free
    // list must recycle slots without corrupting the queues
    for round in 0..100u64 {
        for i in 0..1_000u64 {
            let id = round * 1_000 + i;
            book.add_order(id, 10_000 + (i % 50) as i32, 10, Side::Sell);
        }
        for i in 0..1_000u64 {
            let id = round * 1_000 + i;
            book.delete_order(id, Side::Sell);
        }
        assert!(book.is_empty(), "round {round}");
        assert_eq!(book.ask_levels(), 0);
    }
}

#[test]
fn test_extreme_prices() {
    let mut book = Book::new();
    book.add_order(1, i32::MAX - 1, 10, Side::Sell);
    book.add_order(2, 1, 10, Side::Buy);
    assert_eq!(book.bbo().ask_price, i32::MAX - 1);
    assert_eq!(book.bbo().bid_price, 1);
    assert_eq!(book.spread(), i32::MAX - 2);

    book.delete_order(1, Side::Sell);
    book.delete_order(2, Side::Buy);
    assert!(book.is_empty());
}

#[test]
fn test_window_overflow_sustained() {
    // More trades than the ring holds; sums must track the retained
    // suffix exactly
    let capacity = 1 << 10;
    let mut book = Book::with_capacity(1 << 16, 1 << 11, capacity);

    let total = capacity * 3;
    for i in 0..total {
        book.process_trade(
            u64::MAX, // no resting order; window-only traffic
            i as u64,
            100 + (i % 7) as i32,
            1,
            Side::Buy,
            (T0_SEC + i as u64) * NS,
        );
    }

    assert_eq!(book.window_len(), capacity);
    assert_eq!(book.window_volume(), capacity as u64);
    let expected_amount: u64 = (total - capacity..total)
        .map(|i| 100 + (i % 7) as u64)
        .sum();
    assert_eq!(book.window_amount(), expected_amount);
    let median = book.median_price();
    assert!((100..107).contains(&median));
}

#[test]
fn test_mixed_workload_stays_consistent() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xFEED);
    let mut book = Book::new();
    let mut live: Vec<(u64, Side)> = Vec::new();
    let mut next_id = 0u64;
    let mut expected_count = 0usize;

    for step in 0..50_000u64 {
        match rng.gen_range(0..10) {
            0..=5 => {
                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                let price = match side {
                    Side::Buy => rng.gen_range(9_000..10_000),
                    Side::Sell => rng.gen_range(10_000..11_000),
                };
                book.add_order(next_id, price, rng.gen_range(1..1_000), side);
                live.push((next_id, side));
                next_id += 1;
                expected_count += 1;
            }
            6 | 7 if !live.is_empty() => {
                let idx = rng.gen_range(0..live.len());
                let (id, side) = live.swap_remove(idx);
                book.delete_order(id, side);
                expected_count -= 1;
            }
            _ => {
                book.process_trade(
                    u64::MAX,
                    step,
                    rng.gen_range(9_000..11_000),
                    rng.gen_range(1..100),
                    Side::Buy,
                    (T0_SEC + step) * NS,
                );
            }
        }

        if step % 5_000 == 0 {
            assert_eq!(book.order_count(), expected_count);
            let bbo = book.bbo();
            if book.bid_levels() > 0 {
                assert_eq!(bbo.bid_price, book.bid_price(0));
                assert_eq!(bbo.bid_qty, book.bid_qty(0));
            } else {
                assert_eq!(bbo.bid_price, 0);
            }
            if book.ask_levels() > 0 {
                assert_eq!(bbo.ask_price, book.ask_price(0));
                assert_eq!(bbo.ask_qty, book.ask_qty(0));
            } else {
                assert_eq!(bbo.ask_price, 0);
            }
        }
    }
}

#[test]
fn test_state_hash_determinism_across_runs() {
    let build = || {
        let mut book = Book::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0xD00D);
        for i in 0..5_000u64 {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            book.add_order(i, rng.gen_range(9_500..10_500), rng.gen_range(1..500), side);
            if rng.gen_bool(0.3) {
                book.delete_order(rng.gen_range(0..i + 1), side);
            }
        }
        book
    };

    assert_eq!(build().state_hash(), build().state_hash());
}
