//! Per-message latency report over a synthetic feed.
//!
//! Streams a pre-generated message mix through one engine and prints
//! an HDR-histogram summary, optionally pinned to an isolated core.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use hdrhistogram::Histogram;
use log::info;

use signal_lob::{AddOrder, AddTrade, DeleteOrder, Engine, EngineConfig, Message, Side};

const ITERATIONS: usize = 1_000_000;
const BUFFER_SIZE: usize = 10_000;
/// 2023-11-14 22:13:20 UTC
const T0_NS: u64 = 1_700_000_000_000_000_000;

/// Deterministic add/delete/trade mix across a 100-tick band.
fn generate_messages(count: usize) -> Vec<Message> {
    let mut messages = Vec::with_capacity(count);
    for i in 0..count {
        let order_id = i as u64;
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = if side == Side::Buy {
            9_900 - (i % 100) as i32
        } else {
            10_000 + (i % 100) as i32
        };
        let message = match i % 10 {
            0..=5 => Message::Add(AddOrder {
                order_id,
                price,
                qty: 10 + (i % 90) as u32,
                side,
            }),
            6 | 7 => Message::Delete(DeleteOrder {
                // Deletes target earlier adds; misses are part of the mix
                order_id: order_id.saturating_sub(6),
                side,
            }),
            _ => Message::Trade(AddTrade {
                order_id: order_id.saturating_sub(8),
                trade_id: order_id,
                price,
                qty: 5,
                side,
                trade_time_ns: T0_NS + (i as u64) * 1_000_000,
            }),
        };
        messages.push(message);
    }
    messages
}

fn pin_to_core(core: usize) {
    if let Some(cores) = core_affinity::get_core_ids() {
        if let Some(core_id) = cores.into_iter().find(|c| c.id == core) {
            core_affinity::set_for_current(core_id);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&PathBuf::from(path))?,
        None => EngineConfig::default(),
    };

    if let Some(core) = config.pin_core {
        info!("pinning to core {core}");
        pin_to_core(core);
    }

    let mut engine = Engine::from_config(&config);
    engine.warm_up();

    info!("pre-generating {BUFFER_SIZE} messages");
    let messages = generate_messages(BUFFER_SIZE);

    // Train the branch predictor before measuring
    for message in &messages {
        std::hint::black_box(engine.apply(*message));
    }
    engine.apply(Message::Clear);

    info!("running {ITERATIONS} iterations");
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 10_000_000, 3)?;
    let mut cursor = 0usize;
    for _ in 0..ITERATIONS {
        let message = messages[cursor];
        cursor = (cursor + 1) % messages.len();

        let start = Instant::now();
        engine.apply(std::hint::black_box(message));
        let nanos = start.elapsed().as_nanos() as u64;
        histogram.record(nanos.max(1))?;
    }

    // One grid tick at the end to exercise the signal path
    let frame = engine.grid_tick(20231114221420);
    let mut emitted = 0;
    frame.for_each_present(|_, _| emitted += 1);

    println!("messages processed : {ITERATIONS}");
    println!("resting orders     : {}", engine.book.order_count());
    println!("signals emitted    : {emitted}");
    println!("latency (ns)");
    println!("  p50  : {}", histogram.value_at_quantile(0.50));
    println!("  p90  : {}", histogram.value_at_quantile(0.90));
    println!("  p99  : {}", histogram.value_at_quantile(0.99));
    println!("  p999 : {}", histogram.value_at_quantile(0.999));
    println!("  max  : {}", histogram.max());

    Ok(())
}
