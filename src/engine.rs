//! Engine - per-symbol message façade.
//!
//! Wraps one [`Book`], dispatches parsed feed messages to its
//! operations and assembles the grid-tick signal frame with the
//! suppression rules the signal writer relies on. The engine runs to
//! completion on the caller's thread; symbols scale by owning disjoint
//! engines.

use log::trace;

use crate::book::Book;
use crate::command::{Message, SignalFrame};
use crate::config::EngineConfig;

pub struct Engine {
    pub book: Book,
}

impl Engine {
    pub fn new() -> Self {
        Self { book: Book::new() }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            book: Book::with_capacity(
                config.order_capacity,
                config.level_capacity,
                config.window_capacity,
            ),
        }
    }

    /// Pre-fault book memory before the first message.
    pub fn warm_up(&mut self) {
        self.book.warm_up();
    }

    /// Apply one parsed feed message.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Clear => {
                trace!("clear book and window");
                self.book.clear();
            }
            Message::Add(add) => {
                trace!(
                    "add order_id={} price={} qty={} side={:?}",
                    add.order_id,
                    add.price,
                    add.qty,
                    add.side
                );
                self.book.add_order(add.order_id, add.price, add.qty, add.side);
            }
            Message::Modify(modify) => {
                trace!(
                    "modify order_id={} price={} qty={} side={:?}",
                    modify.order_id,
                    modify.price,
                    modify.qty,
                    modify.side
                );
                self.book
                    .modify_order(modify.order_id, modify.price, modify.qty, modify.side);
            }
            Message::Delete(delete) => {
                trace!("delete order_id={} side={:?}", delete.order_id, delete.side);
                self.book.delete_order(delete.order_id, delete.side);
            }
            Message::Trade(trade) => {
                trace!(
                    "trade order_id={} trade_id={} price={} qty={} ts={}",
                    trade.order_id,
                    trade.trade_id,
                    trade.price,
                    trade.qty,
                    trade.trade_time_ns
                );
                self.book.process_trade(
                    trade.order_id,
                    trade.trade_id,
                    trade.price,
                    trade.qty,
                    trade.side,
                    trade.trade_time_ns,
                );
            }
        }
    }

    /// Produce the signal frame for one grid tick (`YYYYMMDDHHMMSS`).
    ///
    /// Expired window trades are evicted first, then each signal is
    /// emitted only where it is meaningful: mid/spread/macro need both
    /// sides quoted, imbalance/pressure need a populated top of book or
    /// a non-zero reading, and the window metrics need at least one
    /// retained trade.
    pub fn grid_tick(&mut self, grid_time: u64) -> SignalFrame {
        self.book.evict_expired(grid_time);

        let mut frame = SignalFrame::default();
        let bbo = self.book.bbo();
        let both_quoted = bbo.bid_qty > 0 && bbo.ask_qty > 0;

        let mid = self.book.mid_price();
        if mid > 0.0 {
            frame.mid_price = Some(mid);
        }
        let spread = self.book.spread();
        if spread > 0 {
            frame.spread = Some(spread as f64);
        }
        let macro_price = self.book.macro_price();
        if macro_price > 0.0 {
            frame.macro_price = Some(macro_price);
        }

        let imbalance_5 = self.book.imbalance(5);
        if imbalance_5 != 0.0 || both_quoted {
            frame.imbalance_5 = Some(imbalance_5);
        }
        let imbalance_10 = self.book.imbalance(10);
        if imbalance_10 != 0.0 || both_quoted {
            frame.imbalance_10 = Some(imbalance_10);
        }
        let pressure_5 = self.book.book_pressure(5);
        if pressure_5 != 0.0 || both_quoted {
            frame.pressure_5 = Some(pressure_5);
        }
        let pressure_10 = self.book.book_pressure(10);
        if pressure_10 != 0.0 || both_quoted {
            frame.pressure_10 = Some(pressure_10);
        }

        if self.book.window_len() > 0 {
            frame.price_range_10min = Some(self.book.price_range() as f64);
            frame.volume_10min = Some(self.book.window_volume() as f64);
            frame.amount_10min = Some(self.book.window_amount() as f64);
            frame.vwap_10min = Some(self.book.vwap() as f64);
            frame.median_price_10min = Some(self.book.median_price() as f64);
            frame.vwap_level_10min = Some(self.book.vwap_level() as f64);
        }

        frame
    }

    /// Digest of the book state (for determinism testing).
    #[inline]
    pub fn state_hash(&self) -> u64 {
        self.book.state_hash()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
