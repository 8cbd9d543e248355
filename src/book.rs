//! Book engine - the central limit order book for one symbol.
//!
//! Coordinates the order/level arenas, the order-id index, the per-side
//! price trees, the per-level FIFO queues, the denormalised BBO cache
//! and the sliding trade window. Mutating operations are silent no-ops
//! on unknown or duplicate ids and roll back cleanly when an arena or
//! index refuses an allocation; the upstream feed is the source of
//! truth and a bad message must not poison the batch.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::arena::{Arena, ArenaIndex, LevelNode, OrderNode, LEVEL_CHUNK, ORDER_CHUNK};
use crate::command::Side;
use crate::order_index::{InsertResult, OrderIndex};
use crate::price_tree::PriceTree;
use crate::window::{TradeWindow, DEFAULT_WINDOW_CAPACITY};

/// Best bid/offer snapshot. Zeroed fields mean the side is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bbo {
    pub bid_price: i32,
    pub bid_qty: u32,
    pub ask_price: i32,
    pub ask_qty: u32,
}

pub struct Book {
    orders: Arena<OrderNode>,
    levels: Arena<LevelNode>,
    order_index: OrderIndex,
    /// Bid prices ascending; the best bid is the max end
    bid_tree: PriceTree,
    /// Ask prices ascending; the best ask is the min end
    ask_tree: PriceTree,
    bbo: Bbo,
    window: TradeWindow,
}

impl Book {
    pub fn new() -> Self {
        Self::with_capacity(1 << 16, 1 << 11, DEFAULT_WINDOW_CAPACITY)
    }

    /// Pre-reserve arenas and the trade ring so steady state needs no
    /// allocation on the message path.
    pub fn with_capacity(orders: u32, levels: u32, window_capacity: usize) -> Self {
        Self {
            orders: Arena::with_capacity(ORDER_CHUNK, orders),
            levels: Arena::with_capacity(LEVEL_CHUNK, levels),
            order_index: OrderIndex::with_capacity(orders as usize),
            bid_tree: PriceTree::new(),
            ask_tree: PriceTree::new(),
            bbo: Bbo::default(),
            window: TradeWindow::new(window_capacity),
        }
    }

    /// Pre-fault arena pages before the first message.
    pub fn warm_up(&mut self) {
        self.orders.warm_up();
        self.levels.warm_up();
    }

    #[inline]
    fn tree(&self, side: Side) -> &PriceTree {
        match side {
            Side::Buy => &self.bid_tree,
            Side::Sell => &self.ask_tree,
        }
    }

    #[inline]
    fn tree_mut(&mut self, side: Side) -> &mut PriceTree {
        match side {
            Side::Buy => &mut self.bid_tree,
            Side::Sell => &mut self.ask_tree,
        }
    }

    /// Best level of a side: max of the bid tree, min of the ask tree.
    #[inline]
    fn best(&self, side: Side) -> Option<(i32, ArenaIndex)> {
        match side {
            Side::Buy => self.bid_tree.max(),
            Side::Sell => self.ask_tree.min(),
        }
    }

    /// Recompute the dirty side(s) of the BBO from the tree extremum.
    fn refresh_bbo(&mut self, bid_dirty: bool, ask_dirty: bool) {
        if bid_dirty {
            match self.bid_tree.max() {
                Some((price, level)) => {
                    self.bbo.bid_price = price;
                    self.bbo.bid_qty = self.levels.get(level).total_qty;
                }
                None => {
                    self.bbo.bid_price = 0;
                    self.bbo.bid_qty = 0;
                }
            }
        }
        if ask_dirty {
            match self.ask_tree.min() {
                Some((price, level)) => {
                    self.bbo.ask_price = price;
                    self.bbo.ask_qty = self.levels.get(level).total_qty;
                }
                None => {
                    self.bbo.ask_price = 0;
                    self.bbo.ask_qty = 0;
                }
            }
        }
    }

    /// True when `price` sits at (or would become) the side's extremum.
    #[inline]
    fn at_extremum(&self, side: Side, price: i32) -> bool {
        self.best(side).map_or(false, |(best, _)| best == price)
    }

    // ========================================================================
    // Mutating operations
    // ========================================================================

    /// Add a resting order. A duplicate id is silently ignored; a
    /// refused allocation rolls back every partial step.
    pub fn add_order(&mut self, order_id: u64, price: i32, qty: u32, side: Side) {
        if self.order_index.find(order_id).is_some() {
            return;
        }

        let Some(order_idx) = self.orders.alloc(OrderNode::new(order_id, price, qty, side)) else {
            return;
        };
        match self.order_index.insert(order_id, order_idx) {
            InsertResult::Inserted => {}
            InsertResult::AlreadyPresent | InsertResult::TableFull => {
                self.orders.free(order_idx);
                return;
            }
        }

        // The side needs a BBO refresh when it was empty or the new
        // price matches/beats the current extremum.
        let dirty = match self.best(side) {
            Some((best, _)) => match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            },
            None => true,
        };

        let level_idx = match self.tree(side).find(price) {
            Some(idx) => idx,
            None => {
                let Some(idx) = self.levels.alloc(LevelNode::new(price, side)) else {
                    self.order_index.erase(order_id);
                    self.orders.free(order_idx);
                    return;
                };
                if !self.tree_mut(side).insert(price, idx) {
                    self.levels.free(idx);
                    self.order_index.erase(order_id);
                    self.orders.free(order_idx);
                    return;
                }
                idx
            }
        };

        let level = self.levels.get_mut(level_idx);
        level.push_back(&mut self.orders, order_idx);
        self.orders.get_mut(order_idx).level = level_idx;

        self.refresh_bbo(dirty && side == Side::Buy, dirty && side == Side::Sell);
    }

    /// Modify a resting order. Same price: qty edit in place. New
    /// price: delete + add, which forfeits time priority; if the re-add
    /// fails the delete stands and the order is gone.
    pub fn modify_order(&mut self, order_id: u64, price: i32, qty: u32, side: Side) {
        let Some(order_idx) = self.order_index.find(order_id) else {
            return;
        };
        let old = *self.orders.get(order_idx);

        if old.price == price {
            let level_idx = old.level;
            {
                let level = self.levels.get_mut(level_idx);
                level.total_qty = level.total_qty - old.qty + qty;
            }
            self.orders.get_mut(order_idx).qty = qty;

            let dirty = self.at_extremum(old.side, old.price);
            self.refresh_bbo(
                dirty && old.side == Side::Buy,
                dirty && old.side == Side::Sell,
            );
        } else {
            self.delete_order(order_id, side);
            self.add_order(order_id, price, qty, side);
        }
    }

    /// Delete a resting order. Unknown ids are silently ignored. The
    /// order's stored side is authoritative; the message side is only
    /// a routing hint upstream.
    pub fn delete_order(&mut self, order_id: u64, _side: Side) {
        let Some(order_idx) = self.order_index.find(order_id) else {
            return;
        };
        let order = *self.orders.get(order_idx);
        let side = order.side;

        let dirty = self.at_extremum(side, order.price);

        let level_idx = order.level;
        let now_empty = {
            let level = self.levels.get_mut(level_idx);
            level.remove(&mut self.orders, order_idx)
        };
        if now_empty {
            self.tree_mut(side).erase(order.price);
            self.levels.free(level_idx);
        }

        self.orders.free(order_idx);
        self.order_index.erase(order_id);

        self.refresh_bbo(dirty && side == Side::Buy, dirty && side == Side::Sell);
    }

    /// Process a reported execution.
    ///
    /// The trade always lands in the window, even when no resting
    /// order matches the id. A fill of the order's full remaining qty
    /// deletes it; a partial fill decrements order and level in place.
    pub fn process_trade(
        &mut self,
        order_id: u64,
        _trade_id: u64,
        price: i32,
        qty: u64,
        side: Side,
        trade_time_ns: u64,
    ) {
        self.window.record_trade(trade_time_ns, price, qty);

        let Some(order_idx) = self.order_index.find(order_id) else {
            return;
        };
        let order = *self.orders.get(order_idx);

        if (order.qty as u64) <= qty {
            self.delete_order(order_id, side);
        } else {
            let fill = qty as u32;
            self.orders.get_mut(order_idx).qty -= fill;
            self.levels.get_mut(order.level).total_qty -= fill;

            let dirty = self.at_extremum(order.side, order.price);
            self.refresh_bbo(
                dirty && order.side == Side::Buy,
                dirty && order.side == Side::Sell,
            );
        }
    }

    /// Destroy all orders and levels and reset the trade window.
    pub fn clear(&mut self) {
        self.orders.clear();
        self.levels.clear();
        self.order_index.clear();
        self.bid_tree.clear();
        self.ask_tree.clear();
        self.window.clear();
        self.bbo = Bbo::default();
    }

    // ========================================================================
    // Book queries
    // ========================================================================

    /// Cached BBO snapshot.
    #[inline]
    pub fn bbo(&self) -> Bbo {
        self.bbo
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    #[inline]
    pub fn bid_levels(&self) -> usize {
        self.bid_tree.len()
    }

    #[inline]
    pub fn ask_levels(&self) -> usize {
        self.ask_tree.len()
    }

    /// k-th bid price by priority (0 = best); 0 when absent.
    pub fn bid_price(&self, k: usize) -> i32 {
        self.bid_tree.nth_from_max(k).map_or(0, |(price, _)| price)
    }

    /// Aggregate quantity at the k-th bid level; 0 when absent.
    pub fn bid_qty(&self, k: usize) -> u32 {
        self.bid_tree
            .nth_from_max(k)
            .map_or(0, |(_, level)| self.levels.get(level).total_qty)
    }

    /// k-th ask price by priority (0 = best); 0 when absent.
    pub fn ask_price(&self, k: usize) -> i32 {
        self.ask_tree.nth_from_min(k).map_or(0, |(price, _)| price)
    }

    /// Aggregate quantity at the k-th ask level; 0 when absent.
    pub fn ask_qty(&self, k: usize) -> u32 {
        self.ask_tree
            .nth_from_min(k)
            .map_or(0, |(_, level)| self.levels.get(level).total_qty)
    }

    // ========================================================================
    // Derived metrics
    // ========================================================================

    /// `(bid + ask) / 2` when both sides are quoted, else 0.
    pub fn mid_price(&self) -> f64 {
        if self.bbo.bid_price > 0 && self.bbo.ask_price > 0 {
            (self.bbo.bid_price as f64 + self.bbo.ask_price as f64) / 2.0
        } else {
            0.0
        }
    }

    /// `ask - bid` when both sides are quoted, else 0.
    pub fn spread(&self) -> i32 {
        if self.bbo.bid_price > 0 && self.bbo.ask_price > 0 {
            self.bbo.ask_price - self.bbo.bid_price
        } else {
            0
        }
    }

    /// Volume-weighted mid: `(ask·bid_qty + bid·ask_qty) / (bid_qty +
    /// ask_qty)`; falls back to the mid when either side is unquoted.
    pub fn macro_price(&self) -> f64 {
        if self.bbo.bid_qty > 0
            && self.bbo.ask_qty > 0
            && self.bbo.bid_price > 0
            && self.bbo.ask_price > 0
        {
            let bid_weight = self.bbo.bid_qty as f64;
            let ask_weight = self.bbo.ask_qty as f64;
            (self.bbo.ask_price as f64 * bid_weight + self.bbo.bid_price as f64 * ask_weight)
                / (bid_weight + ask_weight)
        } else {
            self.mid_price()
        }
    }

    /// `(Σ_k bid_qty − Σ_k ask_qty) / (Σ_k bid_qty + Σ_k ask_qty)` over
    /// the k best levels of each side; 0 on an empty denominator. k
    /// past the available depth just sums what exists.
    pub fn imbalance(&self, k: usize) -> f64 {
        let mut bid_qty: u64 = 0;
        self.bid_tree.for_each_from_max(k, |_, level| {
            bid_qty += self.levels.get(level).total_qty as u64;
        });
        let mut ask_qty: u64 = 0;
        self.ask_tree.for_each_from_min(k, |_, level| {
            ask_qty += self.levels.get(level).total_qty as u64;
        });

        let total = bid_qty + ask_qty;
        if total == 0 {
            return 0.0;
        }
        (bid_qty as f64 - ask_qty as f64) / total as f64
    }

    /// Reciprocal-distance-weighted imbalance: each of the k best
    /// levels contributes `qty / |price − mid|`, and the side pressures
    /// are normalised to [-1, 1]. 0 without a valid mid.
    pub fn book_pressure(&self, k: usize) -> f64 {
        let mid = self.mid_price();
        if mid <= 0.0 {
            return 0.0;
        }

        let mut bid_pressure = 0.0;
        self.bid_tree.for_each_from_max(k, |price, level| {
            let distance = mid - price as f64;
            if distance > 0.0 {
                bid_pressure += self.levels.get(level).total_qty as f64 / distance;
            }
        });

        let mut ask_pressure = 0.0;
        self.ask_tree.for_each_from_min(k, |price, level| {
            let distance = price as f64 - mid;
            if distance > 0.0 {
                ask_pressure += self.levels.get(level).total_qty as f64 / distance;
            }
        });

        let total = bid_pressure + ask_pressure;
        if total == 0.0 {
            return 0.0;
        }
        (bid_pressure - ask_pressure) / total
    }

    /// Order count of the level containing `order_id`; 0 for unknown
    /// ids. (The historical "rank" of an order is its level's
    /// population; see [`Book::rank_in_level`] for the FIFO position.)
    pub fn order_rank(&self, order_id: u64) -> usize {
        let Some(order_idx) = self.order_index.find(order_id) else {
            return 0;
        };
        let level = self.orders.get(order_idx).level;
        self.levels.get(level).order_count as usize
    }

    /// 1-based FIFO position of the order within its level; 0 for
    /// unknown ids.
    pub fn rank_in_level(&self, order_id: u64) -> usize {
        let Some(order_idx) = self.order_index.find(order_id) else {
            return 0;
        };
        let level = self.orders.get(order_idx).level;
        self.levels
            .get(level)
            .position_of(&self.orders, order_idx)
    }

    /// Quantity summed over the order's queue neighbours, walking the
    /// predecessor links until the walk returns to the order itself;
    /// 0 for unknown ids.
    pub fn qty_ahead(&self, order_id: u64) -> u32 {
        let Some(order_idx) = self.order_index.find(order_id) else {
            return 0;
        };
        let mut sum = 0;
        let mut current = self.orders.get(order_idx).prev;
        while current != order_idx {
            let node = self.orders.get(current);
            sum += node.qty;
            current = node.prev;
        }
        sum
    }

    // ========================================================================
    // Trade-window access
    // ========================================================================

    /// Drop window trades outside `[grid − 600s, grid)`.
    pub fn evict_expired(&mut self, grid_time: u64) {
        self.window.evict_expired(grid_time);
    }

    /// Retained trade count.
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Σ qty over the window.
    #[inline]
    pub fn window_volume(&self) -> u64 {
        self.window.volume()
    }

    /// Σ price·qty over the window.
    #[inline]
    pub fn window_amount(&self) -> u64 {
        self.window.amount()
    }

    /// Window VWAP; 0 when no volume.
    #[inline]
    pub fn vwap(&self) -> u64 {
        self.window.vwap()
    }

    /// Window max − min price.
    #[inline]
    pub fn price_range(&mut self) -> i32 {
        self.window.price_range()
    }

    /// Window median price.
    #[inline]
    pub fn median_price(&mut self) -> i32 {
        self.window.median_price()
    }

    /// Book level containing the window VWAP: `−i` for the i-th ask
    /// level when the VWAP sits at or above the best ask, `+i` for the
    /// i-th bid level when it sits at or below the best bid, else 0
    /// (inside the spread or outside the book).
    pub fn vwap_level(&self) -> i32 {
        let vwap = self.vwap();
        if vwap == 0 {
            return 0;
        }
        let vwap_price = vwap as i32;

        let ask_levels = self.ask_levels();
        if ask_levels > 0 && vwap_price >= self.ask_price(0) {
            for i in 0..ask_levels {
                if vwap_price <= self.ask_price(i) {
                    return -(i as i32);
                }
            }
            return 0;
        }

        let bid_levels = self.bid_levels();
        if bid_levels > 0 && vwap_price <= self.bid_price(0) {
            for i in 0..bid_levels {
                if vwap_price >= self.bid_price(i) {
                    return i as i32;
                }
            }
        }

        0
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Digest of the full book state (for determinism testing). Equal
    /// hashes mean identical levels, FIFO order and quantities.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();

        self.bbo.bid_price.hash(&mut hasher);
        self.bbo.bid_qty.hash(&mut hasher);
        self.bbo.ask_price.hash(&mut hasher);
        self.bbo.ask_qty.hash(&mut hasher);
        self.order_index.len().hash(&mut hasher);

        self.bid_tree.for_each_from_max(usize::MAX, |price, level_idx| {
            let level = self.levels.get(level_idx);
            price.hash(&mut hasher);
            level.total_qty.hash(&mut hasher);
            level.for_each(&self.orders, |order_idx| {
                let order = self.orders.get(order_idx);
                order.order_id.hash(&mut hasher);
                order.qty.hash(&mut hasher);
            });
        });
        self.ask_tree.for_each_from_min(usize::MAX, |price, level_idx| {
            let level = self.levels.get(level_idx);
            price.hash(&mut hasher);
            level.total_qty.hash(&mut hasher);
            level.for_each(&self.orders, |order_idx| {
                let order = self.orders.get(order_idx);
                order.order_id.hash(&mut hasher);
                order.qty.hash(&mut hasher);
            });
        });

        hasher.finish()
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("bbo", &self.bbo)
            .field("bid_levels", &self.bid_tree.len())
            .field("ask_levels", &self.ask_tree.len())
            .field("order_count", &self.order_index.len())
            .field("window_len", &self.window.len())
            .finish()
    }
}
