//! Sliding-window trade statistics.
//!
//! A power-of-two ring buffer holds the trades of the last ten minutes
//! in insertion order. Volume and turnover are kept as incremental
//! sums, the median comes from a dual-heap (lower max-heap / upper
//! min-heap) with generation-tagged lazy deletion, and min/max are a
//! cache rebuilt on demand after evictions.
//!
//! Eviction runs against grid time: the retained window is
//! `[current - 600s, current)` in Unix seconds, closed at the cutoff
//! and open at the current second.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::clock::{grid_to_unix_seconds, ns_to_seconds};

/// Default ring capacity (trades per 10-minute window).
pub const DEFAULT_WINDOW_CAPACITY: usize = 65536;

/// Window length in seconds.
pub const WINDOW_SECONDS: u64 = 600;

/// Rebuild the heaps once dead entries outnumber live ones by this
/// factor, to bound memory under heavy churn.
const HEAP_SLACK: usize = 2;

#[derive(Clone, Copy, Default)]
struct TradeSlot {
    ts_sec: u64,
    price: i32,
    qty: u64,
    amount: u64,
    /// Bumped whenever the slot's trade leaves the window, expiring
    /// any heap entry still carrying the old value.
    generation: u32,
    /// Which median heap currently holds this slot's entry.
    in_lower: bool,
}

/// Heap entries order by price first; the slot index only breaks ties
/// deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    price: i32,
    slot: u32,
    generation: u32,
}

pub struct TradeWindow {
    slots: Box<[TradeSlot]>,
    mask: usize,
    /// Next write position
    head: usize,
    /// Retained trades (contiguous range ending at `head`)
    count: usize,

    sum_qty: u64,
    sum_amount: u64,

    /// Lower half of retained prices (max-heap)
    lower: BinaryHeap<HeapEntry>,
    /// Upper half of retained prices (min-heap)
    upper: BinaryHeap<Reverse<HeapEntry>>,
    lower_live: usize,
    upper_live: usize,

    cached_min: i32,
    cached_max: i32,
    cache_valid: bool,
}

impl TradeWindow {
    /// Create a window with the given ring capacity (power of two).
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "window capacity must be a power of two"
        );
        Self {
            slots: vec![TradeSlot::default(); capacity].into_boxed_slice(),
            mask: capacity - 1,
            head: 0,
            count: 0,
            sum_qty: 0,
            sum_amount: 0,
            lower: BinaryHeap::new(),
            upper: BinaryHeap::new(),
            lower_live: 0,
            upper_live: 0,
            cached_min: i32::MAX,
            cached_max: i32::MIN,
            cache_valid: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn tail(&self) -> usize {
        (self.head + self.slots.len() - self.count) & self.mask
    }

    // ========================================================================
    // Recording and eviction
    // ========================================================================

    /// Record one execution.
    ///
    /// On ring overflow the oldest retained trade is overwritten: its
    /// sums are subtracted and its heap entry expires first.
    ///
    /// # Complexity
    /// O(log N) for the median-heap insertion.
    pub fn record_trade(&mut self, ts_ns: u64, price: i32, qty: u64) {
        if self.count == self.slots.len() {
            let tail = self.tail();
            self.evict_slot(tail);
        }

        let amount = (price as u64).wrapping_mul(qty);
        let idx = self.head;
        let generation = self.slots[idx].generation;
        {
            let slot = &mut self.slots[idx];
            slot.ts_sec = ns_to_seconds(ts_ns);
            slot.price = price;
            slot.qty = qty;
            slot.amount = amount;
        }

        self.sum_qty += qty;
        self.sum_amount = self.sum_amount.wrapping_add(amount);

        if price < self.cached_min {
            self.cached_min = price;
        }
        if price > self.cached_max {
            self.cached_max = price;
        }

        self.heap_insert(idx, price, generation);

        self.head = (self.head + 1) & self.mask;
        self.count += 1;

        if self.lower.len() + self.upper.len() > HEAP_SLACK * self.count + 64 {
            self.rebuild_heaps();
        }
    }

    /// Drop trades outside `[current - 600s, current)`, where `current`
    /// is a `YYYYMMDDHHMMSS` grid time.
    ///
    /// A grid time that fails calendar decomposition leaves the window
    /// untouched.
    pub fn evict_expired(&mut self, grid_time: u64) {
        let Some(current) = grid_to_unix_seconds(grid_time) else {
            return;
        };
        let cutoff = current.saturating_sub(WINDOW_SECONDS);

        while self.count > 0 {
            let tail = self.tail();
            let ts = self.slots[tail].ts_sec;
            if ts >= cutoff && ts < current {
                break;
            }
            self.evict_slot(tail);
        }
    }

    /// Reset to the empty state. Ring memory is retained.
    pub fn clear(&mut self) {
        self.slots.fill(TradeSlot::default());
        self.head = 0;
        self.count = 0;
        self.sum_qty = 0;
        self.sum_amount = 0;
        self.lower.clear();
        self.upper.clear();
        self.lower_live = 0;
        self.upper_live = 0;
        self.cached_min = i32::MAX;
        self.cached_max = i32::MIN;
        self.cache_valid = true;
    }

    fn evict_slot(&mut self, idx: usize) {
        let slot = self.slots[idx];
        self.sum_qty -= slot.qty;
        self.sum_amount = self.sum_amount.wrapping_sub(slot.amount);
        self.slots[idx].generation = slot.generation.wrapping_add(1);
        if slot.in_lower {
            self.lower_live -= 1;
        } else {
            self.upper_live -= 1;
        }
        self.count -= 1;
        self.cache_valid = false;
        self.rebalance();
    }

    // ========================================================================
    // Dual-heap median
    // ========================================================================

    fn heap_insert(&mut self, idx: usize, price: i32, generation: u32) {
        self.clean_lower_root();
        let entry = HeapEntry {
            price,
            slot: idx as u32,
            generation,
        };
        let to_lower = match self.lower.peek() {
            Some(root) if self.lower_live > 0 => price <= root.price,
            _ => true,
        };
        if to_lower {
            self.slots[idx].in_lower = true;
            self.lower.push(entry);
            self.lower_live += 1;
        } else {
            self.slots[idx].in_lower = false;
            self.upper.push(Reverse(entry));
            self.upper_live += 1;
        }
        self.rebalance();
    }

    /// Restore `lower_live - upper_live ∈ {0, 1}` by migrating live
    /// roots between the heaps.
    fn rebalance(&mut self) {
        while self.lower_live > self.upper_live + 1 {
            let entry = self.pop_live_lower();
            self.slots[entry.slot as usize].in_lower = false;
            self.upper.push(Reverse(entry));
            self.lower_live -= 1;
            self.upper_live += 1;
        }
        while self.upper_live > self.lower_live {
            let entry = self.pop_live_upper();
            self.slots[entry.slot as usize].in_lower = true;
            self.lower.push(entry);
            self.upper_live -= 1;
            self.lower_live += 1;
        }
    }

    #[inline]
    fn entry_live(&self, entry: &HeapEntry) -> bool {
        self.slots[entry.slot as usize].generation == entry.generation
    }

    fn pop_live_lower(&mut self) -> HeapEntry {
        loop {
            let entry = self.lower.pop().expect("lower heap has live entries");
            if self.entry_live(&entry) {
                return entry;
            }
        }
    }

    fn pop_live_upper(&mut self) -> HeapEntry {
        loop {
            let Reverse(entry) = self.upper.pop().expect("upper heap has live entries");
            if self.entry_live(&entry) {
                return entry;
            }
        }
    }

    /// Pop expired entries until the lower root is live (or the heap
    /// is exhausted).
    fn clean_lower_root(&mut self) {
        while let Some(root) = self.lower.peek() {
            if self.entry_live(root) {
                break;
            }
            self.lower.pop();
        }
    }

    fn clean_upper_root(&mut self) {
        while let Some(Reverse(root)) = self.upper.peek() {
            if self.entry_live(root) {
                break;
            }
            self.upper.pop();
        }
    }

    /// Throw away dead entries and repartition the live ones around
    /// the median. Rare; bounds heap memory under churn.
    fn rebuild_heaps(&mut self) {
        let mut entries = Vec::with_capacity(self.count);
        for i in 0..self.count {
            let idx = (self.tail() + i) & self.mask;
            let slot = &self.slots[idx];
            entries.push(HeapEntry {
                price: slot.price,
                slot: idx as u32,
                generation: slot.generation,
            });
        }
        entries.sort_unstable();

        let half = entries.len().div_ceil(2);
        self.lower.clear();
        self.upper.clear();
        for entry in &entries[..half] {
            self.slots[entry.slot as usize].in_lower = true;
            self.lower.push(*entry);
        }
        for entry in &entries[half..] {
            self.slots[entry.slot as usize].in_lower = false;
            self.upper.push(Reverse(*entry));
        }
        self.lower_live = half;
        self.upper_live = entries.len() - half;
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Total traded quantity over the window. O(1).
    #[inline]
    pub fn volume(&self) -> u64 {
        self.sum_qty
    }

    /// Total turnover (Σ price·qty) over the window. O(1).
    #[inline]
    pub fn amount(&self) -> u64 {
        self.sum_amount
    }

    /// Volume-weighted average price; 0 on an empty window. O(1).
    #[inline]
    pub fn vwap(&self) -> u64 {
        if self.count == 0 || self.sum_qty == 0 {
            return 0;
        }
        self.sum_amount / self.sum_qty
    }

    /// Max minus min retained price. O(1) amortised: the cache is
    /// rebuilt from the live ring only after an eviction invalidated
    /// it.
    pub fn price_range(&mut self) -> i32 {
        if self.count == 0 {
            return 0;
        }
        if !self.cache_valid {
            self.cached_min = i32::MAX;
            self.cached_max = i32::MIN;
            for i in 0..self.count {
                let price = self.slots[(self.tail() + i) & self.mask].price;
                if price < self.cached_min {
                    self.cached_min = price;
                }
                if price > self.cached_max {
                    self.cached_max = price;
                }
            }
            self.cache_valid = true;
        }
        self.cached_max - self.cached_min
    }

    /// Median retained price; 0 on an empty window.
    ///
    /// Expired roots are cleaned here rather than on eviction, keeping
    /// eviction cheap. With an even population the two inner roots are
    /// averaged (integer division, as the feed prices are ticks).
    pub fn median_price(&mut self) -> i32 {
        if self.count == 0 {
            return 0;
        }
        self.clean_lower_root();
        if self.lower_live == self.upper_live {
            self.clean_upper_root();
            let lo = self.lower.peek().expect("live lower root").price;
            let hi = self.upper.peek().expect("live upper root").0.price;
            ((lo as i64 + hi as i64) / 2) as i32
        } else {
            // lower is the larger side by the balance invariant
            self.lower.peek().expect("live lower root").price
        }
    }
}

impl Default for TradeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl std::fmt::Debug for TradeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeWindow")
            .field("count", &self.count)
            .field("sum_qty", &self.sum_qty)
            .field("sum_amount", &self.sum_amount)
            .finish()
    }
}
