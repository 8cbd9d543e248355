//! # Signal-LOB
//!
//! A single-symbol limit order book with sliding-window trade signals.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: each book is owned by one logical caller; symbols
//!   scale by sharding over disjoint instances
//! - **Bounded Latency**: arenas, a Robin-Hood id index and a B+-tree
//!   price index keep every message O(1)/O(log N) with no hot-path
//!   allocation after warm-up
//! - **Reported Trades**: executions are consumed from the feed, never
//!   produced; the book does not cross orders
//!
//! ## Architecture
//!
//! ```text
//! [Feed Reader] --> [Engine::apply] --> [Book + TradeWindow]
//!                                             |
//! [Grid Driver] --> [Engine::grid_tick] --> [SignalFrame]
//! ```

pub mod arena;
pub mod book;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod feed;
pub mod order_index;
pub mod price_level;
pub mod price_tree;
pub mod window;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, LevelNode, OrderNode, NULL_INDEX};
pub use book::{Bbo, Book};
pub use command::{AddOrder, AddTrade, DeleteOrder, Message, ModifyOrder, Side, SignalFrame};
pub use config::EngineConfig;
pub use engine::Engine;
pub use order_index::{InsertResult, OrderIndex};
pub use price_tree::PriceTree;
pub use window::TradeWindow;
