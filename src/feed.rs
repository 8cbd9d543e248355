//! Feed-row adapter.
//!
//! Recorded market data arrives as rows with decimal prices and
//! RFC-3339 timestamps; this converts one row into the typed message
//! the engine consumes, with a configurable tick scale. Rows that do
//! not decode to a complete message yield `None` and are skipped by
//! the replay driver.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::command::{AddOrder, AddTrade, DeleteOrder, Message, ModifyOrder, Side};

#[derive(Debug, Deserialize)]
pub struct FeedRow {
    pub r#type: String,
    pub side: Option<String>,
    pub price: Option<Decimal>,
    pub qty: Option<Decimal>,
    pub order_id: Option<u64>,
    pub trade_id: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FeedRow {
    fn side(&self) -> Option<Side> {
        match self.side.as_deref() {
            Some("buy") | Some("bid") => Some(Side::Buy),
            Some("sell") | Some("ask") => Some(Side::Sell),
            _ => None,
        }
    }

    fn ticks(&self, price_scale: u32) -> Option<i32> {
        let price = self.price?;
        (price * Decimal::from(price_scale)).to_i32()
    }

    /// Convert a raw row into a typed message.
    ///
    /// `price_scale` is the tick multiplier (e.g. 100 for cent ticks).
    pub fn to_message(&self, price_scale: u32) -> Option<Message> {
        match self.r#type.as_str() {
            "clear" => Some(Message::Clear),
            "add" => Some(Message::Add(AddOrder {
                order_id: self.order_id?,
                price: self.ticks(price_scale)?,
                qty: self.qty?.to_u32()?,
                side: self.side()?,
            })),
            "modify" => Some(Message::Modify(ModifyOrder {
                order_id: self.order_id?,
                price: self.ticks(price_scale)?,
                qty: self.qty?.to_u32()?,
                side: self.side()?,
            })),
            "delete" => Some(Message::Delete(DeleteOrder {
                order_id: self.order_id?,
                side: self.side()?,
            })),
            "trade" => Some(Message::Trade(AddTrade {
                order_id: self.order_id?,
                trade_id: self.trade_id.unwrap_or(0),
                price: self.ticks(price_scale)?,
                qty: self.qty?.to_u64()?,
                side: self.side()?,
                trade_time_ns: self.timestamp?.timestamp_nanos_opt().and_then(|ns| u64::try_from(ns).ok())?,
            })),
            _ => None,
        }
    }
}
