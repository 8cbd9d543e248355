//! Message and signal types.
//!
//! Messages are the fully parsed order-life-cycle payloads handed to the
//! engine by the feed reader. Signals are the grid-tick outputs consumed
//! by the writer.

/// Order side (buy = bid, sell = ask)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Map the feed encoding (0 = buy, 1 = sell) to a side.
    #[inline]
    pub const fn from_wire(raw: u8) -> Self {
        if raw == 0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

// ============================================================================
// Input Messages
// ============================================================================

/// Add a resting order to the book
#[derive(Clone, Copy, Debug)]
pub struct AddOrder {
    pub order_id: u64,
    pub price: i32,
    pub qty: u32,
    pub side: Side,
}

/// Replace an order's price and/or quantity
#[derive(Clone, Copy, Debug)]
pub struct ModifyOrder {
    pub order_id: u64,
    pub price: i32,
    pub qty: u32,
    pub side: Side,
}

/// Remove a resting order
#[derive(Clone, Copy, Debug)]
pub struct DeleteOrder {
    pub order_id: u64,
    pub side: Side,
}

/// A reported execution against a resting order
#[derive(Clone, Copy, Debug)]
pub struct AddTrade {
    pub order_id: u64,
    pub trade_id: u64,
    pub price: i32,
    pub qty: u64,
    pub side: Side,
    /// Nanoseconds since the Unix epoch
    pub trade_time_ns: u64,
}

/// One fully parsed feed message for a single symbol.
///
/// Wire framing and symbol dispatch are the reader's concern; the engine
/// only sees decoded fields.
#[derive(Clone, Copy, Debug)]
pub enum Message {
    /// Drop all resting orders and reset the trade window
    Clear,
    Add(AddOrder),
    Modify(ModifyOrder),
    Delete(DeleteOrder),
    Trade(AddTrade),
}

// ============================================================================
// Output Signals
// ============================================================================

/// The grid-tick signal set for one symbol.
///
/// A `None` field is suppressed: the value was not meaningful at this
/// tick (one-sided book, empty trade window), which the writer must
/// distinguish from a legitimate zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SignalFrame {
    pub mid_price: Option<f64>,
    pub spread: Option<f64>,
    pub macro_price: Option<f64>,
    pub imbalance_5: Option<f64>,
    pub imbalance_10: Option<f64>,
    pub pressure_5: Option<f64>,
    pub pressure_10: Option<f64>,
    pub price_range_10min: Option<f64>,
    pub volume_10min: Option<f64>,
    pub amount_10min: Option<f64>,
    pub vwap_10min: Option<f64>,
    pub median_price_10min: Option<f64>,
    pub vwap_level_10min: Option<f64>,
}

impl SignalFrame {
    /// Visit every present signal with its wire name, in emission order.
    pub fn for_each_present<F: FnMut(&'static str, f64)>(&self, mut f: F) {
        let fields: [(&'static str, Option<f64>); 13] = [
            ("mid_price", self.mid_price),
            ("spread", self.spread),
            ("macro_price", self.macro_price),
            ("imbalance_5", self.imbalance_5),
            ("imbalance_10", self.imbalance_10),
            ("pressure_5", self.pressure_5),
            ("pressure_10", self.pressure_10),
            ("price_range_10min", self.price_range_10min),
            ("volume_10min", self.volume_10min),
            ("amount_10min", self.amount_10min),
            ("vwap_10min", self.vwap_10min),
            ("median_price_10min", self.median_price_10min),
            ("vwap_level_10min", self.vwap_level_10min),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                f(name, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_side_from_wire() {
        assert_eq!(Side::from_wire(0), Side::Buy);
        assert_eq!(Side::from_wire(1), Side::Sell);
    }

    #[test]
    fn test_message_variants() {
        let add = Message::Add(AddOrder {
            order_id: 1,
            price: 100,
            qty: 10,
            side: Side::Buy,
        });
        match add {
            Message::Add(o) => assert_eq!(o.order_id, 1),
            _ => panic!("Expected Add"),
        }

        let del = Message::Delete(DeleteOrder {
            order_id: 1,
            side: Side::Buy,
        });
        match del {
            Message::Delete(d) => assert_eq!(d.side, Side::Buy),
            _ => panic!("Expected Delete"),
        }
    }

    #[test]
    fn test_signal_frame_suppression() {
        let mut frame = SignalFrame::default();
        frame.mid_price = Some(105.0);
        frame.volume_10min = Some(20.0);

        let mut seen = Vec::new();
        frame.for_each_present(|name, value| seen.push((name, value)));
        assert_eq!(seen, vec![("mid_price", 105.0), ("volume_10min", 20.0)]);
    }
}
