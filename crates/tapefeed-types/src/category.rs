//! Well-known category names.
//!
//! Categories partition records in the keyed store and double as pub/sub
//! topic names: a mutation in category `C` is published on topic `C`.

/// Open and filled orders.
pub const ORDERS: &str = "orders";

/// Live positions, including their unrealized P&L.
pub const POSITIONS: &str = "positions";

/// Executed trades.
pub const TRADES: &str = "trades";

/// Strategy signals passed through to dashboard clients.
pub const SIGNALS: &str = "signals";

/// Derived aggregates recomputed from source categories.
pub const STATS: &str = "stats";
