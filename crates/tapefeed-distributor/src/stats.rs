//! Derived aggregate recomputation.
//!
//! The `stats` category holds derived records that are never authoritative:
//! each one must always be reproducible by full recomputation from its
//! source category. The position stats record is recomputed synchronously
//! every time a `positions` event is distributed, from a full point-in-time
//! snapshot of the category (eventually consistent, linear in category
//! size).

use tapefeed_store::KeyedEventStore;
use tapefeed_types::{FieldMap, FieldValue, category};

use crate::error::DistributorError;

/// Identifier of the dashboard stats record within the `stats` category.
pub const STATS_IDENTIFIER: &str = "web";

/// Source field summed into the aggregate.
pub const PNL_FIELD: &str = "unrealized_pnl";

/// Aggregate field: number of open positions.
pub const TOTAL_POSITIONS_FIELD: &str = "total_positions";

/// Aggregate field: summed unrealized P&L, 2 decimal places per position.
pub const TOTAL_PNL_FIELD: &str = "total_pnl";

/// Round a P&L value to 2 decimal places.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recompute the position stats aggregate from the full current set of
/// `positions` records, persist it as `("stats", "web")`, and return it.
///
/// Positions without a parsable P&L field contribute zero to the sum but
/// still count toward the total.
///
/// # Errors
///
/// Returns [`DistributorError::Store`] if the snapshot read or the
/// persisting write fails.
pub async fn recompute_position_stats(
    store: &KeyedEventStore,
) -> Result<FieldMap, DistributorError> {
    let positions = store.get_all(category::POSITIONS).await?;

    let count = i64::try_from(positions.len()).unwrap_or(i64::MAX);
    let total_pnl: f64 = positions
        .iter()
        .map(|record| {
            record
                .fields
                .get(PNL_FIELD)
                .and_then(FieldValue::as_f64)
                .map_or(0.0, round_cents)
        })
        .sum();

    let mut stats = FieldMap::new();
    stats.insert(TOTAL_POSITIONS_FIELD.to_owned(), FieldValue::Int(count));
    stats.insert(TOTAL_PNL_FIELD.to_owned(), FieldValue::Float(total_pnl));

    store
        .set(category::STATS, STATS_IDENTIFIER, stats.clone())
        .await?;
    Ok(stats)
}
