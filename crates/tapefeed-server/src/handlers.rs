//! REST API endpoint handlers.
//!
//! All handlers are thin reads over the keyed event store; mutations enter
//! the system elsewhere and reach clients through the WebSocket feed.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/api/v1/dashboard` | The persisted dashboard stats record |
//! | `GET` | `/api/v1/orders` | List all orders |
//! | `GET` | `/api/v1/orders/{id}` | Get a single order |
//! | `GET` | `/api/v1/positions` | List all positions |
//! | `GET` | `/api/v1/positions/{id}` | Get a single position |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Map, Value};
use tapefeed_distributor::stats::STATS_IDENTIFIER;
use tapefeed_types::{FieldMap, Record, category};

use crate::error::ServerError;
use crate::state::AppState;

/// Merge a record's identifier into its fields as `"id"`, matching the
/// response shape dashboard clients expect.
fn record_body(record: Record) -> Result<Value, ServerError> {
    let mut body = Map::new();
    body.insert("id".to_owned(), Value::String(record.identifier));
    for (name, value) in record.fields {
        body.insert(name, serde_json::to_value(value)?);
    }
    Ok(Value::Object(body))
}

/// List every record in a category.
async fn list_category(state: &AppState, category: &str) -> Result<Json<Value>, ServerError> {
    let records = state.store.get_all(category).await?;
    let body = records
        .into_iter()
        .map(record_body)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(Value::Array(body)))
}

/// Read one record in a category, or 404.
async fn get_in_category(
    state: &AppState,
    category: &str,
    id: String,
) -> Result<Json<Value>, ServerError> {
    let fields = state
        .store
        .get(category, &id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("{category}/{id}")))?;
    record_body(Record {
        identifier: id,
        fields,
    })
    .map(Json)
}

/// `GET /health` -- liveness check.
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// `GET /api/v1/dashboard` -- the persisted dashboard stats record.
///
/// Before the first `positions` event has been distributed the record does
/// not exist yet; an empty object is returned rather than a 404.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<FieldMap>, ServerError> {
    let stats = state
        .store
        .get(category::STATS, STATS_IDENTIFIER)
        .await?
        .unwrap_or_default();
    Ok(Json(stats))
}

/// `GET /api/v1/orders` -- list all orders.
pub async fn list_orders(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    list_category(&state, category::ORDERS).await
}

/// `GET /api/v1/orders/{id}` -- a single order.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    get_in_category(&state, category::ORDERS, id).await
}

/// `GET /api/v1/positions` -- list all positions.
pub async fn list_positions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ServerError> {
    list_category(&state, category::POSITIONS).await
}

/// `GET /api/v1/positions/{id}` -- a single position.
pub async fn get_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    get_in_category(&state, category::POSITIONS, id).await
}
