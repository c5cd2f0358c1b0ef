//! Read-only HTTP surface exposing the hit counters the ingest loop tallies.
//! Query shapes and the `maxDays` off-by-one are grounded on
//! `original_source/src/eddn/Monitor.py`'s `getTotalSoftwares`/`getSchemas`
//! handlers.

use crate::repo::stats::{self, DailyHits, NameHits};
use crate::response::{bad_request, internal_error};
use crate::state::MonitorState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub async fn ping() -> impl IntoResponse {
    "pong"
}

#[derive(Serialize)]
struct NameHitsOut {
    name: String,
    hits: i64,
}

impl From<NameHits> for NameHitsOut {
    fn from(row: NameHits) -> Self {
        NameHitsOut { name: row.name, hits: row.hits }
    }
}

#[derive(Serialize)]
struct DailyHitsOut {
    name: String,
    #[serde(rename = "dateStats")]
    date_stats: NaiveDate,
    hits: i64,
}

impl From<DailyHits> for DailyHitsOut {
    fn from(row: DailyHits) -> Self {
        DailyHitsOut {
            name: row.name,
            date_stats: row.date_stats,
            hits: row.hits,
        }
    }
}

pub async fn get_total_schemas(State(state): State<MonitorState>) -> Response {
    match stats::total_schemas(&state.pool).await {
        Ok(rows) => axum::Json(rows.into_iter().map(NameHitsOut::from).collect::<Vec<_>>()).into_response(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct DateRangeQuery {
    #[serde(rename = "dateStart")]
    date_start: Option<NaiveDate>,
    #[serde(rename = "dateEnd")]
    date_end: Option<NaiveDate>,
}

fn resolve_range(query: &DateRangeQuery) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    (query.date_start.unwrap_or(today), query.date_end.unwrap_or(today))
}

pub async fn get_schemas(State(state): State<MonitorState>, Query(query): Query<DateRangeQuery>) -> Response {
    let (start, end) = resolve_range(&query);
    match stats::schemas_in_range(&state.pool, start, end).await {
        Ok(rows) => axum::Json(rows.into_iter().map(DailyHitsOut::from).collect::<Vec<_>>()).into_response(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct TotalSoftwaresQuery {
    #[serde(rename = "maxDays")]
    max_days: Option<String>,
}

/// Preserves the original's `int(maxDays) - 1` window exactly (default
/// `maxDays` is `"31"`, so the default window is 30 days back from today).
fn effective_max_days(max_days_param: Option<&str>) -> Result<i64, ()> {
    max_days_param
        .unwrap_or("31")
        .parse::<i64>()
        .map(|n| n - 1)
        .map_err(|_| ())
}

pub async fn get_total_softwares(
    State(state): State<MonitorState>,
    Query(query): Query<TotalSoftwaresQuery>,
) -> Response {
    let max_days = match effective_max_days(query.max_days.as_deref()) {
        Ok(n) => n,
        Err(()) => return bad_request("invalid maxDays"),
    };
    match stats::total_softwares(&state.pool, max_days).await {
        Ok(rows) => axum::Json(rows.into_iter().map(NameHitsOut::from).collect::<Vec<_>>()).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn get_softwares(State(state): State<MonitorState>, Query(query): Query<DateRangeQuery>) -> Response {
    let (start, end) = resolve_range(&query);
    match stats::softwares_in_range(&state.pool, start, end).await {
        Ok(rows) => axum::Json(rows.into_iter().map(DailyHitsOut::from).collect::<Vec<_>>()).into_response(),
        Err(e) => db_error(e),
    }
}

fn db_error(e: sqlx::Error) -> Response {
    tracing::error!(error = %e, "monitor query failed");
    internal_error("database error")
}
