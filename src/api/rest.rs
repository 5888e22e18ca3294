// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/` and are read-only GETs. Multi-ticker
// endpoints (trending, indices, gainers-losers) skip symbols that fail and
// log a warning; single-ticker endpoints answer with `{"error": ...}` and an
// error status.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::config::IndexSpec;
use crate::history::{export_bars, history_series, HistorySeries};
use crate::quotes::{
    index_snapshot, last_two_closes, mover, quote_snapshot, rank_movers, stock_detail,
    GainersLosers, IndexSnapshot, Mover, QuoteSnapshot, SearchResult, StockDetail,
};
use crate::types::{ExportFormat, Interval, Period};

/// Lookback used for day-over-day change; the last two daily bars are used.
const RECENT_PERIOD: Period = Period::FiveDays;

/// Entries per side of `/api/gainers-losers`.
const MOVERS_LIMIT: usize = 5;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/trending", get(trending))
        .route("/api/indices", get(indices))
        .route("/api/stock/:ticker", get(stock_info))
        .route("/api/stock/:ticker/history", get(stock_history))
        .route("/api/stock/:ticker/export/:format", get(export_stock))
        .route("/api/search/:query", get(search))
        .route("/api/gainers-losers", get(gainers_losers))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Trending
// =============================================================================

async fn trending(State(state): State<Arc<AppState>>) -> Json<Vec<QuoteSnapshot>> {
    let tickers = &state.config.trending_tickers;
    let mut snapshots = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        match fetch_quote(&state, ticker).await {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => warn!(symbol = %ticker, error = %format!("{e:#}"), "trending fetch failed — skipping"),
        }
    }

    Json(snapshots)
}

async fn fetch_quote(state: &AppState, ticker: &str) -> anyhow::Result<QuoteSnapshot> {
    let info = state.provider.fetch_info(ticker).await?;
    let bars = state
        .provider
        .fetch_history(ticker, RECENT_PERIOD, Interval::OneDay)
        .await?;
    Ok(quote_snapshot(ticker, &info, &bars))
}

// =============================================================================
// Indices
// =============================================================================

async fn indices(State(state): State<Arc<AppState>>) -> Json<Vec<IndexSnapshot>> {
    let mut snapshots = Vec::with_capacity(state.config.market_indices.len());

    for index in &state.config.market_indices {
        match fetch_index(&state, index).await {
            Ok(Some(snapshot)) => snapshots.push(snapshot),
            Ok(None) => debug!(symbol = %index.symbol, "fewer than two bars — skipping"),
            Err(e) => warn!(symbol = %index.symbol, error = %format!("{e:#}"), "index fetch failed — skipping"),
        }
    }

    Json(snapshots)
}

async fn fetch_index(state: &AppState, index: &IndexSpec) -> anyhow::Result<Option<IndexSnapshot>> {
    let bars = state
        .provider
        .fetch_history(&index.symbol, RECENT_PERIOD, Interval::OneDay)
        .await?;
    Ok(index_snapshot(index, &bars))
}

// =============================================================================
// Single-ticker detail
// =============================================================================

async fn stock_info(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<StockDetail>, ApiError> {
    let ticker = ticker.to_uppercase();

    let info = state
        .provider
        .fetch_info(&ticker)
        .await
        .map_err(|e| ApiError::not_found(&e))?;
    let bars = state
        .provider
        .fetch_history(&ticker, Period::OneDay, Interval::OneDay)
        .await
        .map_err(|e| ApiError::not_found(&e))?;

    Ok(Json(stock_detail(&ticker, &info, &bars)))
}

// =============================================================================
// Historical series
// =============================================================================

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    period: Option<String>,
    interval: Option<String>,
}

async fn stock_history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistorySeries>, ApiError> {
    let ticker = ticker.to_uppercase();
    let period = parse_period(q.period.as_deref(), Period::OneMonth)?;
    let interval = match q.interval.as_deref() {
        Some(raw) => raw.parse::<Interval>().map_err(ApiError::BadRequest)?,
        None => Interval::OneDay,
    };

    let bars = state
        .provider
        .fetch_history(&ticker, period, interval)
        .await
        .map_err(|e| ApiError::internal(&e))?;

    Ok(Json(history_series(&bars)))
}

fn parse_period(raw: Option<&str>, default: Period) -> Result<Period, ApiError> {
    match raw {
        Some(raw) => raw.parse::<Period>().map_err(ApiError::BadRequest),
        None => Ok(default),
    }
}

// =============================================================================
// Export
// =============================================================================

#[derive(Debug, Deserialize)]
struct ExportQuery {
    period: Option<String>,
}

async fn export_stock(
    State(state): State<Arc<AppState>>,
    Path((ticker, format)): Path<(String, String)>,
    Query(q): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let ticker = ticker.to_uppercase();
    let format = format.parse::<ExportFormat>().map_err(ApiError::BadRequest)?;
    let period = parse_period(q.period.as_deref(), Period::OneYear)?;

    let bars = state
        .provider
        .fetch_history(&ticker, period, Interval::OneDay)
        .await
        .map_err(|e| ApiError::internal(&e))?;
    let file = export_bars(&ticker, format, &bars).map_err(|e| ApiError::internal(&e))?;

    info!(symbol = %ticker, file = %file.filename, rows = bars.len(), "export generated");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.body,
    )
        .into_response())
}

// =============================================================================
// Search
// =============================================================================

async fn search(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Json<SearchResult> {
    let ticker = query.to_uppercase();
    match state.provider.fetch_info(&ticker).await {
        Ok(info) => Json(SearchResult::from_info(&ticker, &info)),
        Err(e) => {
            debug!(symbol = %ticker, error = %format!("{e:#}"), "search lookup failed");
            Json(SearchResult::not_found(Some(format!("{e:#}"))))
        }
    }
}

// =============================================================================
// Gainers / losers
// =============================================================================

async fn gainers_losers(State(state): State<Arc<AppState>>) -> Json<GainersLosers> {
    let tickers = &state.config.trending_tickers;
    let mut movers = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        match fetch_mover(&state, ticker).await {
            Ok(Some(m)) => movers.push(m),
            Ok(None) => debug!(symbol = %ticker, "fewer than two bars — skipping"),
            Err(e) => warn!(symbol = %ticker, error = %format!("{e:#}"), "mover fetch failed — skipping"),
        }
    }

    Json(rank_movers(movers, MOVERS_LIMIT))
}

async fn fetch_mover(state: &AppState, ticker: &str) -> anyhow::Result<Option<Mover>> {
    let bars = state
        .provider
        .fetch_history(ticker, RECENT_PERIOD, Interval::OneDay)
        .await?;
    if last_two_closes(&bars).is_none() {
        return Ok(None);
    }
    let info = state.provider.fetch_info(ticker).await?;
    Ok(mover(ticker, &info, &bars))
}

// =============================================================================
// Tests
// =============================================================================
