// =============================================================================
// Quote derivation — price change math, snapshots, movers ranking, detail
// =============================================================================
//
// Everything here is pure: handlers fetch from the provider and hand the
// results to these functions, which apply the fallback/default rules and
// produce the wire shapes (camelCase JSON).
// =============================================================================

use serde::Serialize;

use crate::config::IndexSpec;
use crate::provider::{PriceBar, TickerInfo};

/// Round half away from zero to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Change math
// ---------------------------------------------------------------------------

/// Absolute and percent change of `current` against `previous`, rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    pub change: f64,
    pub change_percent: f64,
}

/// Both figures are 0 when `previous` is 0 (or not a number).
pub fn price_change(current: f64, previous: f64) -> PriceChange {
    if previous == 0.0 || !previous.is_finite() {
        return PriceChange {
            change: 0.0,
            change_percent: 0.0,
        };
    }
    let change = current - previous;
    PriceChange {
        change: round2(change),
        change_percent: round2(change / previous * 100.0),
    }
}

/// `(last close, second-to-last close)` when at least two bars exist.
pub fn last_two_closes(bars: &[PriceBar]) -> Option<(f64, f64)> {
    match bars {
        [.., prev, last] => Some((last.close, prev.close)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Trending
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: u64,
}

/// Snapshot from the last two closes, or from `info` when fewer than two
/// bars exist (current defaults to 0, previous to current).
pub fn quote_snapshot(ticker: &str, info: &TickerInfo, bars: &[PriceBar]) -> QuoteSnapshot {
    let (current, previous) = last_two_closes(bars).unwrap_or_else(|| {
        let current = info.current_price.unwrap_or(0.0);
        (current, info.previous_close.unwrap_or(current))
    });
    let PriceChange {
        change,
        change_percent,
    } = price_change(current, previous);

    QuoteSnapshot {
        ticker: ticker.to_string(),
        name: display_name(ticker, info),
        price: round2(current),
        change,
        change_percent,
        volume: info.volume.unwrap_or(0),
        market_cap: info.market_cap.unwrap_or(0),
    }
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// `None` when fewer than two bars exist; indices have no fallback.
pub fn index_snapshot(index: &IndexSpec, bars: &[PriceBar]) -> Option<IndexSnapshot> {
    let (current, previous) = last_two_closes(bars)?;
    let PriceChange {
        change,
        change_percent,
    } = price_change(current, previous);
    Some(IndexSnapshot {
        symbol: index.symbol.clone(),
        name: index.name.clone(),
        price: round2(current),
        change,
        change_percent,
    })
}

// ---------------------------------------------------------------------------
// Gainers / losers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mover {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

pub fn mover(ticker: &str, info: &TickerInfo, bars: &[PriceBar]) -> Option<Mover> {
    let (current, previous) = last_two_closes(bars)?;
    let PriceChange {
        change,
        change_percent,
    } = price_change(current, previous);
    Some(Mover {
        ticker: ticker.to_string(),
        name: display_name(ticker, info),
        price: round2(current),
        change,
        change_percent,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GainersLosers {
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

/// Top `limit` by percent change in each direction. Both sorts are stable,
/// so equal values keep fetch order.
pub fn rank_movers(movers: Vec<Mover>, limit: usize) -> GainersLosers {
    let mut descending = movers;
    descending.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));

    let mut ascending = descending.clone();
    ascending.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));

    descending.truncate(limit);
    ascending.truncate(limit);
    GainersLosers {
        gainers: descending,
        losers: ascending,
    }
}

// ---------------------------------------------------------------------------
// Single-ticker detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: u64,
    pub market_cap: u64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub dividend_yield: f64,
    pub pe_ratio: f64,
    pub beta: f64,
    pub description: String,
}

const NOT_AVAILABLE: &str = "N/A";
const NO_DESCRIPTION: &str = "No description available";

/// `bars` is the most recent day's history; its last close wins over the
/// metadata price.
pub fn stock_detail(ticker: &str, info: &TickerInfo, bars: &[PriceBar]) -> StockDetail {
    let current_price = round2(
        bars.last()
            .map(|b| b.close)
            .or(info.current_price)
            .unwrap_or(0.0),
    );
    let previous_close = info.previous_close.unwrap_or(0.0);
    let PriceChange {
        change,
        change_percent,
    } = price_change(current_price, previous_close);

    StockDetail {
        ticker: ticker.to_string(),
        name: display_name(ticker, info),
        sector: or_not_available(&info.sector),
        industry: or_not_available(&info.industry),
        current_price,
        previous_close,
        change,
        change_percent,
        open: info.open.unwrap_or(0.0),
        day_high: info.day_high.unwrap_or(0.0),
        day_low: info.day_low.unwrap_or(0.0),
        volume: info.volume.unwrap_or(0),
        market_cap: info.market_cap.unwrap_or(0),
        fifty_two_week_high: info.fifty_two_week_high.unwrap_or(0.0),
        fifty_two_week_low: info.fifty_two_week_low.unwrap_or(0.0),
        dividend_yield: info.dividend_yield.unwrap_or(0.0),
        pe_ratio: info.trailing_pe.unwrap_or(0.0),
        beta: info.beta.unwrap_or(0.0),
        description: info
            .long_business_summary
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    /// Found iff the metadata carries a symbol or a long name.
    pub fn from_info(ticker: &str, info: &TickerInfo) -> Self {
        if info.symbol.is_none() && info.long_name.is_none() {
            return Self::not_found(None);
        }
        Self {
            found: true,
            ticker: Some(ticker.to_string()),
            name: Some(display_name(ticker, info)),
            sector: Some(or_not_available(&info.sector)),
            industry: Some(or_not_available(&info.industry)),
            error: None,
        }
    }

    pub fn not_found(error: Option<String>) -> Self {
        Self {
            found: false,
            ticker: None,
            name: None,
            sector: None,
            industry: None,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn display_name(ticker: &str, info: &TickerInfo) -> String {
    info.long_name.clone().unwrap_or_else(|| ticker.to_string())
}

fn or_not_available(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
