//! Yahoo Finance wire models for the chart and quoteSummary endpoints.
//!
//! Numeric quoteSummary fields arrive as `{"raw": 1.23, "fmt": "1.23"}` or as
//! an empty object when Yahoo has no value; both deserialize into
//! [`RawValue`].

use std::collections::HashMap;

use serde::Deserialize;

use super::TickerInfo;

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Error object carried by both endpoints on failure.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("Error"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawValue {
    pub raw: Option<f64>,
}

fn raw(v: &Option<RawValue>) -> Option<f64> {
    v.as_ref().and_then(|r| r.raw)
}

fn raw_u64(v: &Option<RawValue>) -> Option<u64> {
    raw(v).filter(|n| *n >= 0.0).map(|n| n as u64)
}

// ---------------------------------------------------------------------------
// /v8/finance/chart
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    /// Absent when the range holds no trading periods.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub events: Option<ChartEvents>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    /// IANA zone of the listing exchange, e.g. `America/New_York`.
    #[serde(default, rename = "exchangeTimezoneName")]
    pub exchange_timezone_name: Option<String>,
    /// Exchange offset from UTC in seconds at request time.
    #[serde(default)]
    pub gmtoffset: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChartEvents {
    #[serde(default)]
    pub dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    pub splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
pub struct DividendEvent {
    pub amount: f64,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct SplitEvent {
    pub date: i64,
    pub numerator: f64,
    pub denominator: f64,
}

impl SplitEvent {
    /// Shares after per share before, e.g. 4.0 for a 4:1 split.
    pub fn ratio(&self) -> f64 {
        if self.denominator == 0.0 {
            0.0
        } else {
            self.numerator / self.denominator
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

/// Column-oriented OHLCV; `null` marks a missing period.
#[derive(Debug, Deserialize, Default)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// /v10/finance/quoteSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResponse {
    pub quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryEnvelope {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub price: Option<PriceModule>,
    pub summary_detail: Option<SummaryDetailModule>,
    pub summary_profile: Option<SummaryProfileModule>,
    pub financial_data: Option<FinancialDataModule>,
    pub default_key_statistics: Option<KeyStatisticsModule>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceModule {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<RawValue>,
    pub regular_market_previous_close: Option<RawValue>,
    pub regular_market_open: Option<RawValue>,
    pub regular_market_day_high: Option<RawValue>,
    pub regular_market_day_low: Option<RawValue>,
    pub regular_market_volume: Option<RawValue>,
    pub market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetailModule {
    pub previous_close: Option<RawValue>,
    pub open: Option<RawValue>,
    pub day_high: Option<RawValue>,
    pub day_low: Option<RawValue>,
    pub volume: Option<RawValue>,
    pub market_cap: Option<RawValue>,
    pub fifty_two_week_high: Option<RawValue>,
    pub fifty_two_week_low: Option<RawValue>,
    pub dividend_yield: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<RawValue>,
    pub beta: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryProfileModule {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub long_business_summary: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FinancialDataModule {
    pub current_price: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
pub struct KeyStatisticsModule {
    pub beta: Option<RawValue>,
}

impl QuoteSummaryResult {
    /// Flatten the module tree into [`TickerInfo`], preferring the
    /// summaryDetail / financialData figures and falling back to the price
    /// module.
    pub fn into_ticker_info(self) -> TickerInfo {
        let price = self.price.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let profile = self.summary_profile.unwrap_or_default();
        let financial = self.financial_data.unwrap_or_default();
        let stats = self.default_key_statistics.unwrap_or_default();

        TickerInfo {
            symbol: price.symbol.filter(|s| !s.is_empty()),
            long_name: price.long_name.filter(|s| !s.is_empty()),
            sector: profile.sector.filter(|s| !s.is_empty()),
            industry: profile.industry.filter(|s| !s.is_empty()),
            current_price: raw(&financial.current_price).or(raw(&price.regular_market_price)),
            previous_close: raw(&detail.previous_close)
                .or(raw(&price.regular_market_previous_close)),
            open: raw(&detail.open).or(raw(&price.regular_market_open)),
            day_high: raw(&detail.day_high).or(raw(&price.regular_market_day_high)),
            day_low: raw(&detail.day_low).or(raw(&price.regular_market_day_low)),
            volume: raw_u64(&detail.volume).or(raw_u64(&price.regular_market_volume)),
            market_cap: raw_u64(&detail.market_cap).or(raw_u64(&price.market_cap)),
            fifty_two_week_high: raw(&detail.fifty_two_week_high),
            fifty_two_week_low: raw(&detail.fifty_two_week_low),
            dividend_yield: raw(&detail.dividend_yield),
            trailing_pe: raw(&detail.trailing_pe),
            beta: raw(&detail.beta).or(raw(&stats.beta)),
            long_business_summary: profile.long_business_summary.filter(|s| !s.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_value_accepts_empty_object() {
        let v: RawValue = serde_json::from_str("{}").unwrap();
        assert_eq!(v.raw, None);
        let v: RawValue = serde_json::from_str(r#"{"raw": 1.5, "fmt": "1.50"}"#).unwrap();
        assert_eq!(v.raw, Some(1.5));
    }

    #[test]
    fn chart_error_envelope_parses() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(resp.chart.result.is_none());
        let err = resp.chart.error.unwrap();
        assert_eq!(err.to_string(), "Not Found: No data found, symbol may be delisted");
    }

    #[test]
    fn chart_without_timestamps_defaults_to_empty() {
        let json = r#"{"chart":{"result":[{"meta":{"symbol":"X","gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let result = &resp.chart.result.unwrap()[0];
        assert!(result.meta.exchange_timezone_name.is_none());
        assert!(result.timestamp.is_empty());
        assert!(result.indicators.quote[0].close.is_empty());
    }

    #[test]
    fn split_ratio_guards_zero_denominator() {
        let s = SplitEvent { date: 0, numerator: 4.0, denominator: 1.0 };
        assert_eq!(s.ratio(), 4.0);
        let s = SplitEvent { date: 0, numerator: 4.0, denominator: 0.0 };
        assert_eq!(s.ratio(), 0.0);
    }

    #[test]
    fn quote_summary_maps_with_fallbacks() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {
                        "symbol": "AAPL",
                        "longName": "Apple Inc.",
                        "regularMarketPrice": {"raw": 190.5},
                        "regularMarketPreviousClose": {"raw": 188.0},
                        "regularMarketVolume": {"raw": 51000000},
                        "marketCap": {"raw": 2950000000000}
                    },
                    "summaryDetail": {
                        "previousClose": {"raw": 187.9},
                        "open": {},
                        "fiftyTwoWeekHigh": {"raw": 199.62},
                        "fiftyTwoWeekLow": {"raw": 164.08},
                        "dividendYield": {"raw": 0.0051},
                        "trailingPE": {"raw": 29.7}
                    },
                    "summaryProfile": {
                        "sector": "Technology",
                        "industry": "Consumer Electronics",
                        "longBusinessSummary": "Designs phones."
                    },
                    "defaultKeyStatistics": {"beta": {"raw": 1.29}}
                }],
                "error": null
            }
        }"#;
        let resp: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let info = resp
            .quote_summary
            .result
            .unwrap()
            .remove(0)
            .into_ticker_info();

        assert_eq!(info.symbol.as_deref(), Some("AAPL"));
        assert_eq!(info.long_name.as_deref(), Some("Apple Inc."));
        // no financialData: falls back to regularMarketPrice
        assert_eq!(info.current_price, Some(190.5));
        assert_eq!(info.previous_close, Some(187.9));
        // empty summaryDetail.open and no regularMarketOpen
        assert_eq!(info.open, None);
        assert_eq!(info.volume, Some(51_000_000));
        assert_eq!(info.market_cap, Some(2_950_000_000_000));
        assert_eq!(info.trailing_pe, Some(29.7));
        assert_eq!(info.beta, Some(1.29));
        assert_eq!(info.sector.as_deref(), Some("Technology"));
        assert_eq!(info.long_business_summary.as_deref(), Some("Designs phones."));
    }

    #[test]
    fn empty_result_maps_to_all_none() {
        let info = QuoteSummaryResult::default().into_ticker_info();
        assert_eq!(info, TickerInfo::default());
    }
}
