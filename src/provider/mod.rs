// =============================================================================
// Market-data provider interface
// =============================================================================
//
// Handlers only ever see `dyn MarketDataProvider`: symbol in, metadata or a
// bar series out. The Yahoo Finance implementation lives in `yahoo`; tests
// swap in the in-memory `stub::StubProvider`.
// =============================================================================

pub mod models;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::types::{Interval, Period};

pub use yahoo::YahooClient;

/// Per-symbol metadata. Every field is optional; consumers apply their own
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerInfo {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<u64>,
    pub market_cap: Option<u64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub beta: Option<f64>,
    pub long_business_summary: Option<String>,
}

/// One period of a historical series, stamped in the exchange's offset.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub dividends: f64,
    pub stock_splits: f64,
}

/// The only seam between the HTTP layer and the upstream provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Metadata lookup for a single symbol.
    async fn fetch_info(&self, symbol: &str) -> Result<TickerInfo>;

    /// Chronologically ordered bars for `symbol`.
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>>;
}

#[cfg(test)]
pub mod stub {
    //! In-memory provider used by handler and derivation tests.

    use std::collections::HashMap;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use parking_lot::Mutex;

    use super::{MarketDataProvider, PriceBar, TickerInfo};
    use crate::types::{Interval, Period};

    #[derive(Default)]
    pub struct StubProvider {
        infos: HashMap<String, TickerInfo>,
        histories: HashMap<String, Vec<PriceBar>>,
        pub history_calls: Mutex<Vec<(String, Period, Interval)>>,
        pub info_calls: Mutex<Vec<String>>,
    }

    impl StubProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_info(mut self, symbol: &str, info: TickerInfo) -> Self {
            self.infos.insert(symbol.to_string(), info);
            self
        }

        /// Daily bars starting 2024-03-01 with the given closes.
        pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
            self.histories
                .insert(symbol.to_string(), daily_bars(closes));
            self
        }
    }

    pub fn named(name: &str) -> TickerInfo {
        TickerInfo {
            symbol: Some(name.to_uppercase()),
            long_name: Some(format!("{name} Inc.")),
            ..TickerInfo::default()
        }
    }

    pub fn daily_bars(closes: &[f64]) -> Vec<PriceBar> {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let day = start + chrono::Duration::days(i as i64);
                PriceBar {
                    timestamp: offset
                        .from_local_datetime(&day.and_hms_opt(0, 0, 0).unwrap())
                        .unwrap(),
                    open: close - 1.0,
                    high: close + 2.0,
                    low: close - 2.0,
                    close,
                    volume: 1_000 * (i as u64 + 1),
                    dividends: 0.0,
                    stock_splits: 0.0,
                }
            })
            .collect()
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        async fn fetch_info(&self, symbol: &str) -> Result<TickerInfo> {
            self.info_calls.lock().push(symbol.to_string());
            match self.infos.get(symbol) {
                Some(info) => Ok(info.clone()),
                None => bail!("no metadata for {symbol}"),
            }
        }

        async fn fetch_history(
            &self,
            symbol: &str,
            period: Period,
            interval: Interval,
        ) -> Result<Vec<PriceBar>> {
            self.history_calls
                .lock()
                .push((symbol.to_string(), period, interval));
            match self.histories.get(symbol) {
                Some(bars) => Ok(bars.clone()),
                None => bail!("no history for {symbol}"),
            }
        }
    }
}
