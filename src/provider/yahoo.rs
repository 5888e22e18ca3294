// =============================================================================
// Yahoo Finance REST client — chart history + quoteSummary metadata
// =============================================================================
//
// quoteSummary requires a session cookie plus a "crumb" token. Both are
// fetched lazily on first use and cached for the life of the process; a 401
// clears the cache so the next request re-authenticates. Nothing is retried
// within a single call.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use chrono_tz::Tz;
use parking_lot::RwLock;
use reqwest::header;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

use super::models::{ChartMeta, ChartResponse, ChartResult, QuoteSummaryResponse};
use super::{MarketDataProvider, PriceBar, TickerInfo};
use crate::config::ProviderConfig;
use crate::types::{Interval, Period};

/// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const SUMMARY_MODULES: &str =
    "price,summaryDetail,summaryProfile,financialData,defaultKeyStatistics";

/// Cookie + crumb pair authorising quoteSummary calls.
#[derive(Debug, Clone)]
struct Crumb {
    cookie: String,
    value: String,
}

/// Yahoo Finance client.
pub struct YahooClient {
    base_url: String,
    cookie_url: String,
    client: reqwest::Client,
    crumb: RwLock<Option<Crumb>>,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %config.base_url, "YahooClient initialised");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            client,
            crumb: RwLock::new(None),
        })
    }

    // -------------------------------------------------------------------------
    // Crumb authentication
    // -------------------------------------------------------------------------

    async fn ensure_crumb(&self) -> Result<Crumb> {
        if let Some(crumb) = self.crumb.read().clone() {
            return Ok(crumb);
        }
        let crumb = self.fetch_crumb().await?;
        *self.crumb.write() = Some(crumb.clone());
        Ok(crumb)
    }

    #[instrument(skip(self), name = "yahoo::fetch_crumb")]
    async fn fetch_crumb(&self) -> Result<Crumb> {
        // The cookie page answers 404 but still sets the session cookie.
        let resp = self
            .client
            .get(&self.cookie_url)
            .send()
            .await
            .context("cookie request failed")?;

        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(';').next())
            .map(str::to_string)
            .filter(|c| !c.is_empty())
            .context("cookie response carried no Set-Cookie header")?;

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .context("GET /v1/test/getcrumb request failed")?;

        let status = resp.status();
        let value = resp.text().await.context("failed to read crumb body")?;

        if !status.is_success() || value.trim().is_empty() {
            anyhow::bail!("Yahoo GET /v1/test/getcrumb returned {}: {}", status, value);
        }

        debug!("crumb acquired");
        Ok(Crumb {
            cookie,
            value: value.trim().to_string(),
        })
    }

    fn clear_crumb(&self) {
        *self.crumb.write() = None;
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    /// GET /v10/finance/quoteSummary/{symbol}.
    #[instrument(skip(self), name = "yahoo::get_quote_summary")]
    pub async fn get_quote_summary(&self, symbol: &str) -> Result<TickerInfo> {
        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            self.base_url,
            encode(symbol),
            SUMMARY_MODULES,
            encode(&crumb.value)
        );

        let resp = self
            .client
            .get(&url)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .context("GET /v10/finance/quoteSummary request failed")?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_crumb();
            warn!(symbol, "quoteSummary rejected crumb; cleared for next request");
            anyhow::bail!("Yahoo authentication expired");
        }

        let body: QuoteSummaryResponse = resp
            .json()
            .await
            .with_context(|| format!("failed to parse quoteSummary response ({status})"))?;

        if let Some(err) = body.quote_summary.error {
            anyhow::bail!("Yahoo quoteSummary for {symbol} failed: {err}");
        }

        let result = body
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .with_context(|| format!("quoteSummary returned no result for {symbol}"))?;

        debug!(symbol, "quote summary retrieved");
        Ok(result.into_ticker_info())
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol} (no auth required).
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&events=div,splits&includePrePost=false",
            self.base_url,
            encode(symbol),
            period,
            interval
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: ChartResponse = resp
            .json()
            .await
            .with_context(|| format!("failed to parse chart response ({status})"))?;

        if let Some(err) = body.chart.error {
            anyhow::bail!("Yahoo chart for {symbol} failed: {err}");
        }

        let result = body
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .with_context(|| format!("chart returned no result for {symbol}"))?;

        let bars = bars_from_chart(result, interval)?;
        debug!(symbol, %period, %interval, count = bars.len(), "chart fetched");
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_info(&self, symbol: &str) -> Result<TickerInfo> {
        self.get_quote_summary(symbol).await
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>> {
        self.get_chart(symbol, period, interval).await
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .field("cookie_url", &self.cookie_url)
            .field("crumb", &"<redacted>")
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Chart → bars
// -----------------------------------------------------------------------------

/// Clock of the listing exchange. The named zone carries DST history; the
/// fixed offset is only Yahoo's `gmtoffset` at request time.
#[derive(Debug, Clone, Copy)]
enum ExchangeClock {
    Zone(Tz),
    Fixed(FixedOffset),
}

impl ExchangeClock {
    fn from_meta(meta: &ChartMeta) -> Result<Self> {
        if let Some(name) = meta.exchange_timezone_name.as_deref() {
            match name.parse::<Tz>() {
                Ok(tz) => return Ok(Self::Zone(tz)),
                Err(_) => warn!(zone = name, "unknown exchange time zone — using gmtoffset"),
            }
        }
        FixedOffset::east_opt(meta.gmtoffset)
            .map(Self::Fixed)
            .with_context(|| format!("invalid gmtoffset {}", meta.gmtoffset))
    }

    /// Stamp a Unix timestamp in exchange-local time; daily-or-coarser bars
    /// are pinned to local midnight.
    fn bar_time(&self, ts: i64, daily: bool) -> Option<DateTime<FixedOffset>> {
        let utc = DateTime::from_timestamp(ts, 0)?;
        match self {
            Self::Zone(tz) => pin_to_day(utc.with_timezone(tz), daily),
            Self::Fixed(offset) => pin_to_day(utc.with_timezone(offset), daily),
        }
    }
}

fn pin_to_day<Z: TimeZone>(local: DateTime<Z>, daily: bool) -> Option<DateTime<FixedOffset>> {
    if !daily {
        return Some(local.fixed_offset());
    }
    let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
    match local.timezone().from_local_datetime(&midnight).earliest() {
        Some(t) => Some(t.fixed_offset()),
        // midnight skipped by a DST jump: keep the day at the bar's own offset
        None => midnight.and_local_timezone(local.offset().fix()).single(),
    }
}

/// Turn the column-oriented chart payload into chronological bars.
///
/// Periods without a close are dropped. When two periods land on the same
/// stamp (Yahoo appends the live session to daily ranges) the later one wins.
fn bars_from_chart(result: ChartResult, interval: Interval) -> Result<Vec<PriceBar>> {
    let clock = ExchangeClock::from_meta(&result.meta)?;
    let daily = interval.is_daily_or_coarser();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let events = result.events.unwrap_or_default();

    let mut dividends: HashMap<DateTime<FixedOffset>, f64> = HashMap::new();
    for ev in events.dividends.values() {
        if let Some(t) = clock.bar_time(ev.date, daily) {
            *dividends.entry(t).or_default() += ev.amount;
        }
    }
    let mut splits: HashMap<DateTime<FixedOffset>, f64> = HashMap::new();
    for ev in events.splits.values() {
        if let Some(t) = clock.bar_time(ev.date, daily) {
            splits.insert(t, ev.ratio());
        }
    }

    let column = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = column(&quote.close, i) else {
            continue;
        };
        let Some(timestamp) = clock.bar_time(ts, daily) else {
            warn!(ts, "skipping bar with out-of-range timestamp");
            continue;
        };
        bars.push(PriceBar {
            timestamp,
            open: column(&quote.open, i).unwrap_or(close),
            high: column(&quote.high, i).unwrap_or(close),
            low: column(&quote.low, i).unwrap_or(close),
            close,
            volume: column(&quote.volume, i).map_or(0, |v| v.max(0.0) as u64),
            dividends: dividends.get(&timestamp).copied().unwrap_or(0.0),
            stock_splits: splits.get(&timestamp).copied().unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => deduped.push(bar),
        }
    }
    Ok(deduped)
}
