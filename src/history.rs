// =============================================================================
// Historical series — chart views and file export
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;

use crate::provider::PriceBar;
use crate::quotes::round2;
use crate::types::ExportFormat;

const DATE_FORMAT: &str = "%Y-%m-%d";
const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";
const JSON_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Chart views
// ---------------------------------------------------------------------------

/// One candlestick point, keyed the way charting front-ends expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcPoint {
    pub x: String,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
}

/// Three parallel views of the same bars: `dates[i]`, `prices[i]` and
/// `ohlc[i]` always describe the same period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub ohlc: Vec<OhlcPoint>,
}

pub fn history_series(bars: &[PriceBar]) -> HistorySeries {
    let mut series = HistorySeries {
        dates: Vec::with_capacity(bars.len()),
        prices: Vec::with_capacity(bars.len()),
        ohlc: Vec::with_capacity(bars.len()),
    };
    for bar in bars {
        let date = bar.timestamp.format(DATE_FORMAT).to_string();
        let close = round2(bar.close);
        series.prices.push(close);
        series.ohlc.push(OhlcPoint {
            x: date.clone(),
            o: round2(bar.open),
            h: round2(bar.high),
            l: round2(bar.low),
            c: close,
        });
        series.dates.push(date);
    }
    series
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ExportRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: u64,
    #[serde(rename = "Dividends")]
    dividends: f64,
    #[serde(rename = "Stock Splits")]
    stock_splits: f64,
}

impl ExportRow {
    fn new(bar: &PriceBar, timestamp_format: &str) -> Self {
        Self {
            date: bar.timestamp.format(timestamp_format).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            dividends: bar.dividends,
            stock_splits: bar.stock_splits,
        }
    }
}

/// A rendered download: body plus the headers needed to serve it.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Serialize the full table for download. Values are not rounded.
pub fn export_bars(ticker: &str, format: ExportFormat, bars: &[PriceBar]) -> Result<ExportFile> {
    let body = match format {
        ExportFormat::Csv => to_csv(bars)?,
        ExportFormat::Json => to_json(bars)?,
    };
    Ok(ExportFile {
        filename: format!("{}_data.{}", ticker, format.extension()),
        content_type: format.mime_type(),
        body,
    })
}

fn to_csv(bars: &[PriceBar]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if bars.is_empty() {
        // serde only emits the header alongside the first row
        wtr.write_record([
            "Date", "Open", "High", "Low", "Close", "Volume", "Dividends", "Stock Splits",
        ])?;
    }
    for bar in bars {
        wtr.serialize(ExportRow::new(bar, CSV_TIMESTAMP_FORMAT))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV buffer: {}", e.error()))
}

fn to_json(bars: &[PriceBar]) -> Result<Vec<u8>> {
    let rows: Vec<ExportRow> = bars
        .iter()
        .map(|b| ExportRow::new(b, JSON_TIMESTAMP_FORMAT))
        .collect();
    serde_json::to_vec_pretty(&rows).context("failed to serialise export JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::daily_bars;

    #[test]
    fn series_views_are_parallel() {
        let bars = daily_bars(&[101.234, 99.999, 102.5]);
        let s = history_series(&bars);
        assert_eq!(s.dates.len(), 3);
        assert_eq!(s.prices.len(), s.dates.len());
        assert_eq!(s.ohlc.len(), s.dates.len());
        for (i, point) in s.ohlc.iter().enumerate() {
            assert_eq!(point.c, s.prices[i]);
            assert_eq!(point.x, s.dates[i]);
        }
        assert_eq!(s.prices, vec![101.23, 100.0, 102.5]);
        assert_eq!(s.ohlc[0].h, 103.23);
    }

    #[test]
    fn series_dates_are_increasing_iso_days() {
        let s = history_series(&daily_bars(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(s.dates[0], "2024-03-01");
        assert_eq!(s.dates[3], "2024-03-04");
        assert!(s.dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_series() {
        let s = history_series(&[]);
        assert!(s.dates.is_empty() && s.prices.is_empty() && s.ohlc.is_empty());
    }

    #[test]
    fn csv_export_has_index_column_and_offset() {
        let file = export_bars("AAPL", ExportFormat::Csv, &daily_bars(&[10.5, 11.0])).unwrap();
        assert_eq!(file.filename, "AAPL_data.csv");
        assert_eq!(file.content_type, "text/csv");

        let text = String::from_utf8(file.body).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Open,High,Low,Close,Volume,Dividends,Stock Splits"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-01 00:00:00-05:00,9.5,12.5,8.5,10.5,1000,0.0,0.0"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn csv_export_of_empty_table_keeps_header() {
        let file = export_bars("X", ExportFormat::Csv, &[]).unwrap();
        assert_eq!(
            String::from_utf8(file.body).unwrap(),
            "Date,Open,High,Low,Close,Volume,Dividends,Stock Splits\n"
        );
    }

    #[test]
    fn json_export_reformats_date() {
        let file = export_bars("MSFT", ExportFormat::Json, &daily_bars(&[20.0])).unwrap();
        assert_eq!(file.filename, "MSFT_data.json");
        assert_eq!(file.content_type, "application/json");

        let rows: serde_json::Value = serde_json::from_slice(&file.body).unwrap();
        assert_eq!(rows[0]["Date"], "2024-03-01 00:00:00");
        assert_eq!(rows[0]["Close"], 20.0);
        assert_eq!(rows[0]["Stock Splits"], 0.0);
        assert!(String::from_utf8_lossy(&file.body).contains("\n  {"));
    }
}
