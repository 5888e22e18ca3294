// =============================================================================
// Server Configuration — JSON file with environment overrides
// =============================================================================
//
// All fields carry `#[serde(default)]` so that a partial (or empty) config
// file still deserialises. The ticker and index lists are the only "static"
// data the service has; they live here instead of in globals.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_trending_tickers() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "AMD", "NFLX", "DIS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_market_indices() -> Vec<IndexSpec> {
    [
        ("^GSPC", "S&P 500"),
        ("^DJI", "Dow Jones"),
        ("^IXIC", "NASDAQ"),
        ("^RUT", "Russell 2000"),
    ]
    .into_iter()
    .map(|(symbol, name)| IndexSpec {
        symbol: symbol.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_cookie_url() -> String {
    "https://fc.yahoo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

// =============================================================================
// IndexSpec
// =============================================================================

/// A market index tracked by `/api/indices`, with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexSpec {
    pub symbol: String,
    pub name: String,
}

// =============================================================================
// ProviderConfig
// =============================================================================

/// Where and how to reach the upstream market-data provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Root of the chart / quoteSummary / getcrumb endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page that hands out the session cookie used for crumb auth.
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,

    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_url: default_cookie_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Top-level configuration for the market-pulse server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Tickers polled by `/api/trending` and `/api/gainers-losers`, in
    /// response order.
    #[serde(default = "default_trending_tickers")]
    pub trending_tickers: Vec<String>,

    /// Indices polled by `/api/indices`, in response order.
    #[serde(default = "default_market_indices")]
    pub market_indices: Vec<IndexSpec>,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trending_tickers: default_trending_tickers(),
            market_indices: default_market_indices(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error; the caller decides whether to fall back
    /// to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            tickers = config.trending_tickers.len(),
            indices = config.market_indices.len(),
            "server config loaded"
        );

        Ok(config)
    }

    /// Apply `MARKET_PULSE_*` environment overrides on top of the loaded
    /// values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("MARKET_PULSE_BIND_ADDR").ok(),
            std::env::var("MARKET_PULSE_TICKERS").ok(),
        );
    }

    fn apply_overrides(&mut self, bind_addr: Option<String>, tickers: Option<String>) {
        if let Some(addr) = bind_addr.filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(syms) = tickers {
            let parsed: Vec<String> = syms
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.trending_tickers = parsed;
            }
        }
    }
}
