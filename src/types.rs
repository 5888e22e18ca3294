// =============================================================================
// Request parameter types shared across the market-pulse API
// =============================================================================

use std::str::FromStr;

/// Lookback window for a historical price request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    Max,
}

impl Period {
    pub const ALL: [Period; 9] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::Max,
    ];

    /// Provider query-string form, e.g. `1mo`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!("Invalid period '{s}'. Use one of: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, max")
            })
    }
}

/// Sampling granularity for a historical price request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    NinetyMinutes,
    OneHour,
    OneDay,
    FiveDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Self::OneMinute,
        Self::TwoMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::SixtyMinutes,
        Self::NinetyMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::FiveDays,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::SixtyMinutes => "60m",
            Self::NinetyMinutes => "90m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
        }
    }

    /// Daily-or-coarser bars are stamped at local midnight.
    pub fn is_daily_or_coarser(&self) -> bool {
        matches!(
            self,
            Self::OneDay | Self::FiveDays | Self::OneWeek | Self::OneMonth | Self::ThreeMonths
        )
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid interval '{s}'. Use one of: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo"
                )
            })
    }
}

/// Target file format of the export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err("Invalid format. Use csv or json".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_every_enumerated_value() {
        for p in Period::ALL {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert_eq!("1mo".parse::<Period>().unwrap(), Period::OneMonth);
    }

    #[test]
    fn period_rejects_unknown() {
        assert!("2d".parse::<Period>().is_err());
        assert!("1MO".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn interval_parses_and_rejects() {
        for i in Interval::ALL {
            assert_eq!(i.to_string().parse::<Interval>().unwrap(), i);
        }
        let err = "4h".parse::<Interval>().unwrap_err();
        assert!(err.contains("4h"));
    }

    #[test]
    fn interval_granularity() {
        assert!(Interval::OneDay.is_daily_or_coarser());
        assert!(Interval::OneWeek.is_daily_or_coarser());
        assert!(!Interval::OneHour.is_daily_or_coarser());
        assert!(!Interval::NinetyMinutes.is_daily_or_coarser());
    }

    #[test]
    fn export_format_is_case_insensitive() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("Json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(
            "xml".parse::<ExportFormat>().unwrap_err(),
            "Invalid format. Use csv or json"
        );
    }
}
