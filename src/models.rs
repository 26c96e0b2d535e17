//! Data models for the research flow.
//!
//! This module contains the market enumeration, per-ticker outcomes and
//! the aggregated run report.

use crate::error::ScoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stock symbol. Validity is defined by the Sectors API, not checked here.
pub type Ticker = String;

/// Exchange a company overview is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Indonesia Stock Exchange (IDX)
    Indonesia,
    /// Singapore Exchange (SGX)
    Singapore,
    /// Bursa Malaysia (KLSE)
    Malaysia,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Indonesia, Market::Singapore, Market::Malaysia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Indonesia => "indonesia",
            Market::Singapore => "singapore",
            Market::Malaysia => "malaysia",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Indonesia => write!(f, "Indonesia"),
            Market::Singapore => write!(f, "Singapore"),
            Market::Malaysia => write!(f, "Malaysia"),
        }
    }
}

impl FromStr for Market {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indonesia" => Ok(Market::Indonesia),
            "singapore" => Ok(Market::Singapore),
            "malaysia" => Ok(Market::Malaysia),
            other => Err(ScoutError::InvalidArgument(format!(
                "Country must be either Indonesia, Singapore, or Malaysia (got '{}')",
                other
            ))),
        }
    }
}

/// What happened when researching a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TickerStatus {
    /// The research agent produced a summary.
    Researched { summary: String },
    /// The research agent produced nothing usable.
    Skipped { reason: String },
}

/// Outcome of one research step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerOutcome {
    pub ticker: Ticker,
    #[serde(flatten)]
    pub status: TickerStatus,
}

impl TickerOutcome {
    pub fn researched(ticker: impl Into<Ticker>, summary: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            status: TickerStatus::Researched {
                summary: summary.into(),
            },
        }
    }

    pub fn skipped(ticker: impl Into<Ticker>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            status: TickerStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_researched(&self) -> bool {
        matches!(self.status, TickerStatus::Researched { .. })
    }
}

/// The aggregated result of one flow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Screening criteria entered by the operator.
    pub prompt: String,
    /// Tickers in the order the ranking agent returned them.
    pub tickers: Vec<Ticker>,
    /// One outcome per ticker, same order as `tickers`.
    pub outcomes: Vec<TickerOutcome>,
    /// Chat model used for both agents.
    pub model: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl RunReport {
    pub fn researched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_researched()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.researched_count()
    }
}
