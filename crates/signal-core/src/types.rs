use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-instrument signal record: the unit of the in-memory signal table.
///
/// Created from a watchlist entry at engine start, mutated in place by
/// streaming ticks and rescoring. `ticker` is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSignal {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    /// Percent move versus the session base price
    pub change_percent: f64,
    pub volume: f64,
    pub volume_avg: f64,
    pub rsi: f64,
    pub macd: f64,
    /// 0-100 trend quality score
    pub trend_score: f64,
    /// 0-1 model probability
    pub ml_confidence: f64,
    /// Annualized volatility as a fraction (0.25 = 25%)
    pub volatility: f64,
    /// -10..+10, negative = insider selling
    pub insider_activity: f64,
    /// -10..+10 impact of recent news on this asset
    pub news_sentiment_impact: f64,
    /// Blended 0-100 quality rating, refreshed each recompute pass
    pub composite_score: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Fill lifecycle. Only `Open` fills contribute to holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillStatus {
    Open,
    Closed,
}

/// An executed trade fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeFill {
    pub id: String,
    pub ticker: String,
    pub side: TradeSide,
    pub shares: f64,
    pub price: f64,
    pub status: FillStatus,
    pub executed_at: DateTime<Utc>,
}

/// Portfolio-level risk metrics, produced fresh each recompute pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 1-day 95% Value-at-Risk in account currency
    pub var_95: f64,
    /// 1-day 99% Value-at-Risk in account currency
    pub var_99: f64,
    /// 95% conditional VaR (expected shortfall proxy)
    pub cvar_95: f64,
    pub sharpe_ratio: f64,
    /// Annualized portfolio volatility, percent
    pub volatility: f64,
    pub beta: f64,
}

/// Rebalance action for a target row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// One row of the target-allocation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioTarget {
    pub ticker: String,
    pub current_weight: f64,
    pub target_weight: f64,
    pub action: TradeAction,
    pub shares_diff: i64,
    pub reason: String,
}

/// Daily OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCandle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Download pipeline stage for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadState {
    Pending,
    Fetching,
    Saving,
    Completed,
    Failed,
    Waiting,
}

/// Transient batch-download progress record, emitted to an observer and
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub ticker: String,
    pub state: DownloadState,
    pub count: usize,
    pub error: Option<String>,
}

/// A market headline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub source: String,
    pub related_ticker: Option<String>,
    pub title: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

/// A streaming trade print
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTick {
    pub ticker: String,
    pub price: f64,
    pub timestamp: i64,
}

/// PnL/status display state, advanced by the scheduler interval timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub last_updated: DateTime<Utc>,
    pub active_positions: usize,
    pub cash_position: f64,
    pub daily_pnl: f64,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            active_positions: 0,
            cash_position: 0.0,
            daily_pnl: 0.0,
        }
    }
}

/// Read-only snapshot of everything the engine computes, published to
/// consumers after each recompute pass. Views never write back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub signals: Vec<AssetSignal>,
    pub risk: RiskMetrics,
    pub targets: Vec<PortfolioTarget>,
    pub news: Vec<NewsItem>,
    pub status: SystemStatus,
    /// Monotonic state version this snapshot was computed from
    pub version: u64,
}
