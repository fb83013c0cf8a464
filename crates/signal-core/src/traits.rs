use async_trait::async_trait;

use crate::{CoreError, EngineSnapshot, FetchError, HistoricalCandle, TradeFill};

/// Trait for daily OHLCV series providers
#[async_trait]
pub trait DailySeriesSource: Send + Sync {
    async fn fetch_daily(&self, ticker: &str) -> Result<Vec<HistoricalCandle>, FetchError>;
}

/// Trait for automation collaborators invoked on the scheduler interval.
/// Returned fills are appended to the trade log and trigger a recompute.
#[async_trait]
pub trait TriggerEvaluator: Send + Sync {
    async fn evaluate(&self, snapshot: &EngineSnapshot) -> Result<Vec<TradeFill>, CoreError>;
}
