use async_trait::async_trait;
use chrono::Utc;
use signal_core::{
    CoreError, EngineSnapshot, FillStatus, TradeAction, TradeFill, TradeSide, TriggerEvaluator,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Cap on a single automated order, in account currency
const DEFAULT_MAX_ORDER_VALUE: f64 = 5_000.0;

/// Paper-trading automation: on each evaluation, fills a slice of the
/// strongest pending Buy target at the current signal price. Keeps the
/// reactive loop honest without touching a real broker.
pub struct PaperTrader {
    max_order_value: f64,
    sequence: AtomicU64,
}

impl PaperTrader {
    pub fn new() -> Self {
        let max_order_value = std::env::var("PAPER_MAX_ORDER_VALUE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ORDER_VALUE);

        Self {
            max_order_value,
            sequence: AtomicU64::new(1),
        }
    }
}

impl Default for PaperTrader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TriggerEvaluator for PaperTrader {
    async fn evaluate(&self, snapshot: &EngineSnapshot) -> Result<Vec<TradeFill>, CoreError> {
        let Some(target) = snapshot
            .targets
            .iter()
            .find(|t| t.action == TradeAction::Buy && t.shares_diff > 0)
        else {
            return Ok(Vec::new());
        };

        let Some(signal) = snapshot.signals.iter().find(|s| s.ticker == target.ticker) else {
            return Err(CoreError::Trigger(format!(
                "target {} has no signal record",
                target.ticker
            )));
        };
        if signal.price <= 0.0 {
            return Err(CoreError::Trigger(format!(
                "no usable price for {}",
                target.ticker
            )));
        }

        let cap = (self.max_order_value / signal.price).floor();
        let shares = (target.shares_diff as f64).min(cap);
        if shares < 1.0 {
            return Ok(Vec::new());
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "Paper fill: BUY {} x{:.0} @ {:.2} ({})",
            target.ticker,
            shares,
            signal.price,
            target.reason
        );

        Ok(vec![TradeFill {
            id: format!("paper-{}-{}", target.ticker, seq),
            ticker: target.ticker.clone(),
            side: TradeSide::Buy,
            shares,
            price: signal.price,
            status: FillStatus::Open,
            executed_at: Utc::now(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::{AssetSignal, PortfolioTarget, RiskMetrics, SystemStatus};

    fn snapshot_with_target(action: TradeAction, shares_diff: i64, price: f64) -> EngineSnapshot {
        EngineSnapshot {
            signals: vec![AssetSignal {
                ticker: "NVDA".to_string(),
                name: "NVIDIA Corp".to_string(),
                sector: "Technology".to_string(),
                price,
                change_percent: 0.0,
                volume: 1_000_000.0,
                volume_avg: 1_100_000.0,
                rsi: 55.0,
                macd: 0.5,
                trend_score: 75.0,
                ml_confidence: 0.7,
                volatility: 0.3,
                insider_activity: 0.0,
                news_sentiment_impact: 2.0,
                composite_score: 69.0,
            }],
            risk: RiskMetrics::default(),
            targets: vec![PortfolioTarget {
                ticker: "NVDA".to_string(),
                current_weight: 0.0,
                target_weight: 0.25,
                action,
                shares_diff,
                reason: "Increase Exposure".to_string(),
            }],
            news: Vec::new(),
            status: SystemStatus::default(),
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_fills_buy_target_capped_by_order_value() {
        let trader = PaperTrader {
            max_order_value: 1_000.0,
            sequence: AtomicU64::new(1),
        };

        let fills = trader
            .evaluate(&snapshot_with_target(TradeAction::Buy, 250, 100.0))
            .await
            .unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].ticker, "NVDA");
        // 250 requested, but 1000/100 = 10 shares is the cap
        assert_eq!(fills[0].shares, 10.0);
        assert_eq!(fills[0].status, FillStatus::Open);
    }

    #[tokio::test]
    async fn test_no_buy_target_no_fill() {
        let trader = PaperTrader {
            max_order_value: 1_000.0,
            sequence: AtomicU64::new(1),
        };

        let fills = trader
            .evaluate(&snapshot_with_target(TradeAction::Hold, 0, 100.0))
            .await
            .unwrap();
        assert!(fills.is_empty());
    }
}
