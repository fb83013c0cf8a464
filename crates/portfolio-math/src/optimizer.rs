use signal_core::{AssetSignal, EngineConfig, PortfolioTarget, TradeAction};
use std::collections::HashMap;

/// Inclusion threshold on max(trend_score, composite_score)
const INVESTABLE_THRESHOLD: f64 = 60.0;
/// Diversification ceiling per instrument
const MAX_WEIGHT: f64 = 0.25;
/// Weight-difference band inside which no rebalance is triggered
const TOLERANCE: f64 = 0.02;
/// Volatility floor for the risk-adjusted score denominator
const MIN_VOLATILITY: f64 = 0.1;
/// Price fallback when both the quote map and the signal carry no usable price
const FALLBACK_PRICE: f64 = 100.0;

pub struct PortfolioOptimizer;

impl PortfolioOptimizer {
    /// Heuristic risk-adjusted weighting with tolerance-banded rebalancing.
    ///
    /// Weights are proportional to `composite / max(vol, 0.1)` across the
    /// investable set and capped at 25% without renormalization, so the
    /// total may sum below 1 with cash as the implicit remainder. Held
    /// instruments that fell out of the investable set get a full
    /// liquidation row.
    pub fn optimize(
        signals: &[AssetSignal],
        _config: &EngineConfig,
        current_prices: &HashMap<String, f64>,
        current_shares: &HashMap<String, f64>,
        total_equity: f64,
    ) -> Vec<PortfolioTarget> {
        let mut targets = Vec::new();

        let investable: Vec<&AssetSignal> = signals
            .iter()
            .filter(|s| s.trend_score.max(s.composite_score) > INVESTABLE_THRESHOLD)
            .collect();

        if investable.is_empty() {
            return targets;
        }

        let total_score: f64 = investable
            .iter()
            .map(|s| risk_adjusted_score(s))
            .sum::<f64>()
            .max(1.0);

        for signal in &investable {
            let target_weight = (risk_adjusted_score(signal) / total_score).min(MAX_WEIGHT);

            let price = price_of(signal, current_prices);
            let shares = current_shares.get(&signal.ticker).copied().unwrap_or(0.0);
            let current_weight = if total_equity > 0.0 {
                shares * price / total_equity
            } else {
                0.0
            };

            let diff_weight = target_weight - current_weight;
            // Truncation toward zero so a rebalance never over-orders
            let shares_diff = (diff_weight * total_equity / price).trunc() as i64;

            let (action, reason) = if diff_weight.abs() < TOLERANCE {
                (TradeAction::Hold, "Within Tolerance")
            } else if diff_weight > 0.0 {
                (TradeAction::Buy, "Increase Exposure")
            } else {
                (TradeAction::Sell, "Reduce Risk")
            };

            targets.push(PortfolioTarget {
                ticker: signal.ticker.clone(),
                current_weight,
                target_weight,
                action,
                shares_diff,
                reason: reason.to_string(),
            });
        }

        // Liquidation rows for holdings that dropped out of the investable set
        for signal in signals
            .iter()
            .filter(|s| s.trend_score.max(s.composite_score) <= INVESTABLE_THRESHOLD)
        {
            let shares = current_shares.get(&signal.ticker).copied().unwrap_or(0.0);
            if shares > 0.0 {
                let price = price_of(signal, current_prices);
                let current_weight = if total_equity > 0.0 {
                    shares * price / total_equity
                } else {
                    0.0
                };

                targets.push(PortfolioTarget {
                    ticker: signal.ticker.clone(),
                    current_weight,
                    target_weight: 0.0,
                    action: TradeAction::Sell,
                    shares_diff: -(shares as i64),
                    reason: "Score deteriorated".to_string(),
                });
            }
        }

        targets.sort_by(|a, b| {
            b.target_weight
                .partial_cmp(&a.target_weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        targets
    }
}

fn risk_adjusted_score(signal: &AssetSignal) -> f64 {
    signal.composite_score / signal.volatility.max(MIN_VOLATILITY)
}

fn price_of(signal: &AssetSignal, current_prices: &HashMap<String, f64>) -> f64 {
    let price = current_prices
        .get(&signal.ticker)
        .copied()
        .unwrap_or(signal.price);
    if price > 0.0 {
        price
    } else {
        FALLBACK_PRICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(ticker: &str, trend: f64, composite: f64, volatility: f64, price: f64) -> AssetSignal {
        AssetSignal {
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            sector: "Technology".to_string(),
            price,
            change_percent: 0.0,
            volume: 1_000_000.0,
            volume_avg: 1_100_000.0,
            rsi: 50.0,
            macd: 0.0,
            trend_score: trend,
            ml_confidence: 0.5,
            volatility,
            insider_activity: 0.0,
            news_sentiment_impact: 0.0,
            composite_score: composite,
        }
    }

    fn optimize(
        signals: &[AssetSignal],
        shares: &[(&str, f64)],
        equity: f64,
    ) -> Vec<PortfolioTarget> {
        let config = EngineConfig::default();
        let prices: HashMap<String, f64> =
            signals.iter().map(|s| (s.ticker.clone(), s.price)).collect();
        let shares: HashMap<String, f64> =
            shares.iter().map(|(t, n)| (t.to_string(), *n)).collect();
        PortfolioOptimizer::optimize(signals, &config, &prices, &shares, equity)
    }

    #[test]
    fn test_weight_cap_without_renormalization() {
        // A raw score 900 dominates B's 300; A is capped at 0.25 while B
        // keeps its exact ratio share (300/1200 = 0.25, uncapped).
        let signals = vec![
            make_signal("A", 70.0, 90.0, 0.1, 100.0),
            make_signal("B", 70.0, 60.0, 0.2, 100.0),
        ];
        let targets = optimize(&signals, &[], 100_000.0);

        assert_eq!(targets.len(), 2);
        let a = targets.iter().find(|t| t.ticker == "A").unwrap();
        let b = targets.iter().find(|t| t.ticker == "B").unwrap();
        assert_eq!(a.target_weight, 0.25);
        assert!((b.target_weight - 300.0 / 1200.0).abs() < 1e-12);
        for t in &targets {
            assert!(t.target_weight <= 0.25);
        }
    }

    #[test]
    fn test_hold_within_tolerance_band() {
        // Single investable name: raw weight 1.0 capped to 0.25.
        let signals = vec![make_signal("A", 70.0, 90.0, 0.9, 100.0)];

        // current weight 0.24 -> |diff| = 0.01 < 0.02 -> HOLD
        let targets = optimize(&signals, &[("A", 240.0)], 100_000.0);
        assert_eq!(targets[0].action, TradeAction::Hold);
        assert_eq!(targets[0].reason, "Within Tolerance");

        // current weight 0.20 -> diff = +0.05 -> BUY of 50 shares
        let targets = optimize(&signals, &[("A", 200.0)], 100_000.0);
        assert_eq!(targets[0].action, TradeAction::Buy);
        assert_eq!(targets[0].reason, "Increase Exposure");
        assert_eq!(targets[0].shares_diff, 50);

        // current weight 0.30 -> diff = -0.05 -> SELL of 50 shares
        let targets = optimize(&signals, &[("A", 300.0)], 100_000.0);
        assert_eq!(targets[0].action, TradeAction::Sell);
        assert_eq!(targets[0].reason, "Reduce Risk");
        assert_eq!(targets[0].shares_diff, -50);
    }

    #[test]
    fn test_shares_diff_truncates_toward_zero() {
        // diff -0.05 on equity 100k at price 333 -> -15.015 shares -> -15
        let signals = vec![make_signal("A", 70.0, 90.0, 0.9, 333.0)];
        let targets = optimize(&signals, &[("A", 90.09009009)], 100_000.0);
        assert_eq!(targets[0].action, TradeAction::Sell);
        assert_eq!(targets[0].shares_diff, -15);
    }

    #[test]
    fn test_dropout_forces_liquidation() {
        let signals = vec![
            make_signal("A", 70.0, 90.0, 0.2, 100.0),
            make_signal("B", 40.0, 24.0, 0.2, 50.0),
        ];
        let targets = optimize(&signals, &[("B", 10.0)], 100_000.0);

        let b = targets.iter().find(|t| t.ticker == "B").unwrap();
        assert_eq!(b.action, TradeAction::Sell);
        assert_eq!(b.target_weight, 0.0);
        assert_eq!(b.shares_diff, -10);
        assert_eq!(b.reason, "Score deteriorated");
    }

    #[test]
    fn test_dropout_without_holding_emits_nothing() {
        let signals = vec![
            make_signal("A", 70.0, 90.0, 0.2, 100.0),
            make_signal("B", 40.0, 24.0, 0.2, 50.0),
        ];
        let targets = optimize(&signals, &[], 100_000.0);
        assert!(targets.iter().all(|t| t.ticker != "B"));
    }

    #[test]
    fn test_empty_investable_set() {
        let signals = vec![make_signal("A", 40.0, 24.0, 0.2, 100.0)];
        let targets = optimize(&signals, &[("A", 10.0)], 100_000.0);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_investable_via_trend_score_alone() {
        // Composite is weak but the trend qualifies the name
        let signals = vec![make_signal("A", 75.0, 30.0, 0.2, 100.0)];
        let targets = optimize(&signals, &[], 100_000.0);
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_sorted_by_descending_target_weight() {
        let signals = vec![
            make_signal("LOW", 70.0, 61.0, 0.9, 100.0),
            make_signal("HIGH", 70.0, 95.0, 0.1, 100.0),
            make_signal("MID", 70.0, 80.0, 0.4, 100.0),
        ];
        let targets = optimize(&signals, &[], 100_000.0);
        for pair in targets.windows(2) {
            assert!(pair[0].target_weight >= pair[1].target_weight);
        }
    }

    #[test]
    fn test_zero_price_defended() {
        let signals = vec![make_signal("A", 70.0, 90.0, 0.2, 0.0)];
        let targets = optimize(&signals, &[], 100_000.0);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].shares_diff >= 0);
    }
}
