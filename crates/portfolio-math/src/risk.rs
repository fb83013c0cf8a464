use signal_core::{AssetSignal, RiskMetrics};
use std::collections::HashMap;

/// √252: annualized vol to daily vol
const ANNUALIZATION: f64 = 15.87;
/// Volatility floor so a degenerate zero-vol asset still carries risk
const MIN_VOLATILITY: f64 = 0.01;
/// One-sided normal z-scores
const Z_95: f64 = 1.645;
const Z_99: f64 = 2.33;
/// Flat cross-asset covariance stand-in applied to the diagonal variance
const CORRELATION_INFLATION: f64 = 1.5;
/// CVaR tail-expectation proxy over the 99% VaR
const CVAR_FACTOR: f64 = 1.15;
/// Reported from a fixed baseline, not derived from the variance model
const BASELINE_SHARPE: f64 = 1.85;
const BASELINE_BETA: f64 = 1.12;

pub struct RiskCalculator;

impl RiskCalculator {
    /// Parametric 1-day VaR/CVaR from per-instrument annualized volatility
    /// and equity weights. `active_weights` maps ticker to its fraction of
    /// total equity; instruments without a positive weight are ignored.
    pub fn compute(
        signals: &[AssetSignal],
        total_equity: f64,
        active_weights: &HashMap<String, f64>,
    ) -> RiskMetrics {
        let mut variance = 0.0;

        for signal in signals {
            let weight = active_weights.get(&signal.ticker).copied().unwrap_or(0.0);
            if weight > 0.0 {
                let daily_vol = signal.volatility.max(MIN_VOLATILITY) / ANNUALIZATION;
                variance += (weight * daily_vol).powi(2);
            }
        }

        if variance > 0.0 {
            variance *= CORRELATION_INFLATION;
        }

        let std_dev = variance.sqrt();

        let var_95_pct = Z_95 * std_dev;
        let var_99_pct = Z_99 * std_dev;

        RiskMetrics {
            var_95: var_95_pct * total_equity,
            var_99: var_99_pct * total_equity,
            cvar_95: var_99_pct * total_equity * CVAR_FACTOR,
            sharpe_ratio: BASELINE_SHARPE,
            volatility: std_dev * ANNUALIZATION * 100.0,
            beta: BASELINE_BETA,
        }
    }
}
