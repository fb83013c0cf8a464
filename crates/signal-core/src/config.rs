use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::watchlist::{default_watchlist, WatchlistEntry};

/// Engine configuration. Owned by the caller; the engine treats each value
/// as an immutable snapshot per recompute pass and accepts replacements at
/// runtime through a `ConfigChanged` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Annualized volatility target (0.12 = 12%)
    pub vol_target: f64,
    /// Fractional Kelly multiplier (0.3 = 30% Kelly)
    pub kelly_scale: f64,
    pub atr_stop_multiplier: f64,
    /// Drawdown limit as a fraction (0.20 = 20%)
    pub max_drawdown_limit: f64,
    pub use_hrp: bool,
    pub watchlist: Vec<WatchlistEntry>,
    pub enable_automation: bool,
    pub status_interval_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            vol_target: 0.12,
            kelly_scale: 0.3,
            atr_stop_multiplier: 2.5,
            max_drawdown_limit: 0.20,
            use_hrp: true,
            watchlist: default_watchlist(),
            enable_automation: false,
            status_interval_seconds: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let watchlist = match env::var("WATCHLIST") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|t| WatchlistEntry::new(t, t, "Unknown"))
                .collect(),
            Err(_) => default_watchlist(),
        };

        Ok(Self {
            initial_capital: env::var("INITIAL_CAPITAL")
                .unwrap_or_else(|_| "100000.0".to_string())
                .parse()?,
            vol_target: env::var("VOL_TARGET")
                .unwrap_or_else(|_| "0.12".to_string())
                .parse()?,
            kelly_scale: env::var("KELLY_SCALE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()?,
            atr_stop_multiplier: env::var("ATR_STOP_MULTIPLIER")
                .unwrap_or_else(|_| "2.5".to_string())
                .parse()?,
            max_drawdown_limit: env::var("MAX_DRAWDOWN_LIMIT")
                .unwrap_or_else(|_| "0.20".to_string())
                .parse()?,
            use_hrp: env::var("USE_HRP")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            watchlist,
            enable_automation: env::var("ENABLE_AUTOMATION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            status_interval_seconds: env::var("STATUS_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        })
    }

    /// Tickers of the configured watchlist
    pub fn tickers(&self) -> Vec<String> {
        self.watchlist.iter().map(|e| e.ticker.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_capital, 100_000.0);
        assert_eq!(config.status_interval_seconds, 5);
        assert!(!config.enable_automation);
        assert!(!config.watchlist.is_empty());
    }
}
