//! Holdings derived by folding open trade fills. Read-only input to the
//! risk calculator and optimizer; nothing here mutates the fill log.

use signal_core::{FillStatus, TradeFill, TradeSide};
use std::collections::HashMap;

/// Signed share quantity per ticker from all open fills
pub fn fold_open_fills(fills: &[TradeFill]) -> HashMap<String, f64> {
    let mut shares: HashMap<String, f64> = HashMap::new();
    for fill in fills.iter().filter(|f| f.status == FillStatus::Open) {
        let signed = match fill.side {
            TradeSide::Buy => fill.shares,
            TradeSide::Sell => -fill.shares,
        };
        *shares.entry(fill.ticker.clone()).or_insert(0.0) += signed;
    }
    shares
}

/// Total equity: initial capital plus open-fill mark-to-market PnL
pub fn equity(initial_capital: f64, fills: &[TradeFill], prices: &HashMap<String, f64>) -> f64 {
    let pnl: f64 = fills
        .iter()
        .filter(|f| f.status == FillStatus::Open)
        .map(|fill| {
            let current = prices.get(&fill.ticker).copied().unwrap_or(fill.price);
            let signed = match fill.side {
                TradeSide::Buy => fill.shares,
                TradeSide::Sell => -fill.shares,
            };
            signed * (current - fill.price)
        })
        .sum();
    initial_capital + pnl
}

/// Market value of positive positions
pub fn market_value(shares: &HashMap<String, f64>, prices: &HashMap<String, f64>) -> f64 {
    shares
        .iter()
        .filter(|(_, qty)| **qty > 0.0)
        .map(|(ticker, qty)| qty * prices.get(ticker).copied().unwrap_or(0.0))
        .sum()
}

/// Equity-fraction weights for positive positions. The sum stays at or
/// below 1 for any long-only book within equity; cash is the residual.
pub fn active_weights(
    shares: &HashMap<String, f64>,
    prices: &HashMap<String, f64>,
    total_equity: f64,
) -> HashMap<String, f64> {
    if total_equity <= 0.0 {
        return HashMap::new();
    }
    shares
        .iter()
        .filter(|(_, qty)| **qty > 0.0)
        .filter_map(|(ticker, qty)| {
            let price = prices.get(ticker).copied()?;
            Some((ticker.clone(), qty * price / total_equity))
        })
        .collect()
}
