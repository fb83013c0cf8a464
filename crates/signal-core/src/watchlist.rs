use serde::{Deserialize, Serialize};

/// A tracked instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub name: String,
    pub sector: String,
}

impl WatchlistEntry {
    pub fn new(ticker: &str, name: &str, sector: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
        }
    }
}

const DEFAULT_WATCHLIST: &[(&str, &str, &str)] = &[
    // European industry & defense
    ("RHM.DE", "Rheinmetall AG", "Defense"),
    ("TKA.DE", "ThyssenKrupp AG", "Industrials"),
    ("RR.L", "Rolls-Royce Holdings", "Industrials"),
    ("R3NK.DE", "RENK Group AG", "Defense"),
    ("HAG.DE", "Hensoldt AG", "Defense"),
    ("BA.L", "BAE Systems", "Defense"),
    ("VOW3.DE", "Volkswagen (VZ)", "Automotive"),
    ("SRT.DE", "Sartorius (VZ)", "Healthcare"),
    ("BAVA.CO", "Bavarian Nordic", "Healthcare"),
    // US semiconductors
    ("NVDA", "NVIDIA Corp", "Technology"),
    ("AMD", "Advanced Micro Devices", "Technology"),
    ("INTC", "Intel Corp", "Technology"),
    ("TSM", "TSMC (ADR)", "Technology"),
    ("ASML", "ASML Holding", "Technology"),
    ("AVGO", "Broadcom Inc", "Technology"),
    ("MU", "Micron Technology", "Technology"),
    ("QCOM", "Qualcomm Inc", "Technology"),
    ("SMCI", "Super Micro Computer", "Technology"),
    // US software & cloud
    ("MSFT", "Microsoft Corp", "Technology"),
    ("GOOGL", "Alphabet (A)", "Technology"),
    ("META", "Meta Platforms", "Technology"),
    ("ADBE", "Adobe Inc", "Technology"),
    ("ORCL", "Oracle Corp", "Technology"),
    ("PLTR", "Palantir Technologies", "Technology"),
    // US defense & aerospace
    ("LMT", "Lockheed Martin", "Defense"),
    ("NOC", "Northrop Grumman", "Defense"),
    ("BA", "Boeing Co", "Industrials"),
    ("AXON", "Axon Enterprise", "Defense"),
    // Energy & other
    ("PBR", "Petroleo Brasileiro", "Energy"),
    ("PLUG", "Plug Power", "Energy"),
    ("ALB", "Albemarle Corp", "Basic Materials"),
    ("TSLA", "Tesla Inc", "Consumer Cyclical"),
    ("MSTR", "MicroStrategy", "Finance"),
    ("SPGI", "S&P Global", "Finance"),
];

/// The default instrument universe, used when no WATCHLIST override is set
pub fn default_watchlist() -> Vec<WatchlistEntry> {
    DEFAULT_WATCHLIST
        .iter()
        .map(|(t, n, s)| WatchlistEntry::new(t, n, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_watchlist_unique_tickers() {
        let list = default_watchlist();
        let tickers: HashSet<&str> = list.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers.len(), list.len());
        assert!(tickers.contains("NVDA"));
    }
}
