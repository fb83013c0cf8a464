use portfolio_math::composite_score;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signal_core::{ticker_seed, AssetSignal, PriceTick, WatchlistEntry};
use std::collections::HashMap;

/// RSI nudge applied in the direction of each price move
const RSI_STEP: f64 = 2.0;

/// The in-memory per-instrument signal table: single source of truth for
/// the scorer, risk calculator, and optimizer. One record per watchlist
/// instrument, mutated in place by streaming ticks; records live until the
/// instrument leaves the watchlist.
pub struct SignalStore {
    signals: HashMap<String, AssetSignal>,
    /// Price each signal was seeded with; change_percent is quoted against it
    session_base: HashMap<String, f64>,
}

impl SignalStore {
    pub fn from_watchlist(watchlist: &[WatchlistEntry]) -> Self {
        let mut store = Self {
            signals: HashMap::new(),
            session_base: HashMap::new(),
        };
        for entry in watchlist {
            store.insert_entry(entry);
        }
        store
    }

    /// Seed a signal record with deterministic per-ticker attributes.
    /// Real attributes stream in afterwards; the seed keeps startup
    /// reproducible instead of blank.
    fn insert_entry(&mut self, entry: &WatchlistEntry) {
        let mut rng = StdRng::seed_from_u64(ticker_seed(&entry.ticker));

        let price = 100.0;
        let volume = rng.gen_range(500_000.0..2_500_000.0);

        let mut signal = AssetSignal {
            ticker: entry.ticker.clone(),
            name: entry.name.clone(),
            sector: entry.sector.clone(),
            price,
            change_percent: rng.gen_range(-1.0..1.0),
            volume,
            volume_avg: volume * 1.1,
            rsi: rng.gen_range(30.0..70.0),
            macd: rng.gen_range(-2.5..2.5),
            trend_score: rng.gen_range(40.0..80.0),
            ml_confidence: rng.gen_range(0.4..0.9),
            volatility: 0.25,
            insider_activity: rng.gen_range(-5.0..5.0_f64).round(),
            news_sentiment_impact: rng.gen_range(-5.0..5.0_f64).round(),
            composite_score: 0.0,
        };
        signal.composite_score = composite_score(&signal);

        self.session_base.insert(entry.ticker.clone(), price);
        self.signals.insert(entry.ticker.clone(), signal);
    }

    /// Apply a streaming trade print. Updates price and change_percent,
    /// nudges RSI toward the move, and refreshes the composite score.
    /// Returns false for tickers not in the table.
    pub fn apply_tick(&mut self, tick: &PriceTick) -> bool {
        let Some(signal) = self.signals.get_mut(&tick.ticker) else {
            return false;
        };

        if tick.price > signal.price {
            signal.rsi = (signal.rsi + RSI_STEP).min(100.0);
        } else if tick.price < signal.price {
            signal.rsi = (signal.rsi - RSI_STEP).max(0.0);
        }

        signal.price = tick.price;

        let base = self.session_base.get(&tick.ticker).copied().unwrap_or(0.0);
        if base > 0.0 {
            signal.change_percent = (tick.price - base) / base * 100.0;
        }

        signal.composite_score = composite_score(signal);
        true
    }

    /// Seed the session base price from a startup REST quote. Unlike a
    /// tick this carries no directional information, so RSI is untouched.
    pub fn set_base_price(&mut self, ticker: &str, price: f64) -> bool {
        if price <= 0.0 {
            return false;
        }
        let Some(signal) = self.signals.get_mut(ticker) else {
            return false;
        };
        signal.price = price;
        signal.change_percent = 0.0;
        self.session_base.insert(ticker.to_string(), price);
        true
    }

    /// Refresh every composite score. Runs at the top of each recompute
    /// pass so risk and optimization always read fully scored signals.
    pub fn rescore_all(&mut self) {
        for signal in self.signals.values_mut() {
            signal.composite_score = composite_score(signal);
        }
    }

    /// Add records for new watchlist entries and drop records for removed
    /// instruments.
    pub fn sync_watchlist(&mut self, watchlist: &[WatchlistEntry]) {
        for entry in watchlist {
            if !self.signals.contains_key(&entry.ticker) {
                self.insert_entry(entry);
            }
        }
        let keep: Vec<String> = watchlist.iter().map(|e| e.ticker.clone()).collect();
        self.signals.retain(|ticker, _| keep.contains(ticker));
        self.session_base.retain(|ticker, _| keep.contains(ticker));
    }

    pub fn get(&self, ticker: &str) -> Option<&AssetSignal> {
        self.signals.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Current ticker -> price map
    pub fn price_map(&self) -> HashMap<String, f64> {
        self.signals
            .iter()
            .map(|(ticker, s)| (ticker.clone(), s.price))
            .collect()
    }

    /// Clone of the full table, sorted by descending composite score
    pub fn snapshot(&self) -> Vec<AssetSignal> {
        let mut signals: Vec<AssetSignal> = self.signals.values().cloned().collect();
        signals.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        signals
    }
}
