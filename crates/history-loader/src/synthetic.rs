use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signal_core::{ticker_seed, HistoricalCandle};

/// Roughly ten years of trading days
pub const SYNTHETIC_DAYS: usize = 2500;
/// Walk start price
const START_PRICE: f64 = 100.0;
/// Lower bound so a long unlucky walk cannot produce non-positive prices
const PRICE_FLOOR: f64 = 1.0;

/// Deterministic fallback series ending today. Same ticker, same walk.
pub fn synthetic_history(ticker: &str) -> Vec<HistoricalCandle> {
    synthetic_history_until(ticker, Utc::now().date_naive())
}

/// Seeded daily random walk ending at `end` (exclusive of `end` itself)
pub fn synthetic_history_until(ticker: &str, end: NaiveDate) -> Vec<HistoricalCandle> {
    let mut rng = StdRng::seed_from_u64(ticker_seed(ticker));
    let mut price = START_PRICE;
    let mut candles = Vec::with_capacity(SYNTHETIC_DAYS);

    for offset in (1..=SYNTHETIC_DAYS).rev() {
        let date = end - Duration::days(offset as i64);

        let change: f64 = rng.gen_range(-1.0..1.0);
        price = (price + change).max(PRICE_FLOOR);

        let high_spread: f64 = rng.gen();
        let low_spread: f64 = rng.gen();
        let close_drift: f64 = rng.gen_range(-0.5..0.5);

        candles.push(HistoricalCandle {
            date,
            open: price,
            high: price + high_spread,
            low: (price - low_spread).max(PRICE_FLOOR),
            close: (price + close_drift).max(PRICE_FLOOR),
            volume: rng.gen_range(0.0..1_000_000.0_f64).floor(),
        });
    }

    candles
}
