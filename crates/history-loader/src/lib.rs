//! Historical-data acquisition: a rate-limited sequential downloader over a
//! quota-constrained daily-series source, with deterministic synthetic
//! fallback and a SQLite candle cache keyed by ticker.

pub mod alpha_vantage;
pub mod cache;
pub mod downloader;
pub mod synthetic;

pub use alpha_vantage::AlphaVantageClient;
pub use cache::CandleCache;
pub use downloader::BatchDownloader;
pub use synthetic::{synthetic_history, SYNTHETIC_DAYS};
