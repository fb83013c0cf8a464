//! history-loader: populate the local candle cache with daily OHLCV series.
//!
//! Processes tickers sequentially against the Alpha Vantage free tier
//! (5 req/min), falling back to a deterministic synthetic series whenever
//! the source is unavailable. Already cached tickers are skipped unless
//! --no-resume is given.
//!
//! Usage:
//!   cargo run -p history-loader -- --symbols NVDA AMD PLTR
//!   cargo run -p history-loader -- --all
//!   cargo run -p history-loader -- --count
//!   cargo run -p history-loader -- --clear

use anyhow::{Context, Result};
use history_loader::{AlphaVantageClient, BatchDownloader, CandleCache};
use signal_core::{default_watchlist, DownloadState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "history_loader=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let use_all = args.iter().any(|a| a == "--all");
    let no_resume = args.iter().any(|a| a == "--no-resume");
    let clear = args.iter().any(|a| a == "--clear");
    let count = args.iter().any(|a| a == "--count");

    let db_url = args
        .iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("sqlite:candles.db");

    let cache = CandleCache::new(db_url).await?;

    if clear {
        cache.clear().await?;
        tracing::info!("Candle cache cleared");
        return Ok(());
    }

    if count {
        tracing::info!("Candle cache holds {} tickers", cache.count().await?);
        return Ok(());
    }

    let tickers: Vec<String> = if let Some(idx) = args.iter().position(|a| a == "--symbols") {
        args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect()
    } else if use_all {
        default_watchlist().into_iter().map(|e| e.ticker).collect()
    } else {
        anyhow::bail!("Pass --symbols <TICKER...> or --all (see --help header in source)");
    };

    if tickers.is_empty() {
        anyhow::bail!("No tickers to download");
    }

    let api_key = std::env::var("ALPHAVANTAGE_API_KEY")
        .context("ALPHAVANTAGE_API_KEY not set")?;

    tracing::info!(
        "Downloading {} tickers into {} (resume: {})",
        tickers.len(),
        db_url,
        !no_resume
    );

    let downloader = BatchDownloader::new(AlphaVantageClient::new(api_key), cache.clone())
        .with_resume(!no_resume);

    downloader
        .run(&tickers, |status| match status.state {
            DownloadState::Pending => {}
            DownloadState::Fetching => tracing::info!("{}: fetching...", status.ticker),
            DownloadState::Saving => {
                tracing::info!("{}: saving {} candles", status.ticker, status.count)
            }
            DownloadState::Completed => {
                tracing::info!("{}: completed ({} candles)", status.ticker, status.count)
            }
            DownloadState::Failed => tracing::error!(
                "{}: failed ({})",
                status.ticker,
                status.error.as_deref().unwrap_or("unknown error")
            ),
            DownloadState::Waiting => {
                tracing::info!("{}: waiting for rate-limit window...", status.ticker)
            }
        })
        .await?;

    tracing::info!(
        "Batch finished. Cache now holds {} tickers.",
        cache.count().await?
    );

    Ok(())
}
