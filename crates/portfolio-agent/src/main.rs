//! portfolio-agent: long-running daemon that keeps composite scores, risk
//! metrics, and target allocations consistent with the live tick stream,
//! configuration, and trade fills.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use finnhub_client::{FinnhubClient, FinnhubWebSocket};
use history_loader::CandleCache;
use market_engine::RecomputeScheduler;
use signal_core::EngineConfig;
use tokio::signal::unix::SignalKind;
use tokio::sync::broadcast;

mod paper;

use paper::PaperTrader;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting Assembled portfolio agent");

    let config = EngineConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Initial capital: ${:.0}", config.initial_capital);
    tracing::info!("  Vol target: {:.0}%", config.vol_target * 100.0);
    tracing::info!("  Watchlist: {} instruments", config.watchlist.len());
    tracing::info!("  Status interval: {}s", config.status_interval_seconds);
    tracing::info!("  Automation: {}", config.enable_automation);

    let finnhub_key = std::env::var("FINNHUB_API_KEY").context("FINNHUB_API_KEY not set")?;

    // Candle cache is a lazy downstream resource; report but never block
    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:candles.db".to_string());
    match CandleCache::new(&db_url).await {
        Ok(cache) => match cache.count().await {
            Ok(count) => tracing::info!("Candle cache OK ({} tickers at {})", count, db_url),
            Err(e) => tracing::warn!("Candle cache count failed: {}", e),
        },
        Err(e) => tracing::warn!("Candle cache unavailable ({}): {}", db_url, e),
    }

    // Engine
    let (scheduler, engine, snapshot_rx) = RecomputeScheduler::new(config.clone());
    let scheduler = if config.enable_automation {
        tracing::info!("Paper-trading automation enabled");
        scheduler.with_evaluator(Arc::new(PaperTrader::new()))
    } else {
        scheduler
    };
    let engine_task = tokio::spawn(scheduler.run());
    tracing::info!("Recompute scheduler running");

    // Streaming source
    let (ws, tick_rx) = FinnhubWebSocket::new(finnhub_key.clone());
    let ws = Arc::new(ws);
    for entry in &config.watchlist {
        ws.subscribe(&entry.ticker).await;
    }
    let ws_task = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.run().await })
    };
    tracing::info!("Streaming source started ({} subscriptions)", config.watchlist.len());

    // Tick forwarder: streaming callback state stays out of the engine;
    // everything goes through the event queue
    let forwarder_task = {
        let engine = engine.clone();
        let mut tick_rx = tick_rx;
        tokio::spawn(async move {
            loop {
                match tick_rx.recv().await {
                    Ok(tick) => engine.tick(tick).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Tick forwarder lagged, dropped {} ticks", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let rest_client = FinnhubClient::new(finnhub_key);

    // Prime session base prices from REST quotes so change_percent and
    // allocation math start from real levels instead of the seeded default
    let prime_task = {
        let engine = engine.clone();
        let client = rest_client.clone();
        let tickers = config.tickers();
        tokio::spawn(async move {
            for ticker in tickers {
                match client.get_quote(&ticker).await {
                    Ok(price) => engine.prime_quote(ticker, price).await,
                    Err(e) => tracing::debug!("No startup quote for {}: {}", ticker, e),
                }
            }
            tracing::info!("Startup quote priming finished");
        })
    };

    // News poller
    let news_interval_secs: u64 = std::env::var("NEWS_SCAN_INTERVAL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);
    let news_task = {
        let engine = engine.clone();
        let client = rest_client;
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(news_interval_secs));
            loop {
                timer.tick().await;
                match client.get_market_news().await {
                    Ok(news) if !news.is_empty() => {
                        tracing::debug!("Fetched {} headlines", news.len());
                        engine.push_news(news).await;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("News fetch failed: {}", e),
                }
            }
        })
    };

    // Periodic consumer-side summary so the operator can see the engine work
    let summary_task = {
        let snapshot_rx = snapshot_rx.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(60));
            timer.tick().await; // skip the immediate first tick
            loop {
                timer.tick().await;
                let snapshot = snapshot_rx.borrow().clone();
                tracing::info!(
                    "v{} | {} signals | VaR95 ${:.0} | vol {:.1}% | {} targets | {} positions | PnL ${:.0}",
                    snapshot.version,
                    snapshot.signals.len(),
                    snapshot.risk.var_95,
                    snapshot.risk.volatility,
                    snapshot.targets.len(),
                    snapshot.status.active_positions,
                    snapshot.status.daily_pnl,
                );
            }
        })
    };

    tracing::info!("Agent is running. Press Ctrl+C to stop.");

    // Graceful shutdown on SIGINT or SIGTERM
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
    }

    tracing::info!("Shutting down...");
    prime_task.abort();
    news_task.abort();
    summary_task.abort();
    ws.shutdown();
    let _ = ws_task.await;
    engine.shutdown().await;
    forwarder_task.abort();
    let _ = engine_task.await;

    tracing::info!("Portfolio agent stopped.");
    Ok(())
}
