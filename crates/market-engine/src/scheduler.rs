use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use portfolio_math::{PortfolioOptimizer, RiskCalculator};
use signal_core::{
    EngineConfig, EngineSnapshot, NewsItem, PriceTick, SystemStatus, TradeFill, TriggerEvaluator,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::holdings;
use crate::news::NewsBook;
use crate::store::SignalStore;

const EVENT_QUEUE_DEPTH: usize = 1024;

/// State-changing messages accepted by the scheduler. Producers (streaming
/// source, settings collaborator, automation) never touch engine state
/// directly; they post events through an [`EngineHandle`].
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Tick(PriceTick),
    /// A startup REST quote: resets the session base price without the
    /// tick-side RSI adjustment
    PrimeQuote { ticker: String, price: f64 },
    ConfigChanged(EngineConfig),
    FillRecorded(TradeFill),
    NewsBatch(Vec<NewsItem>),
    Shutdown,
}

/// Cloneable sender half for posting events to a running scheduler
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub async fn tick(&self, tick: PriceTick) {
        let _ = self.tx.send(EngineEvent::Tick(tick)).await;
    }

    pub async fn prime_quote(&self, ticker: String, price: f64) {
        let _ = self
            .tx
            .send(EngineEvent::PrimeQuote { ticker, price })
            .await;
    }

    pub async fn update_config(&self, config: EngineConfig) {
        let _ = self.tx.send(EngineEvent::ConfigChanged(config)).await;
    }

    pub async fn record_fill(&self, fill: TradeFill) {
        let _ = self.tx.send(EngineEvent::FillRecorded(fill)).await;
    }

    pub async fn push_news(&self, batch: Vec<NewsItem>) {
        let _ = self.tx.send(EngineEvent::NewsBatch(batch)).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineEvent::Shutdown).await;
    }
}

/// The recompute scheduler: sole owner of the signal table, fill log, news
/// book, and configuration. Runs score -> risk -> optimize passes whenever
/// state changed, coalescing event bursts into a single pass via a
/// monotonic version counter, and publishes read-only snapshots over a
/// watch channel.
pub struct RecomputeScheduler {
    rx: mpsc::Receiver<EngineEvent>,
    config: EngineConfig,
    store: SignalStore,
    fills: Vec<TradeFill>,
    news: NewsBook,
    status: SystemStatus,
    evaluator: Option<Arc<dyn TriggerEvaluator>>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    /// Bumped on every state mutation
    version: u64,
    /// Version the latest published snapshot was computed from
    computed_version: u64,
}

impl RecomputeScheduler {
    pub fn new(config: EngineConfig) -> (Self, EngineHandle, watch::Receiver<EngineSnapshot>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());

        let store = SignalStore::from_watchlist(&config.watchlist);
        let scheduler = Self {
            rx,
            config,
            store,
            fills: Vec::new(),
            news: NewsBook::new(),
            status: SystemStatus::default(),
            evaluator: None,
            snapshot_tx,
            version: 0,
            computed_version: 0,
        };

        (scheduler, EngineHandle { tx }, snapshot_rx)
    }

    /// Attach an automation collaborator, invoked on the status interval
    /// when `enable_automation` is set.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn TriggerEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Drive the engine until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        // Initial pass so consumers see the seeded table immediately
        self.version += 1;
        self.recompute_pass();

        let mut status_timer = interval(Duration::from_secs(
            self.config.status_interval_seconds.max(1),
        ));
        status_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_event = self.rx.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    let mut shutdown = !self.apply_event(event);

                    // Drain whatever else is already queued so a burst of
                    // ticks becomes one pass, not one pass per tick
                    if !shutdown {
                        while let Ok(event) = self.rx.try_recv() {
                            if !self.apply_event(event) {
                                shutdown = true;
                                break;
                            }
                        }
                    }

                    if self.version > self.computed_version {
                        self.recompute_pass();
                    }
                    if shutdown {
                        break;
                    }
                }
                _ = status_timer.tick() => {
                    self.advance_status();
                    self.run_automation().await;

                    if self.version > self.computed_version {
                        self.recompute_pass();
                    } else {
                        let status = self.status.clone();
                        self.snapshot_tx.send_modify(|snapshot| snapshot.status = status);
                    }
                }
            }
        }

        // Flush any mutations applied on the way out
        if self.version > self.computed_version {
            self.recompute_pass();
        }
        tracing::info!("Recompute scheduler stopped at version {}", self.version);
    }

    /// Returns false when the event requests shutdown
    fn apply_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Tick(tick) => {
                if self.store.apply_tick(&tick) {
                    self.version += 1;
                }
            }
            EngineEvent::PrimeQuote { ticker, price } => {
                if self.store.set_base_price(&ticker, price) {
                    self.version += 1;
                }
            }
            EngineEvent::ConfigChanged(config) => {
                self.store.sync_watchlist(&config.watchlist);
                self.config = config;
                self.version += 1;
            }
            EngineEvent::FillRecorded(fill) => {
                tracing::info!(
                    "Fill recorded: {:?} {} x{:.0} @ {:.2}",
                    fill.side,
                    fill.ticker,
                    fill.shares,
                    fill.price
                );
                self.fills.push(fill);
                self.version += 1;
            }
            EngineEvent::NewsBatch(batch) => {
                self.news.push_batch(batch);
                self.version += 1;
            }
            EngineEvent::Shutdown => return false,
        }
        true
    }

    /// One atomic recompute pass over the current state: rescore every
    /// signal first, then derive holdings, risk, and targets from the same
    /// consistent view, then publish.
    fn recompute_pass(&mut self) {
        self.store.rescore_all();

        let prices = self.store.price_map();
        let shares = holdings::fold_open_fills(&self.fills);
        let total_equity = holdings::equity(self.config.initial_capital, &self.fills, &prices);
        let weights = holdings::active_weights(&shares, &prices, total_equity);

        let signals = self.store.snapshot();
        let risk = RiskCalculator::compute(&signals, total_equity, &weights);
        let targets =
            PortfolioOptimizer::optimize(&signals, &self.config, &prices, &shares, total_equity);

        self.status = SystemStatus {
            last_updated: Utc::now(),
            active_positions: shares.values().filter(|qty| **qty > 0.0).count(),
            cash_position: total_equity - holdings::market_value(&shares, &prices),
            daily_pnl: total_equity - self.config.initial_capital,
        };

        self.computed_version = self.version;
        let _ = self.snapshot_tx.send(EngineSnapshot {
            signals,
            risk,
            targets,
            news: self.news.items().to_vec(),
            status: self.status.clone(),
            version: self.version,
        });
    }

    /// Advance the PnL/status display between passes
    fn advance_status(&mut self) {
        self.status.last_updated = Utc::now();
    }

    /// Let the automation collaborator propose fills. Evaluator failures
    /// are logged and must never stop subsequent timer ticks.
    async fn run_automation(&mut self) {
        if !self.config.enable_automation {
            return;
        }
        let Some(evaluator) = self.evaluator.clone() else {
            return;
        };

        let snapshot = self.snapshot_tx.borrow().clone();
        match evaluator.evaluate(&snapshot).await {
            Ok(fills) => {
                for fill in fills {
                    self.fills.push(fill);
                    self.version += 1;
                }
            }
            Err(e) => {
                tracing::error!("Trigger evaluation failed: {}", e);
            }
        }
    }
}
