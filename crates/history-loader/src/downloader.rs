use anyhow::Result;
use signal_core::{DailySeriesSource, DownloadState, DownloadStatus};
use std::time::Duration;

use crate::cache::CandleCache;
use crate::synthetic::synthetic_history;

/// Spacing between network fetches. The provider quota is 5 requests per
/// minute, so 15 seconds keeps a batch comfortably under it.
const REQUEST_PAUSE: Duration = Duration::from_secs(15);

/// Serialized batch downloader: one ticker in flight at a time, synthetic
/// fallback on any fetch failure, progress reported through an observer
/// callback. Cached tickers are skipped when resuming, so an interrupted
/// batch picks up at the first un-cached ticker.
pub struct BatchDownloader<S: DailySeriesSource> {
    source: S,
    cache: CandleCache,
    pause: Duration,
    resume: bool,
}

impl<S: DailySeriesSource> BatchDownloader<S> {
    pub fn new(source: S, cache: CandleCache) -> Self {
        Self {
            source,
            cache,
            pause: REQUEST_PAUSE,
            resume: true,
        }
    }

    /// Override the inter-request pause (tests use zero)
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Force re-download of already cached tickers
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub async fn run(
        &self,
        tickers: &[String],
        mut on_update: impl FnMut(&DownloadStatus),
    ) -> Result<()> {
        for ticker in tickers {
            on_update(&status(ticker, DownloadState::Pending, 0, None));
        }

        for (index, ticker) in tickers.iter().enumerate() {
            if self.resume {
                let cached = self.cache.get(ticker).await.unwrap_or_else(|e| {
                    tracing::warn!("Cache read failed for {}: {}", ticker, e);
                    None
                });
                if let Some(existing) = cached {
                    tracing::debug!("{} already cached ({} candles), skipping", ticker, existing.len());
                    on_update(&status(ticker, DownloadState::Completed, existing.len(), None));
                    continue;
                }
            }

            on_update(&status(ticker, DownloadState::Fetching, 0, None));

            let candles = match self.source.fetch_daily(ticker).await {
                Ok(series) if !series.is_empty() => series,
                Ok(_) => {
                    tracing::warn!("{}: source returned no data, using synthetic series", ticker);
                    synthetic_history(ticker)
                }
                Err(e) => {
                    tracing::warn!("{}: fetch failed ({}), using synthetic series", ticker, e);
                    synthetic_history(ticker)
                }
            };

            on_update(&status(ticker, DownloadState::Saving, candles.len(), None));

            match self.cache.put(ticker, &candles).await {
                Ok(()) => {
                    on_update(&status(ticker, DownloadState::Completed, candles.len(), None));
                }
                Err(e) => {
                    tracing::error!("{}: cache write failed: {}", ticker, e);
                    on_update(&status(ticker, DownloadState::Failed, 0, Some(e.to_string())));
                }
            }

            // Stay under the provider quota before the next network call
            if index < tickers.len() - 1 {
                on_update(&status(&tickers[index + 1], DownloadState::Waiting, 0, None));
                tokio::time::sleep(self.pause).await;
            }
        }

        Ok(())
    }
}

fn status(ticker: &str, state: DownloadState, count: usize, error: Option<String>) -> DownloadStatus {
    DownloadStatus {
        ticker: ticker.to_string(),
        state,
        count,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use signal_core::{FetchError, HistoricalCandle};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::synthetic::SYNTHETIC_DAYS;

    /// Scripted source: per-ticker canned responses, call counting
    struct StubSource {
        responses: HashMap<String, Result<Vec<HistoricalCandle>, FetchError>>,
        calls: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(responses: HashMap<String, Result<Vec<HistoricalCandle>, FetchError>>) -> Self {
            Self {
                responses,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl DailySeriesSource for StubSource {
        async fn fetch_daily(&self, ticker: &str) -> Result<Vec<HistoricalCandle>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(ticker) {
                Some(Ok(series)) => Ok(series.clone()),
                Some(Err(FetchError::QuotaExceeded)) => Err(FetchError::QuotaExceeded),
                Some(Err(_)) => Err(FetchError::Http("stub".to_string())),
                None => Err(FetchError::Empty),
            }
        }
    }

    fn make_series(n: usize) -> Vec<HistoricalCandle> {
        (0..n)
            .map(|i| HistoricalCandle {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 1_000.0,
            })
            .collect()
    }

    async fn run_batch(
        source: StubSource,
        cache: &CandleCache,
        tickers: &[&str],
        resume: bool,
    ) -> Vec<DownloadStatus> {
        let downloader = BatchDownloader::new(source, cache.clone())
            .with_pause(Duration::ZERO)
            .with_resume(resume);

        let mut updates = Vec::new();
        let tickers: Vec<String> = tickers.iter().map(|t| t.to_string()).collect();
        downloader
            .run(&tickers, |s| updates.push(s.clone()))
            .await
            .unwrap();
        updates
    }

    fn last_state_for(updates: &[DownloadStatus], ticker: &str) -> DownloadStatus {
        updates
            .iter()
            .rev()
            .find(|s| s.ticker == ticker)
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_download_persists_series() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        let source = StubSource::new(
            [("NVDA".to_string(), Ok(make_series(120)))].into_iter().collect(),
        );

        let updates = run_batch(source, &cache, &["NVDA"], true).await;

        let final_status = last_state_for(&updates, "NVDA");
        assert_eq!(final_status.state, DownloadState::Completed);
        assert_eq!(final_status.count, 120);
        assert_eq!(cache.series_len("NVDA").await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_quota_error_falls_back_to_synthetic_completed() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        let source = StubSource::new(
            [("X".to_string(), Err(FetchError::QuotaExceeded))].into_iter().collect(),
        );

        let updates = run_batch(source, &cache, &["X"], true).await;

        let final_status = last_state_for(&updates, "X");
        assert_eq!(final_status.state, DownloadState::Completed);
        assert_eq!(final_status.count, SYNTHETIC_DAYS);
        assert_eq!(cache.series_len("X").await.unwrap(), SYNTHETIC_DAYS);
        assert!(updates.iter().all(|s| s.state != DownloadState::Failed));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_halt_batch() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        let source = StubSource::new(
            [
                ("BAD".to_string(), Err(FetchError::Http("boom".to_string()))),
                ("GOOD".to_string(), Ok(make_series(50))),
            ]
            .into_iter()
            .collect(),
        );

        let updates = run_batch(source, &cache, &["BAD", "GOOD"], true).await;

        assert_eq!(last_state_for(&updates, "BAD").state, DownloadState::Completed);
        assert_eq!(last_state_for(&updates, "GOOD").count, 50);
        assert_eq!(cache.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_resume_skips_cached_tickers() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        cache.put("NVDA", &make_series(30)).await.unwrap();

        let source = StubSource::new(
            [("AMD".to_string(), Ok(make_series(40)))].into_iter().collect(),
        );
        let calls = Arc::clone(&source.calls);

        let updates = run_batch(source, &cache, &["NVDA", "AMD"], true).await;

        // Only AMD hit the network; NVDA reported its cached count
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let nvda = last_state_for(&updates, "NVDA");
        assert_eq!(nvda.state, DownloadState::Completed);
        assert_eq!(nvda.count, 30);
        assert_eq!(cache.series_len("NVDA").await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_no_resume_overwrites_cached_series() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        cache.put("NVDA", &make_series(30)).await.unwrap();

        let source = StubSource::new(
            [("NVDA".to_string(), Ok(make_series(45)))].into_iter().collect(),
        );

        run_batch(source, &cache, &["NVDA"], false).await;

        // Overwrite, not append: still one row, new length
        assert_eq!(cache.count().await.unwrap(), 1);
        assert_eq!(cache.series_len("NVDA").await.unwrap(), 45);
    }

    #[tokio::test]
    async fn test_waiting_emitted_between_fetches() {
        let cache = CandleCache::new("sqlite::memory:").await.unwrap();
        let source = StubSource::new(
            [
                ("A".to_string(), Ok(make_series(10))),
                ("B".to_string(), Ok(make_series(10))),
            ]
            .into_iter()
            .collect(),
        );

        let updates = run_batch(source, &cache, &["A", "B"], true).await;

        let waiting: Vec<&DownloadStatus> = updates
            .iter()
            .filter(|s| s.state == DownloadState::Waiting)
            .collect();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].ticker, "B");
    }
}
