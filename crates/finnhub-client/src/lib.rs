use chrono::DateTime;
use reqwest::Client;
use signal_core::{CoreError, NewsItem};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod websocket;
pub use websocket::FinnhubWebSocket;

const BASE_URL: &str = "https://finnhub.io/api/v1";
/// Headlines kept per fetch before the engine-side dedup/cap
const NEWS_FETCH_LIMIT: usize = 10;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = match ts.front().and_then(|f| f.checked_add(self.window)) {
                Some(instant) => instant,
                None => now + self.window,
            };
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Finnhub API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// REST client for Finnhub quotes and general market news
#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        // Free tier allows 60 req/min
        let rate_limit: usize = std::env::var("FINNHUB_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Current price for a symbol
    pub async fn get_quote(&self, symbol: &str) -> Result<f64, CoreError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/quote", BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", &self.api_key)])
            .send()
            .await
            .map_err(|e| CoreError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::Api(format!(
                "HTTP {} fetching quote for {}",
                response.status(),
                symbol
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CoreError::Api(e.to_string()))?;

        // 'c' is the current price; 0 means no quote available
        match payload.get("c").and_then(|v| v.as_f64()) {
            Some(price) if price > 0.0 => Ok(price),
            _ => Err(CoreError::Api(format!("No quote for {}", symbol))),
        }
    }

    /// Recent general-market headlines, newest first
    pub async fn get_market_news(&self) -> Result<Vec<NewsItem>, CoreError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/news", BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("category", "general"), ("token", &self.api_key)])
            .send()
            .await
            .map_err(|e| CoreError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::Api(format!(
                "HTTP {} fetching news",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CoreError::Api(e.to_string()))?;

        Ok(parse_news(&payload))
    }
}

/// Map the loose vendor payload to domain headlines, skipping entries
/// without an id or title.
fn parse_news(payload: &serde_json::Value) -> Vec<NewsItem> {
    let Some(entries) = payload.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(|v| v.as_i64())?;
            let title = entry.get("headline").and_then(|v| v.as_str())?;
            let datetime = entry.get("datetime").and_then(|v| v.as_i64()).unwrap_or(0);

            let related_ticker = entry
                .get("related")
                .and_then(|v| v.as_str())
                .and_then(|r| r.split(',').next())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string());

            Some(NewsItem {
                id: id.to_string(),
                source: entry
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Finnhub")
                    .to_string(),
                related_ticker,
                title: title.to_string(),
                summary: entry
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                timestamp: DateTime::from_timestamp(datetime, 0).unwrap_or_default(),
                url: entry
                    .get("url")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .take(NEWS_FETCH_LIMIT)
        .collect()
}
